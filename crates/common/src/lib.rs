//! # Colored-coin DAO Common Crate
//!
//! Utilities yang dipakai bersama oleh consensus engine.
//!
//! ## Modules
//! - `config`: Network presets dan TOML configuration loader
//! - `crypto`: SHA3 digest, Ed25519 verification, AES-GCM ballot decryption

pub mod config;
pub mod crypto;

pub use config::{DaoConfig, GenesisConfig, Network, ReconciliationSettings, SnapshotSettings};
pub use crypto::CryptoError;
