//! Error kinds untuk DAO consensus engine.
//!
//! | Variant | Efek |
//! |---------|------|
//! | `StructuralInvalid` | tx invalid, semua input value dibakar |
//! | `Irregular` | value dipertahankan, ditandai untuk audit |
//! | `ChainDiscontinuity` | rollback ke snapshot lalu re-classify |
//! | `ReconciliationFailure` | request data yang hilang, tally ditunda |
//! | `DecryptionFailure` | satu ballot dikeluarkan dari tally |
//! | `ConsensusViolation` | seluruh hasil cycle dibuang |
//!
//! Mutasi di luar mutation window bukan error value: itu `panic!`.

use thiserror::Error;

use cdao_common::CryptoError;

use crate::types::TxId;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("tx {tx_id} is structurally invalid: {reason}")]
    StructuralInvalid { tx_id: TxId, reason: String },

    #[error("tx {tx_id} is irregular: {reason}")]
    Irregular { tx_id: TxId, reason: String },

    #[error("chain discontinuity at height {height}: {reason}")]
    ChainDiscontinuity { height: u64, reason: String },

    #[error("ballot reconciliation failed for cycle {cycle_start}: {reason}")]
    ReconciliationFailure { cycle_start: u64, reason: String },

    #[error("cannot decrypt ballot of reveal {reveal_tx_id}: {reason}")]
    DecryptionFailure { reveal_tx_id: TxId, reason: String },

    #[error("consensus violation in cycle {cycle_start}: {reason}")]
    ConsensusViolation { cycle_start: u64, reason: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl DaoError {
    /// Error yang boleh dicoba ulang setelah data baru datang.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DaoError::ChainDiscontinuity { .. } | DaoError::ReconciliationFailure { .. }
        )
    }
}
