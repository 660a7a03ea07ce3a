//! # Colored-coin DAO Consensus Library
//!
//! Library inti untuk consensus engine DAO di atas colored coin: klasifikasi
//! raw block menjadi ledger token, siklus governance (proposal → blind vote →
//! reveal → result) dan tally yang deterministik di semua peer.
//!
//! ## Module Overview
//!
//! | Module | Fungsi |
//! |--------|--------|
//! | `types` | `Hash`, `TxId`, `TxOutputKey`, amount constants |
//! | `raw` | Untrusted input: `RawBlock`, `RawTx` |
//! | `block` | Ledger entries: `Block`, `Tx`, `TxOutput`, `TxType`, `TxOutputType` |
//! | `opreturn` | Application-data (OP_RETURN) tag classification |
//! | `param` | Governance params dan network defaults |
//! | `period` | `DaoPhase`, `Cycle`, phase arithmetic |
//! | `parser` | Input resolution, output classification, tx/block classifier |
//! | `state` | `LedgerState`: unspent index, mutation window, records |
//! | `governance` | Proposal, ballot, merit, reconciliation, vote tally |
//! | `snapshot` | Snapshot store dan background writer |
//! | `engine` | `DaoEngine`: pemilik tunggal ledger |
//! | `error` | `DaoError` |
//!
//! ## Block Flow (CONSENSUS-CRITICAL)
//!
//! ```text
//! RawBlock
//!    │
//!    ▼
//! BlockClassifier ── height/hash check ── future? buffer ── reorg? rollback
//!    │
//!    ▼
//! advance_height(h) ──► VoteTally (first RESULT block: tally + commit)
//!    │
//!    ▼
//! append_block ──► per tx: inputs → outputs → tx type ──► append_tx
//!    │
//!    ▼
//! complete() ──► listeners, snapshot candidate
//! ```
//!
//! ## Tx Validity
//!
//! ```text
//! valid      value mengalir sesuai tipe
//! IRREGULAR  value dipertahankan, ditandai (fee/phase salah)
//! INVALID    seluruh input value dibakar
//! ```
//!
//! Semua koleksi yang ikut di-serialize memakai `BTreeMap`/`BTreeSet` supaya
//! byte output identik antar peer.

pub mod types;
pub mod raw;
pub mod block;
pub mod opreturn;
pub mod param;
pub mod period;
pub mod parser;
pub mod state; // direktori = /state/mod.rs
pub mod governance;
pub mod snapshot;
pub mod engine;
pub mod error;

// ════════════════════════════════════════════════════════════════════════════
// RE-EXPORTS
// ════════════════════════════════════════════════════════════════════════════

pub use error::DaoError;
pub use engine::{DaoEngine, EngineOutcome};
pub use parser::{BlockClassifier, BlockReport, ClassifiedTx, HeightHook, SubmitOutcome};
pub use state::{LedgerListener, LedgerState};
