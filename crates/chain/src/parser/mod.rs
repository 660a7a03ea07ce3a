//! # Parser Module
//!
//! Klasifikasi raw block/tx menjadi ledger entry. Semua mutasi lewat
//! mutation window milik `state`.
//!
//! ## Pipeline
//!
//! ```text
//! RawBlock ──► BlockClassifier ──► HeightWindow ──► HeightHook (vote tally)
//!                                      │
//!                                      ▼
//!                                  BlockWindow
//!                                      │  per tx:
//!                                      ├─ internal_inputs   (TxInputResolver)
//!                                      ├─ internal_outputs  (TxOutputClassifier)
//!                                      └─ internal_tx       (TransactionClassifier)
//!                                      ▼
//!                                  complete()
//! ```
//!
//! ## Module Structure
//!
//! | Module | Fungsi |
//! |--------|--------|
//! | `internal_inputs` | resolve input ke unspent index, spend, burnt bond |
//! | `internal_outputs` | alokasi value ke output, priority chain |
//! | `internal_tx` | tx type, irregular/invalid, genesis |
//! | `internal_block` | ordering, buffering, chain discontinuity |

use crate::state::HeightWindow;

mod internal_inputs;
mod internal_outputs;
mod internal_tx;
mod internal_block;

#[cfg(test)]
mod tests;

pub use internal_block::{BlockClassifier, BlockReport, SubmitOutcome, DEFAULT_MAX_PENDING};
pub use internal_inputs::{InputResolution, InputState};
pub use internal_outputs::OutputClassification;
pub use internal_tx::ClassifiedTx;

/// Dipanggil sekali per height, di antara `advance_height` dan
/// `append_block`. Governance commit (hasil vote) masuk lewat sini.
pub trait HeightHook {
    fn on_new_height(&mut self, window: &mut HeightWindow<'_>);
}

/// Hook kosong untuk klasifikasi tanpa governance.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl HeightHook for NoopHook {
    fn on_new_height(&mut self, _window: &mut HeightWindow<'_>) {}
}
