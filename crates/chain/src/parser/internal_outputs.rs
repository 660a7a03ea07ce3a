//! # Output Classification
//!
//! Distribusi value input ke output secara berurutan. Setiap output
//! diperiksa dengan prioritas tetap:
//!
//! ```text
//!  1. output dikonfiskasi                      → PlainOutput
//!  2. index 0, unlock lockup (value == lockup)  → Unlock
//!  3. fee-burn tag (asset listing, proof of
//!     burn), index > 0                         → PlainOutput (sticky)
//!  4. setelah hard fork, funding tag, index 1   → IssuanceCandidate (sticky)
//!  5. available cukup & belum sticky            → token output
//!  6. sisanya: sebelum hard fork, funding tag,
//!     index 1, available > 0                   → IssuanceCandidate (sticky)
//!     selain itu                                → PlainOutput (sticky)
//! ```
//!
//! "Sticky": sekali ada output ordinary value, tidak ada lagi token output
//! setelahnya. Application data hanya diproses pada output terakhir yang
//! bernilai nol; di posisi lain ⇒ `Invalid`.

use tracing::debug;

use super::internal_inputs::InputResolution;
use crate::block::{TempTx, TxOutputType};
use crate::opreturn::{self, OpReturnType};
use crate::state::LedgerState;

#[derive(Debug, Clone)]
pub struct OutputClassification {
    /// Value input yang belum dialokasikan (menjadi burnt fee).
    pub available: u64,
    /// Tag dari application-data output yang valid.
    pub op_type: Option<OpReturnType>,
    /// Application data ada tapi tidak bisa di-decode.
    pub op_return_invalid: bool,
    /// Jumlah output yang membawa application data.
    pub op_return_outputs: usize,
    /// Application data di output selain output terakhir bernilai nol.
    pub misplaced_op_return: bool,
    pub candidate_index: Option<usize>,
}

/// Output terakhir yang boleh membawa application data.
fn op_return_index(tx: &TempTx) -> Option<usize> {
    let last = tx.outputs.len().checked_sub(1)?;
    let out = &tx.outputs[last];
    (out.has_op_return_data() && out.value == 0).then_some(last)
}

pub(crate) fn classify_outputs(
    ledger: &LedgerState,
    tx: &mut TempTx,
    inputs: &InputResolution,
) -> OutputClassification {
    let height = tx.block_height;
    let hard_fork = ledger.is_hard_fork_activated(height);
    let op_index = op_return_index(tx);

    let mut result = OutputClassification {
        available: inputs.accumulated,
        op_type: None,
        op_return_invalid: false,
        op_return_outputs: tx.outputs.iter().filter(|o| o.has_op_return_data()).count(),
        misplaced_op_return: false,
        candidate_index: None,
    };

    // application data diproses lebih dulu: tag-nya menentukan tipe output lain
    if let Some(idx) = op_index {
        let data = tx.outputs[idx].op_return_data.clone().unwrap_or_default();
        match opreturn::classify(&data) {
            Ok(op_type) => {
                tx.outputs[idx].output_type = op_type.output_type();
                result.op_type = Some(op_type);
            }
            Err(e) => {
                debug!("tx {} application data invalid: {}", tx.id.short(), e);
                tx.outputs[idx].output_type = TxOutputType::Invalid;
                result.op_return_invalid = true;
            }
        }
    }
    let op_type = result.op_type;
    let lock_time = match (op_type, op_index) {
        (Some(OpReturnType::Lockup), Some(idx)) => {
            tx.outputs[idx].op_return_data.as_deref().and_then(opreturn::lock_time).unwrap_or(0)
        }
        _ => 0,
    };

    let mut prohibit_tokens = false;
    for idx in 0..tx.outputs.len() {
        if Some(idx) == op_index {
            continue;
        }
        let out = &mut tx.outputs[idx];
        if out.has_op_return_data() {
            out.output_type = TxOutputType::Invalid;
            result.misplaced_op_return = true;
            continue;
        }

        let value = out.value;
        let available = result.available;

        if ledger.is_confiscated_output(&out.key()) {
            out.output_type = TxOutputType::PlainOutput;
            result.available = available.saturating_sub(value);
            continue;
        }

        let is_unlock = idx == 0
            && inputs
                .spent_lockup
                .as_ref()
                .map(|lockup| available == value && value == lockup.value)
                .unwrap_or(false);
        if is_unlock {
            out.output_type = TxOutputType::Unlock;
            out.unlock_block_height = inputs.unlock_block_height;
            result.available -= value;
            prohibit_tokens = true;
            continue;
        }

        if idx > 0 && op_type.map(|t| t.is_fee_burn()).unwrap_or(false) {
            out.output_type = TxOutputType::PlainOutput;
            prohibit_tokens = true;
            continue;
        }

        let funding_candidate = idx == 1 && op_type.map(|t| t.is_funding_request()).unwrap_or(false);
        if hard_fork && funding_candidate {
            out.output_type = TxOutputType::IssuanceCandidate;
            result.candidate_index = Some(idx);
            prohibit_tokens = true;
            continue;
        }

        if available > 0 && available >= value && !prohibit_tokens {
            result.available -= value;
            out.output_type = match (idx, op_type) {
                (0, Some(OpReturnType::BlindVote)) => TxOutputType::BlindVoteLockStake,
                (0, Some(OpReturnType::VoteReveal)) => TxOutputType::VoteRevealUnlockStake,
                (0, Some(OpReturnType::Lockup)) => TxOutputType::Lockup,
                _ => TxOutputType::TokenOutput,
            };
            if out.output_type == TxOutputType::Lockup {
                out.lock_time = lock_time;
            }
            continue;
        }

        if !hard_fork && funding_candidate && available > 0 {
            out.output_type = TxOutputType::IssuanceCandidate;
            result.candidate_index = Some(idx);
        } else {
            out.output_type = TxOutputType::PlainOutput;
        }
        prohibit_tokens = true;
    }

    result
}
