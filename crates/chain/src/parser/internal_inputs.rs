//! # Input Resolution
//!
//! Jalan di semua input tx terhadap unspent index:
//!
//! | Output yang di-spend | Efek |
//! |----------------------|------|
//! | tidak ada di index | diabaikan (bukan token) |
//! | dikonfiskasi | diabaikan, dicatat di log |
//! | `BlindVoteLockStake` | dihitung; lebih dari satu ⇒ reveal input invalid |
//! | `Lockup` | dicatat sebagai lockup yang di-unlock, unlock height dihitung |
//! | `Unlock` sebelum unlock height | value dibakar ke `burnt_bond` |
//!
//! Setiap input yang ter-resolve ditandai spent lewat `BlockWindow`.

use tracing::{debug, warn};

use crate::block::{SpentInfo, TempTx, TxOutput, TxOutputType};
use crate::state::BlockWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Tidak ada input relevan.
    Unset,
    Valid,
    Invalid,
}

#[derive(Debug, Clone)]
pub struct InputResolution {
    /// Total value token yang masuk (setelah bond yang dibakar dikurangi).
    pub accumulated: u64,
    pub burnt_bond: u64,
    pub vote_reveal_input: InputState,
    pub unlock_input: InputState,
    /// Lockup output pertama yang di-spend.
    pub spent_lockup: Option<TxOutput>,
    pub unlock_block_height: u64,
}

impl InputResolution {
    /// Tx relevan untuk ledger kalau ada value token masuk atau bond dibakar.
    pub fn is_relevant(&self) -> bool {
        self.accumulated > 0 || self.burnt_bond > 0
    }
}

pub(crate) fn resolve_inputs(window: &mut BlockWindow<'_>, tx: &TempTx) -> InputResolution {
    let height = window.height();
    let mut res = InputResolution {
        accumulated: 0,
        burnt_bond: 0,
        vote_reveal_input: InputState::Unset,
        unlock_input: InputState::Unset,
        spent_lockup: None,
        unlock_block_height: 0,
    };

    for (index, input) in tx.inputs.iter().enumerate() {
        let key = input.connected;
        let output = match window.ledger().unspent_output(&key) {
            Some(o) => o.clone(),
            None => continue,
        };
        if window.ledger().is_confiscated_output(&key) {
            warn!("tx {} spends confiscated output {}", tx.id.short(), key);
            continue;
        }

        res.accumulated = res.accumulated.saturating_add(output.value);
        match output.output_type {
            TxOutputType::BlindVoteLockStake => {
                res.vote_reveal_input = match res.vote_reveal_input {
                    InputState::Unset => InputState::Valid,
                    _ => InputState::Invalid,
                };
            }
            TxOutputType::Lockup => {
                if res.spent_lockup.is_none() {
                    res.unlock_block_height = height + output.lock_time as u64;
                    res.spent_lockup = Some(output.clone());
                    res.unlock_input = InputState::Valid;
                } else {
                    debug!("tx {} spends more than one lockup output", tx.id.short());
                    res.unlock_input = InputState::Invalid;
                }
            }
            TxOutputType::Unlock if height < output.unlock_block_height => {
                warn!(
                    "unlock output {} spent at {} before unlock height {}: bond burned",
                    key, height, output.unlock_block_height
                );
                res.accumulated -= output.value;
                res.burnt_bond = res.burnt_bond.saturating_add(output.value);
            }
            _ => {}
        }

        window.spend_output(
            &key,
            SpentInfo { block_height: height, tx_id: tx.id, input_index: index as u32 },
        );
    }
    res
}
