//! # Bond Lifecycle & Confiscation
//!
//! ```text
//! LOCKUP tx ──spend lockup output──► UNLOCK tx ──unlock height lewat──► unlocked
//!   Locked                            Unlocking                         Unlocked
//!
//! Confiscated: setelah lockup tx id ditandai, semua query bond state
//! melaporkan Confiscated, apa pun state sebelumnya.
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::LedgerState;
use crate::block::{Tx, TxOutputType, TxType};
use crate::types::{TxId, TxOutputKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondState {
    Locked,
    Unlocking,
    Unlocked,
    Confiscated,
}

impl LedgerState {
    pub fn is_confiscated_lockup_tx(&self, lockup_tx_id: &TxId) -> bool {
        self.data.confiscated_lockup_tx_ids.contains(lockup_tx_id)
    }

    pub fn confiscated_lockup_tx_ids(&self) -> impl Iterator<Item = &TxId> {
        self.data.confiscated_lockup_tx_ids.iter()
    }

    /// Lockup output atau unlock output dari bond yang dikonfiskasi.
    pub fn is_confiscated_output(&self, key: &TxOutputKey) -> bool {
        if self.data.confiscated_lockup_tx_ids.is_empty() {
            return false;
        }
        match self.tx_output(key).map(|o| o.output_type) {
            Some(TxOutputType::Lockup) => self.is_confiscated_lockup_tx(&key.tx_id),
            Some(TxOutputType::Unlock) => self
                .lockup_tx_id_of_unlock(&key.tx_id)
                .map(|id| self.is_confiscated_lockup_tx(&id))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Unlock tx men-spend lockup output lewat input yang terhubung ke
    /// output bertipe Lockup.
    pub fn lockup_tx_id_of_unlock(&self, unlock_tx_id: &TxId) -> Option<TxId> {
        let tx = self.tx(unlock_tx_id)?;
        tx.inputs
            .iter()
            .map(|i| i.connected)
            .find(|k| self.tx_output(k).map(|o| o.output_type) == Some(TxOutputType::Lockup))
            .map(|k| k.tx_id)
    }

    pub fn lockup_tx(&self, lockup_tx_id: &TxId) -> Option<&Tx> {
        self.tx(lockup_tx_id).filter(|tx| tx.tx_type == TxType::Lockup)
    }

    /// None kalau tx bukan lockup tx yang dikenal.
    pub fn bond_state(&self, lockup_tx_id: &TxId) -> Option<BondState> {
        if self.is_confiscated_lockup_tx(lockup_tx_id) {
            return Some(BondState::Confiscated);
        }
        let lockup = self.lockup_tx(lockup_tx_id)?;
        let lockup_output = lockup.outputs.iter().find(|o| o.output_type == TxOutputType::Lockup)?;
        let key = lockup_output.key();
        if self.is_unspent(&key) {
            return Some(BondState::Locked);
        }

        let unlock_tx_id = match self.spent_info(&key) {
            Some(info) => info.tx_id,
            None => return Some(BondState::Unlocked),
        };
        let unlock_output = self
            .tx(&unlock_tx_id)
            .and_then(|tx| tx.outputs.iter().find(|o| o.output_type == TxOutputType::Unlock));
        match unlock_output {
            Some(out) if self.chain_height() < out.unlock_block_height => Some(BondState::Unlocking),
            _ => Some(BondState::Unlocked),
        }
    }

    pub(super) fn do_confiscate_bond(&mut self, lockup_tx_id: &TxId) -> bool {
        match self.bond_state(lockup_tx_id) {
            Some(BondState::Locked) | Some(BondState::Unlocking) => {
                warn!("lockup tx {} confiscated", lockup_tx_id);
                self.data.confiscated_lockup_tx_ids.insert(*lockup_tx_id);
                true
            }
            Some(state) => {
                warn!("cannot confiscate bond {}: state is {:?}", lockup_tx_id, state);
                false
            }
            None => {
                warn!("no lockup tx found for {}", lockup_tx_id);
                false
            }
        }
    }
}
