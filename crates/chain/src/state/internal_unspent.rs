//! # Unspent Index & Lookups
//!
//! Pure-read query atas block/tx/output plus helper mutasi yang hanya
//! dipanggil dari `internal_window`.

use tracing::debug;

use super::{invariant_violation, LedgerState};
use crate::block::{Block, SpentInfo, Tx, TxOutput, TxOutputType};
use crate::types::{TxId, TxOutputKey};

impl LedgerState {
    // ════════════════════════════════════════════════════════════════════════
    // READS
    // ════════════════════════════════════════════════════════════════════════

    pub fn blocks(&self) -> &[Block] {
        &self.data.blocks
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.data.blocks.last()
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        let first = self.data.blocks.first()?.height;
        let idx = height.checked_sub(first)? as usize;
        self.data.blocks.get(idx)
    }

    pub fn tx(&self, tx_id: &TxId) -> Option<&Tx> {
        let height = self.data.tx_heights.get(tx_id)?;
        self.block_at(*height)?.txs.iter().find(|tx| tx.id == *tx_id)
    }

    pub fn txs(&self) -> impl Iterator<Item = &Tx> {
        self.data.blocks.iter().flat_map(|b| b.txs.iter())
    }

    /// Output apa pun (spent atau unspent) yang tercatat di ledger.
    pub fn tx_output(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        self.tx(&key.tx_id)?.outputs.get(key.index as usize)
    }

    pub fn unspent_output(&self, key: &TxOutputKey) -> Option<&TxOutput> {
        self.data.unspent_outputs.get(key)
    }

    pub fn is_unspent(&self, key: &TxOutputKey) -> bool {
        self.data.unspent_outputs.contains_key(key)
    }

    pub fn unspent_outputs(&self) -> impl Iterator<Item = &TxOutput> {
        self.data.unspent_outputs.values()
    }

    pub fn total_unspent_value(&self) -> u64 {
        self.data.unspent_outputs.values().map(|o| o.value).sum()
    }

    pub fn spent_info(&self, key: &TxOutputKey) -> Option<&SpentInfo> {
        self.data.spent_infos.get(key)
    }

    /// Output funding candidate (index 1) dari funding request tx.
    pub fn issuance_candidate_output(&self, tx_id: &TxId) -> Option<&TxOutput> {
        self.tx(tx_id)?
            .outputs
            .iter()
            .find(|o| o.output_type == TxOutputType::IssuanceCandidate)
    }

    // ════════════════════════════════════════════════════════════════════════
    // WINDOW-ONLY MUTATORS
    // ════════════════════════════════════════════════════════════════════════

    pub(super) fn do_spend_output(&mut self, key: &TxOutputKey, info: SpentInfo) -> Option<TxOutput> {
        let out = self.data.unspent_outputs.remove(key)?;
        if self.data.spent_infos.insert(*key, info).is_some() {
            invariant_violation(format!("output {} spent twice", key));
        }
        debug!("output {} spent by {}:{}", key, info.tx_id.short(), info.input_index);
        Some(out)
    }

    pub(super) fn do_add_unspent(&mut self, output: TxOutput) {
        let key = output.key();
        if self.data.spent_infos.contains_key(&key) {
            invariant_violation(format!("re-adding spent output {}", key));
        }
        self.data.unspent_outputs.insert(key, output);
    }

    pub(super) fn do_append_tx(&mut self, height: u64, tx: Tx) {
        if tx.block_height != height {
            invariant_violation(format!(
                "tx {} has block height {} but open block is {}",
                tx.id, tx.block_height, height
            ));
        }
        if self.data.tx_heights.contains_key(&tx.id) {
            invariant_violation(format!("tx {} appended twice", tx.id));
        }
        if !tx.tx_type.is_invalid() {
            for out in &tx.outputs {
                if out.output_type.is_unspent_candidate() {
                    self.do_add_unspent(out.clone());
                }
            }
        }
        self.data.tx_heights.insert(tx.id, height);
        match self.data.blocks.last_mut() {
            Some(block) if block.height == height => block.txs.push(tx),
            _ => invariant_violation(format!("no open block at height {}", height)),
        }
    }
}
