//! # Mutation Window
//!
//! Explicit state machine untuk mutasi per block:
//!
//! ```text
//! Idle ──advance_height(h)──► HeightAdvanced(h) ──append_block()──► BlockOpen(h)
//!  ▲                                                                    │
//!  └──────────────────────────────── complete() ◄───────────────────────┘
//! ```
//!
//! Transisi dicek compiler lewat tipe (`HeightWindow` dikonsumsi oleh
//! `append_block`, `BlockWindow` oleh `complete`). Runtime check tersisa
//! hanya untuk nilai: height harus bersambung dan window sebelumnya harus
//! sudah ditutup.

use tracing::{debug, info, warn};

use super::{invariant_violation, Issuance, LedgerState, WritePhase};
use crate::block::{Block, SpentInfo, Tx, TxOutput, TxOutputType};
use crate::governance::{BondedRole, DecryptedBallotsWithMerits, EvaluatedProposal};
use crate::param::ParamChange;
use crate::types::{TxId, TxOutputKey};

/// Window setelah height-advance, sebelum block di-append.
pub struct HeightWindow<'a> {
    ledger: &'a mut LedgerState,
    height: u64,
}

/// Window untuk block yang sedang diklasifikasi.
pub struct BlockWindow<'a> {
    ledger: &'a mut LedgerState,
    height: u64,
}

impl LedgerState {
    /// Langkah pertama per block. Height harus tepat `chain_height + 1`
    /// (atau genesis height untuk ledger kosong).
    pub fn advance_height(&mut self, height: u64) -> HeightWindow<'_> {
        if self.write_phase != WritePhase::Idle {
            invariant_violation(format!(
                "advance_height({}) while window {:?} is still open",
                height, self.write_phase
            ));
        }
        let expected = self.next_expected_height();
        if height != expected {
            invariant_violation(format!("advance_height({}) but expected {}", height, expected));
        }

        self.data.chain_height = height;
        self.write_phase = WritePhase::HeightAdvanced(height);
        self.maybe_start_new_cycle(height);
        self.notify_new_block_height(height);

        HeightWindow { ledger: self, height }
    }

    /// Height yang boleh di-advance berikutnya.
    pub fn next_expected_height(&self) -> u64 {
        match self.data.blocks.last() {
            Some(b) => b.height + 1,
            None => self.genesis.height,
        }
    }
}

impl<'a> HeightWindow<'a> {
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn ledger(&self) -> &LedgerState {
        &*self.ledger
    }

    pub fn append_block(self, block: Block) -> BlockWindow<'a> {
        let height = self.height;
        if block.height != height {
            invariant_violation(format!("append block {} in window {}", block.height, height));
        }
        if !block.txs.is_empty() {
            invariant_violation(format!("block {} appended with {} txs", height, block.txs.len()));
        }
        if let Some(last) = self.ledger.data.blocks.last() {
            if last.hash != block.previous_block_hash {
                invariant_violation(format!(
                    "block {} does not connect to {}",
                    height,
                    last.hash.short()
                ));
            }
        }

        self.ledger.data.blocks.push(block);
        self.ledger.write_phase = WritePhase::BlockOpen(height);
        BlockWindow { ledger: self.ledger, height }
    }

    // ════════════════════════════════════════════════════════════════════════
    // GOVERNANCE COMMITS
    // ════════════════════════════════════════════════════════════════════════

    /// Issuance diterima: candidate output menjadi token output unspent.
    pub fn add_issuance(&mut self, issuance: Issuance, candidate: &TxOutput) {
        if candidate.output_type != TxOutputType::IssuanceCandidate || candidate.tx_id != issuance.tx_id {
            invariant_violation(format!("output {} is not the issuance candidate", candidate.key()));
        }
        if self.ledger.data.issuances.contains_key(&issuance.tx_id) {
            warn!("issuance {} already recorded, skipping", issuance.tx_id);
            return;
        }
        info!(
            "issuance {} amount={} height={} type={:?}",
            issuance.tx_id, issuance.amount, issuance.chain_height, issuance.issuance_type
        );
        self.ledger.do_add_unspent(candidate.clone());
        self.ledger.data.issuances.insert(issuance.tx_id, issuance);
    }

    pub fn add_param_change(&mut self, change: ParamChange) {
        if change.activation_height <= self.height {
            invariant_violation(format!(
                "param change {:?} activates at {} which is not after {}",
                change.param, change.activation_height, self.height
            ));
        }
        info!(
            "param {:?} = {} from height {}",
            change.param, change.value, change.activation_height
        );
        let changes = &mut self.ledger.data.param_changes;
        changes.push(change);
        changes.sort_by_key(|c| c.activation_height);
    }

    /// Return true kalau bond masih bisa dikonfiskasi.
    pub fn confiscate_bond(&mut self, lockup_tx_id: &TxId) -> bool {
        self.ledger.do_confiscate_bond(lockup_tx_id)
    }

    pub fn activate_role(&mut self, role: BondedRole) {
        info!("bonded role {} activated", role.uid);
        self.ledger.data.bonded_roles.insert(role.uid.clone(), role);
    }

    pub fn remove_asset(&mut self, ticker: &str) {
        info!("asset {} removed", ticker);
        self.ledger.data.removed_assets.insert(ticker.to_string());
    }

    pub fn set_cycle_result(
        &mut self,
        cycle_start: u64,
        mut evaluated: Vec<EvaluatedProposal>,
        mut decrypted: Vec<DecryptedBallotsWithMerits>,
    ) {
        evaluated.sort_by_key(|e| e.proposal.tx_id);
        decrypted.sort_by_key(|d| d.vote_reveal_tx_id);
        self.ledger.data.evaluated_proposals.insert(cycle_start, evaluated);
        self.ledger.data.decrypted_ballots.insert(cycle_start, decrypted);
    }
}

impl<'a> BlockWindow<'a> {
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn ledger(&self) -> &LedgerState {
        &*self.ledger
    }

    /// Hapus output dari unspent index dan tulis SpentInfo.
    pub fn spend_output(&mut self, key: &TxOutputKey, info: SpentInfo) -> Option<TxOutput> {
        self.ledger.do_spend_output(key, info)
    }

    pub fn append_tx(&mut self, tx: Tx) {
        debug!("append tx {} type={:?} height={}", tx.id.short(), tx.tx_type, self.height);
        self.ledger.do_append_tx(self.height, tx);
    }

    /// Tutup window dan kirim notifikasi ke listener.
    pub fn complete(self) {
        let ledger = self.ledger;
        ledger.write_phase = WritePhase::Idle;
        ledger.notify_block_complete();
    }
}
