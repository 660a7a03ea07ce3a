//! Governance results yang sudah di-commit per cycle.

use super::LedgerState;
use crate::governance::{BondedRole, DecryptedBallotsWithMerits, EvaluatedProposal};
use crate::types::TxId;

impl LedgerState {
    /// Cycle sudah punya hasil tally (idempotency guard).
    pub fn has_cycle_result(&self, cycle_start: u64) -> bool {
        self.data.evaluated_proposals.contains_key(&cycle_start)
    }

    pub fn evaluated_proposals(&self, cycle_start: u64) -> &[EvaluatedProposal] {
        self.data
            .evaluated_proposals
            .get(&cycle_start)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_evaluated_proposals(&self) -> impl Iterator<Item = &EvaluatedProposal> {
        self.data.evaluated_proposals.values().flatten()
    }

    pub fn decrypted_ballots(&self, cycle_start: u64) -> &[DecryptedBallotsWithMerits] {
        self.data
            .decrypted_ballots
            .get(&cycle_start)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_proposal_accepted(&self, proposal_tx_id: &TxId) -> bool {
        self.all_evaluated_proposals()
            .any(|e| e.accepted && e.proposal.tx_id == *proposal_tx_id)
    }

    pub fn bonded_role(&self, uid: &str) -> Option<&BondedRole> {
        self.data.bonded_roles.get(uid)
    }

    pub fn bonded_roles(&self) -> impl Iterator<Item = &BondedRole> {
        self.data.bonded_roles.values()
    }

    pub fn is_asset_removed(&self, ticker: &str) -> bool {
        self.data.removed_assets.contains(ticker)
    }
}
