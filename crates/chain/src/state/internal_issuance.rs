//! Issuance records: hasil funding request yang diterima voting.

use serde::{Deserialize, Serialize};

use super::LedgerState;
use crate::types::TxId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssuanceType {
    Compensation,
    Reimbursement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuance {
    /// Tx funding request yang membayar issuance.
    pub tx_id: TxId,
    pub chain_height: u64,
    pub amount: u64,
    /// Public key dari input pertama funding request; dipakai untuk
    /// verifikasi merit signature.
    pub pub_key: Option<Vec<u8>>,
    pub issuance_type: IssuanceType,
}

impl LedgerState {
    pub fn issuance(&self, tx_id: &TxId) -> Option<&Issuance> {
        self.data.issuances.get(tx_id)
    }

    pub fn issuances(&self) -> impl Iterator<Item = &Issuance> {
        self.data.issuances.values()
    }

    pub fn total_issued(&self, issuance_type: IssuanceType) -> u64 {
        self.data
            .issuances
            .values()
            .filter(|i| i.issuance_type == issuance_type)
            .map(|i| i.amount)
            .sum()
    }
}
