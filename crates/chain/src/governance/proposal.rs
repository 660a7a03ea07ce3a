//! # Proposals
//!
//! Proposal payload dibawa di luar chain (store milik collaborator); di chain
//! hanya ada tx dengan OP_RETURN berisi `digest20` dari payload. Setiap jenis
//! proposal adalah varian dari satu enum tertutup, jadi validator, tally dan
//! apply harus exhaustive.
//!
//! | Kind | Tx type | Quorum / Threshold param |
//! |------|---------|--------------------------|
//! | `Compensation` | CompensationRequest | `*CompensationRequest` |
//! | `Reimbursement` | ReimbursementRequest | `*Reimbursement` |
//! | `ChangeParam` | Proposal | `*ChangeParam` |
//! | `Role` | Proposal | `*Role` |
//! | `ConfiscateBond` | Proposal | `*Confiscation` |
//! | `Generic` | Proposal | `*Generic` |
//! | `RemoveAsset` | Proposal | `*RemoveAsset` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cdao_common::crypto::{digest20, DIGEST20_LEN};

use crate::block::TxType;
use crate::opreturn;
use crate::param::Param;
use crate::period::DaoPhase;
use crate::state::LedgerState;
use crate::types::TxId;

// ════════════════════════════════════════════════════════════════════════════
// BONDED ROLES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BondedRoleType {
    Arbitrator,
    Mediator,
    SeedNodeOperator,
    PriceNodeOperator,
    BtcNodeOperator,
    MarketsOperator,
    DomainNameHolder,
    DnsAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedRole {
    pub uid: String,
    pub name: String,
    pub link: String,
    pub role_type: BondedRoleType,
    pub required_bond: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// PROPOSAL
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    Compensation { requested_amount: u64, address: String },
    Reimbursement { requested_amount: u64, address: String },
    ChangeParam { param: Param, value: u64 },
    Role { role: BondedRole },
    ConfiscateBond { lockup_tx_id: TxId },
    Generic,
    RemoveAsset { ticker: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Tx yang membawa OP_RETURN proposal ini.
    pub tx_id: TxId,
    pub name: String,
    pub link: String,
    pub kind: ProposalKind,
}

/// Bagian payload yang di-hash ke OP_RETURN (tx id belum ada saat tx dibuat).
#[derive(Serialize)]
struct ProposalPayload<'a> {
    name: &'a str,
    link: &'a str,
    kind: &'a ProposalKind,
}

impl Proposal {
    pub fn quorum_param(&self) -> Param {
        match self.kind {
            ProposalKind::Compensation { .. } => Param::QuorumCompensationRequest,
            ProposalKind::Reimbursement { .. } => Param::QuorumReimbursement,
            ProposalKind::ChangeParam { .. } => Param::QuorumChangeParam,
            ProposalKind::Role { .. } => Param::QuorumRole,
            ProposalKind::ConfiscateBond { .. } => Param::QuorumConfiscation,
            ProposalKind::Generic => Param::QuorumGeneric,
            ProposalKind::RemoveAsset { .. } => Param::QuorumRemoveAsset,
        }
    }

    pub fn threshold_param(&self) -> Param {
        match self.kind {
            ProposalKind::Compensation { .. } => Param::ThresholdCompensationRequest,
            ProposalKind::Reimbursement { .. } => Param::ThresholdReimbursement,
            ProposalKind::ChangeParam { .. } => Param::ThresholdChangeParam,
            ProposalKind::Role { .. } => Param::ThresholdRole,
            ProposalKind::ConfiscateBond { .. } => Param::ThresholdConfiscation,
            ProposalKind::Generic => Param::ThresholdGeneric,
            ProposalKind::RemoveAsset { .. } => Param::ThresholdRemoveAsset,
        }
    }

    /// Tx type yang wajib dimiliki tx proposal.
    pub fn tx_type(&self) -> TxType {
        match self.kind {
            ProposalKind::Compensation { .. } => TxType::CompensationRequest,
            ProposalKind::Reimbursement { .. } => TxType::ReimbursementRequest,
            ProposalKind::ChangeParam { .. }
            | ProposalKind::Role { .. }
            | ProposalKind::ConfiscateBond { .. }
            | ProposalKind::Generic
            | ProposalKind::RemoveAsset { .. } => TxType::Proposal,
        }
    }

    /// Jumlah yang diminta untuk funding request.
    pub fn requested_amount(&self) -> Option<u64> {
        match self.kind {
            ProposalKind::Compensation { requested_amount, .. }
            | ProposalKind::Reimbursement { requested_amount, .. } => Some(requested_amount),
            _ => None,
        }
    }

    pub fn is_funding_request(&self) -> bool {
        self.requested_amount().is_some()
    }

    /// Digest yang harus muncul di OP_RETURN tx proposal.
    pub fn payload_hash(&self) -> Result<[u8; DIGEST20_LEN], bincode::Error> {
        let payload = ProposalPayload { name: &self.name, link: &self.link, kind: &self.kind };
        Ok(digest20(&bincode::serialize(&payload)?))
    }

    // ════════════════════════════════════════════════════════════════════════
    // VALIDATION
    // ════════════════════════════════════════════════════════════════════════

    /// Cek proposal terhadap ledger untuk cycle yang berisi `height`.
    pub fn validate(&self, ledger: &LedgerState, height: u64) -> Result<(), ProposalValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProposalValidationError::EmptyField("name"));
        }

        let tx = ledger
            .tx(&self.tx_id)
            .ok_or(ProposalValidationError::TxNotFound(self.tx_id))?;
        if tx.tx_type != self.tx_type() {
            return Err(ProposalValidationError::WrongTxType {
                expected: self.tx_type(),
                actual: tx.tx_type,
            });
        }
        if !ledger.is_tx_in_phase_and_cycle(&self.tx_id, DaoPhase::Proposal, height) {
            return Err(ProposalValidationError::NotInProposalPhase(self.tx_id));
        }

        let expected = self
            .payload_hash()
            .map_err(|e| ProposalValidationError::Encoding(e.to_string()))?;
        let on_chain = tx.op_return_data().and_then(opreturn::payload_hash);
        if on_chain != Some(expected) {
            return Err(ProposalValidationError::HashMismatch(self.tx_id));
        }

        let tx_height = tx.block_height;
        match &self.kind {
            ProposalKind::Compensation { requested_amount, address } => {
                check_amount(
                    *requested_amount,
                    ledger.param_value(Param::CompensationRequestMinAmount, tx_height),
                    ledger.param_value(Param::CompensationRequestMaxAmount, tx_height),
                )?;
                check_not_empty("address", address)
            }
            ProposalKind::Reimbursement { requested_amount, address } => {
                check_amount(
                    *requested_amount,
                    ledger.param_value(Param::ReimbursementMinAmount, tx_height),
                    ledger.param_value(Param::ReimbursementMaxAmount, tx_height),
                )?;
                check_not_empty("address", address)
            }
            ProposalKind::ChangeParam { param, value } => {
                if !param.is_valid_value(*value) {
                    return Err(ProposalValidationError::InvalidParamValue { param: *param, value: *value });
                }
                if ledger.param_value(*param, tx_height) == *value {
                    return Err(ProposalValidationError::ParamUnchanged { param: *param, value: *value });
                }
                Ok(())
            }
            ProposalKind::Role { role } => {
                check_not_empty("role.uid", &role.uid)?;
                check_not_empty("role.name", &role.name)?;
                if role.required_bond == 0 {
                    return Err(ProposalValidationError::EmptyField("role.required_bond"));
                }
                Ok(())
            }
            ProposalKind::ConfiscateBond { lockup_tx_id } => {
                if ledger.lockup_tx(lockup_tx_id).is_none() {
                    return Err(ProposalValidationError::UnknownLockupTx(*lockup_tx_id));
                }
                Ok(())
            }
            ProposalKind::Generic => Ok(()),
            ProposalKind::RemoveAsset { ticker } => check_not_empty("ticker", ticker),
        }
    }
}

fn check_amount(amount: u64, min: u64, max: u64) -> Result<(), ProposalValidationError> {
    if amount < min || amount > max {
        return Err(ProposalValidationError::AmountOutOfRange { amount, min, max });
    }
    Ok(())
}

fn check_not_empty(field: &'static str, value: &str) -> Result<(), ProposalValidationError> {
    if value.trim().is_empty() {
        return Err(ProposalValidationError::EmptyField(field));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalValidationError {
    #[error("proposal tx {0} not found")]
    TxNotFound(TxId),

    #[error("proposal tx has type {actual:?}, expected {expected:?}")]
    WrongTxType { expected: TxType, actual: TxType },

    #[error("proposal tx {0} is not in the proposal phase of this cycle")]
    NotInProposalPhase(TxId),

    #[error("payload hash does not match op_return of {0}")]
    HashMismatch(TxId),

    #[error("amount {amount} outside [{min}, {max}]")]
    AmountOutOfRange { amount: u64, min: u64, max: u64 },

    #[error("invalid value {value} for {param:?}")]
    InvalidParamValue { param: Param, value: u64 },

    #[error("{param:?} already has value {value}")]
    ParamUnchanged { param: Param, value: u64 },

    #[error("no lockup tx {0}")]
    UnknownLockupTx(TxId),

    #[error("field {0} is empty")]
    EmptyField(&'static str),

    #[error("payload encoding: {0}")]
    Encoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash;

    fn proposal(kind: ProposalKind) -> Proposal {
        Proposal { tx_id: Hash::repeat(1), name: "p".into(), link: "https://x".into(), kind }
    }

    #[test]
    fn params_follow_kind() {
        let p = proposal(ProposalKind::ConfiscateBond { lockup_tx_id: Hash::repeat(2) });
        assert_eq!(p.quorum_param(), Param::QuorumConfiscation);
        assert_eq!(p.threshold_param(), Param::ThresholdConfiscation);
        assert_eq!(p.tx_type(), TxType::Proposal);

        let c = proposal(ProposalKind::Compensation { requested_amount: 5_000, address: "a".into() });
        assert_eq!(c.tx_type(), TxType::CompensationRequest);
        assert_eq!(c.requested_amount(), Some(5_000));
        assert!(!p.is_funding_request());
    }

    #[test]
    fn payload_hash_ignores_tx_id() {
        let a = proposal(ProposalKind::Generic);
        let mut b = a.clone();
        b.tx_id = Hash::repeat(9);
        assert_eq!(a.payload_hash().expect("hash"), b.payload_hash().expect("hash"));

        b.name = "other".into();
        assert_ne!(a.payload_hash().expect("hash"), b.payload_hash().expect("hash"));
    }
}
