//! Governance parameters.
//!
//! Semua value bertipe `u64`:
//! - Amount: base units (2 decimals)
//! - Percent: basis points (10000 = 100.00%)
//! - Blocks: jumlah block
//!
//! Override disimpan sebagai `ParamChange` dan hanya aktif mulai block
//! pertama cycle berikutnya.

use serde::{Deserialize, Serialize};

use cdao_common::Network;

use crate::types::PERCENT_SCALE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Amount,
    Percent,
    Blocks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Param {
    ProposalFee,
    BlindVoteFee,

    CompensationRequestMinAmount,
    CompensationRequestMaxAmount,
    ReimbursementMinAmount,
    ReimbursementMaxAmount,
    /// Batas total issuance yang diterima per cycle.
    IssuanceLimit,

    QuorumCompensationRequest,
    QuorumReimbursement,
    QuorumChangeParam,
    QuorumRole,
    QuorumConfiscation,
    QuorumGeneric,
    QuorumRemoveAsset,

    ThresholdCompensationRequest,
    ThresholdReimbursement,
    ThresholdChangeParam,
    ThresholdRole,
    ThresholdConfiscation,
    ThresholdGeneric,
    ThresholdRemoveAsset,

    PhaseProposal,
    PhaseBreak1,
    PhaseBlindVote,
    PhaseBreak2,
    PhaseVoteReveal,
    PhaseBreak3,
    PhaseResult,
}

impl Param {
    pub const ALL: [Param; 28] = [
        Param::ProposalFee,
        Param::BlindVoteFee,
        Param::CompensationRequestMinAmount,
        Param::CompensationRequestMaxAmount,
        Param::ReimbursementMinAmount,
        Param::ReimbursementMaxAmount,
        Param::IssuanceLimit,
        Param::QuorumCompensationRequest,
        Param::QuorumReimbursement,
        Param::QuorumChangeParam,
        Param::QuorumRole,
        Param::QuorumConfiscation,
        Param::QuorumGeneric,
        Param::QuorumRemoveAsset,
        Param::ThresholdCompensationRequest,
        Param::ThresholdReimbursement,
        Param::ThresholdChangeParam,
        Param::ThresholdRole,
        Param::ThresholdConfiscation,
        Param::ThresholdGeneric,
        Param::ThresholdRemoveAsset,
        Param::PhaseProposal,
        Param::PhaseBreak1,
        Param::PhaseBlindVote,
        Param::PhaseBreak2,
        Param::PhaseVoteReveal,
        Param::PhaseBreak3,
        Param::PhaseResult,
    ];

    pub fn param_type(&self) -> ParamType {
        match self {
            Param::ProposalFee
            | Param::BlindVoteFee
            | Param::CompensationRequestMinAmount
            | Param::CompensationRequestMaxAmount
            | Param::ReimbursementMinAmount
            | Param::ReimbursementMaxAmount
            | Param::IssuanceLimit
            | Param::QuorumCompensationRequest
            | Param::QuorumReimbursement
            | Param::QuorumChangeParam
            | Param::QuorumRole
            | Param::QuorumConfiscation
            | Param::QuorumGeneric
            | Param::QuorumRemoveAsset => ParamType::Amount,
            Param::ThresholdCompensationRequest
            | Param::ThresholdReimbursement
            | Param::ThresholdChangeParam
            | Param::ThresholdRole
            | Param::ThresholdConfiscation
            | Param::ThresholdGeneric
            | Param::ThresholdRemoveAsset => ParamType::Percent,
            Param::PhaseProposal
            | Param::PhaseBreak1
            | Param::PhaseBlindVote
            | Param::PhaseBreak2
            | Param::PhaseVoteReveal
            | Param::PhaseBreak3
            | Param::PhaseResult => ParamType::Blocks,
        }
    }

    pub fn default_value(&self, network: Network) -> u64 {
        match self {
            Param::ProposalFee => 200,
            Param::BlindVoteFee => 200,

            Param::CompensationRequestMinAmount => 1_000,
            Param::CompensationRequestMaxAmount => 10_000_000,
            Param::ReimbursementMinAmount => 1_000,
            Param::ReimbursementMaxAmount => 1_000_000,
            Param::IssuanceLimit => 20_000_000,

            Param::QuorumCompensationRequest => 2_000_000,
            Param::QuorumReimbursement => 2_000_000,
            Param::QuorumChangeParam => 10_000_000,
            Param::QuorumRole => 5_000_000,
            Param::QuorumConfiscation => 20_000_000,
            Param::QuorumGeneric => 500_000,
            Param::QuorumRemoveAsset => 1_000_000,

            Param::ThresholdConfiscation => 8_500,
            Param::ThresholdChangeParam => 7_500,
            Param::ThresholdCompensationRequest
            | Param::ThresholdReimbursement
            | Param::ThresholdRole
            | Param::ThresholdGeneric
            | Param::ThresholdRemoveAsset => 5_000,

            Param::PhaseProposal
            | Param::PhaseBreak1
            | Param::PhaseBlindVote
            | Param::PhaseBreak2
            | Param::PhaseVoteReveal
            | Param::PhaseBreak3
            | Param::PhaseResult => phase_default(*self, network),
        }
    }

    /// Cek value baru untuk proposal param change.
    pub fn is_valid_value(&self, value: u64) -> bool {
        match self.param_type() {
            ParamType::Amount => value > 0,
            // threshold di bawah 50% tidak masuk akal untuk voting
            ParamType::Percent => (PERCENT_SCALE / 2..=PERCENT_SCALE).contains(&value),
            ParamType::Blocks => value > 0,
        }
    }
}

fn phase_default(param: Param, network: Network) -> u64 {
    match network {
        Network::Mainnet => match param {
            Param::PhaseProposal => 3_601,
            Param::PhaseBreak1 => 149,
            Param::PhaseBlindVote => 451,
            Param::PhaseBreak2 => 9,
            Param::PhaseVoteReveal => 451,
            Param::PhaseBreak3 => 9,
            Param::PhaseResult => 10,
            _ => 0,
        },
        Network::Regtest => match param {
            Param::PhaseProposal => 2,
            Param::PhaseBreak1 => 1,
            Param::PhaseBlindVote => 2,
            Param::PhaseBreak2 => 1,
            Param::PhaseVoteReveal => 2,
            Param::PhaseBreak3 => 1,
            Param::PhaseResult => 2,
            _ => 0,
        },
    }
}

/// Override yang aktif mulai `activation_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChange {
    pub param: Param,
    pub value: u64,
    pub activation_height: u64,
}
