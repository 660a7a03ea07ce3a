//! # Application-data (OP_RETURN) classification
//!
//! Pure function: byte payload → use-case tag. Tidak ada mutasi.
//!
//! ```text
//! [0]      type tag
//! [1]      version
//! [2..]    type-specific payload
//!
//! Tag   Type                    Len   Payload
//! 0x10  PROPOSAL                22    hash20
//! 0x11  COMPENSATION_REQUEST    22    hash20
//! 0x12  REIMBURSEMENT_REQUEST   22    hash20
//! 0x13  BLIND_VOTE              22    hash20 (encrypted votes)
//! 0x14  VOTE_REVEAL             38    hash20 (majority digest) || key16
//! 0x15  LOCKUP                  25    reason(1) || lock_time(2, BE) || hash20
//! 0x16  ASSET_LISTING_FEE       22    hash20
//! 0x17  PROOF_OF_BURN           22    hash20
//! ```
//!
//! Length mismatch, unknown tag, atau sub-field invalid ⇒ `TxOutputType::Invalid`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::block::TxOutputType;

pub const MIN_LOCK_TIME: u16 = 6;
pub const MAX_LOCK_TIME: u16 = 50_000;

const HASH_LEN: usize = 20;
const KEY_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpReturnType {
    Proposal = 0x10,
    CompensationRequest = 0x11,
    ReimbursementRequest = 0x12,
    BlindVote = 0x13,
    VoteReveal = 0x14,
    Lockup = 0x15,
    AssetListingFee = 0x16,
    ProofOfBurn = 0x17,
}

impl OpReturnType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x10 => Some(OpReturnType::Proposal),
            0x11 => Some(OpReturnType::CompensationRequest),
            0x12 => Some(OpReturnType::ReimbursementRequest),
            0x13 => Some(OpReturnType::BlindVote),
            0x14 => Some(OpReturnType::VoteReveal),
            0x15 => Some(OpReturnType::Lockup),
            0x16 => Some(OpReturnType::AssetListingFee),
            0x17 => Some(OpReturnType::ProofOfBurn),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        *self as u8
    }

    pub fn expected_len(&self) -> usize {
        match self {
            OpReturnType::VoteReveal => 2 + HASH_LEN + KEY_LEN,
            OpReturnType::Lockup => 2 + 1 + 2 + HASH_LEN,
            _ => 2 + HASH_LEN,
        }
    }

    pub fn output_type(&self) -> TxOutputType {
        match self {
            OpReturnType::Proposal => TxOutputType::ProposalOpReturn,
            OpReturnType::CompensationRequest => TxOutputType::CompensationRequestOpReturn,
            OpReturnType::ReimbursementRequest => TxOutputType::ReimbursementRequestOpReturn,
            OpReturnType::BlindVote => TxOutputType::BlindVoteOpReturn,
            OpReturnType::VoteReveal => TxOutputType::VoteRevealOpReturn,
            OpReturnType::Lockup => TxOutputType::LockupOpReturn,
            OpReturnType::AssetListingFee => TxOutputType::AssetListingFeeOpReturn,
            OpReturnType::ProofOfBurn => TxOutputType::ProofOfBurnOpReturn,
        }
    }

    /// Funding request: output index 1 adalah funding candidate.
    pub fn is_funding_request(&self) -> bool {
        matches!(self, OpReturnType::CompensationRequest | OpReturnType::ReimbursementRequest)
    }

    /// Tipe yang hanya membakar fee: output setelah index 0 adalah ordinary value.
    /// Proposal tidak termasuk; fee-nya dicek lewat sisa available balance.
    pub fn is_fee_burn(&self) -> bool {
        matches!(self, OpReturnType::AssetListingFee | OpReturnType::ProofOfBurn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum LockupReason {
    BondedRole = 0x01,
    Reputation = 0x02,
}

impl LockupReason {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(LockupReason::BondedRole),
            0x02 => Some(LockupReason::Reputation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpReturnError {
    #[error("empty application data")]
    Empty,

    #[error("unknown type tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("{op_type:?}: expected {expected} bytes, found {found}")]
    LengthMismatch { op_type: OpReturnType, expected: usize, found: usize },

    #[error("undefined lockup reason 0x{0:02x}")]
    InvalidLockupReason(u8),

    #[error("lock time {0} out of range")]
    LockTimeOutOfRange(u16),
}

/// Decode tag dan validasi panjang + sub-field.
pub fn classify(data: &[u8]) -> Result<OpReturnType, OpReturnError> {
    let tag = *data.first().ok_or(OpReturnError::Empty)?;
    let op_type = OpReturnType::from_tag(tag).ok_or(OpReturnError::UnknownTag(tag))?;

    let expected = op_type.expected_len();
    if data.len() != expected {
        return Err(OpReturnError::LengthMismatch { op_type, expected, found: data.len() });
    }

    if op_type == OpReturnType::Lockup {
        let reason = data[2];
        if LockupReason::from_byte(reason).is_none() {
            return Err(OpReturnError::InvalidLockupReason(reason));
        }
        let lock_time = read_lock_time(data);
        if !(MIN_LOCK_TIME..=MAX_LOCK_TIME).contains(&lock_time) {
            return Err(OpReturnError::LockTimeOutOfRange(lock_time));
        }
    }

    Ok(op_type)
}

fn read_lock_time(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[3], data[4]])
}

// ════════════════════════════════════════════════════════════════════════════
// FIELD ACCESSORS (hanya untuk data yang sudah lolos `classify`)
// ════════════════════════════════════════════════════════════════════════════

pub fn lock_time(data: &[u8]) -> Option<u16> {
    match classify(data) {
        Ok(OpReturnType::Lockup) => Some(read_lock_time(data)),
        _ => None,
    }
}

/// Hash20 pada offset standar (semua tipe kecuali Lockup).
pub fn payload_hash(data: &[u8]) -> Option<[u8; HASH_LEN]> {
    let start = match classify(data).ok()? {
        OpReturnType::Lockup => 5,
        _ => 2,
    };
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&data[start..start + HASH_LEN]);
    Some(out)
}

/// (majority digest, ballot key) dari vote reveal.
pub fn vote_reveal_parts(data: &[u8]) -> Option<([u8; HASH_LEN], [u8; KEY_LEN])> {
    if classify(data).ok()? != OpReturnType::VoteReveal {
        return None;
    }
    let mut digest = [0u8; HASH_LEN];
    digest.copy_from_slice(&data[2..2 + HASH_LEN]);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&data[2 + HASH_LEN..]);
    Some((digest, key))
}

// ════════════════════════════════════════════════════════════════════════════
// BUILDERS
// ════════════════════════════════════════════════════════════════════════════

pub fn build(op_type: OpReturnType, hash: &[u8; HASH_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(op_type.expected_len());
    out.push(op_type.tag());
    out.push(0x01);
    out.extend_from_slice(hash);
    out
}

pub fn build_lockup(reason: LockupReason, lock_time: u16, hash: &[u8; HASH_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(OpReturnType::Lockup.expected_len());
    out.push(OpReturnType::Lockup.tag());
    out.push(0x01);
    out.push(reason as u8);
    out.extend_from_slice(&lock_time.to_be_bytes());
    out.extend_from_slice(hash);
    out
}

pub fn build_vote_reveal(digest: &[u8; HASH_LEN], key: &[u8; KEY_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(OpReturnType::VoteReveal.expected_len());
    out.push(OpReturnType::VoteReveal.tag());
    out.push(0x01);
    out.extend_from_slice(digest);
    out.extend_from_slice(key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_type_for(data: &[u8]) -> TxOutputType {
        classify(data).map(|t| t.output_type()).unwrap_or(TxOutputType::Invalid)
    }

    const ALL: [OpReturnType; 8] = [
        OpReturnType::Proposal,
        OpReturnType::CompensationRequest,
        OpReturnType::ReimbursementRequest,
        OpReturnType::BlindVote,
        OpReturnType::VoteReveal,
        OpReturnType::Lockup,
        OpReturnType::AssetListingFee,
        OpReturnType::ProofOfBurn,
    ];

    fn valid_payload(t: OpReturnType) -> Vec<u8> {
        match t {
            OpReturnType::Lockup => build_lockup(LockupReason::BondedRole, 100, &[9; 20]),
            OpReturnType::VoteReveal => build_vote_reveal(&[1; 20], &[2; 16]),
            other => build(other, &[3; 20]),
        }
    }

    #[test]
    fn expected_lengths() {
        assert_eq!(OpReturnType::Proposal.expected_len(), 22);
        assert_eq!(OpReturnType::Lockup.expected_len(), 25);
        assert_eq!(OpReturnType::VoteReveal.expected_len(), 38);
    }

    #[test]
    fn valid_payloads_classify() {
        for t in ALL {
            assert_eq!(classify(&valid_payload(t)), Ok(t));
            assert_eq!(output_type_for(&valid_payload(t)), t.output_type());
        }
    }

    #[test]
    fn every_wrong_length_is_invalid_output() {
        for t in ALL {
            let valid = valid_payload(t);
            for len in 1..=64usize {
                if len == t.expected_len() {
                    continue;
                }
                let mut data = valid.clone();
                data.resize(len, 0x01);
                assert_eq!(
                    output_type_for(&data),
                    TxOutputType::Invalid,
                    "{:?} with length {} must be invalid",
                    t,
                    len
                );
            }
        }
    }

    #[test]
    fn unknown_tag_and_empty() {
        assert_eq!(classify(&[]), Err(OpReturnError::Empty));
        let mut data = build(OpReturnType::Proposal, &[0; 20]);
        data[0] = 0x42;
        assert_eq!(classify(&data), Err(OpReturnError::UnknownTag(0x42)));
        assert_eq!(output_type_for(&data), TxOutputType::Invalid);
    }

    #[test]
    fn lockup_sub_fields_validated() {
        let mut data = build_lockup(LockupReason::Reputation, 100, &[0; 20]);
        assert_eq!(lock_time(&data), Some(100));
        assert_eq!(LockupReason::from_byte(data[2]), Some(LockupReason::Reputation));

        data[2] = 0x00;
        assert_eq!(classify(&data), Err(OpReturnError::InvalidLockupReason(0)));

        let short = build_lockup(LockupReason::BondedRole, MIN_LOCK_TIME - 1, &[0; 20]);
        assert_eq!(classify(&short), Err(OpReturnError::LockTimeOutOfRange(MIN_LOCK_TIME - 1)));
        let long = build_lockup(LockupReason::BondedRole, MAX_LOCK_TIME + 1, &[0; 20]);
        assert!(classify(&long).is_err());
        let edge = build_lockup(LockupReason::BondedRole, MAX_LOCK_TIME, &[0; 20]);
        assert_eq!(classify(&edge), Ok(OpReturnType::Lockup));
    }

    #[test]
    fn vote_reveal_fields() {
        let data = build_vote_reveal(&[7; 20], &[8; 16]);
        let (digest, key) = vote_reveal_parts(&data).expect("parts");
        assert_eq!(digest, [7; 20]);
        assert_eq!(key, [8; 16]);
        assert_eq!(payload_hash(&data), Some([7; 20]));
        assert!(vote_reveal_parts(&build(OpReturnType::BlindVote, &[0; 20])).is_none());
    }
}
