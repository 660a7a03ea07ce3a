//! # Ballots, Votes & Merits
//!
//! ```text
//! BLIND_VOTE phase                        VOTE_REVEAL phase
//! ┌───────────────────────────┐           ┌───────────────────────────┐
//! │ tx: stake output + OP_RET │           │ tx: spend stake output    │
//! │     digest20(enc votes)   │           │     OP_RET digest || key  │
//! └───────────────────────────┘           └───────────────────────────┘
//!              │                                       │
//!              ▼                                       ▼
//!   BlindVote payload (store)  ──── decrypt(key) ──► DecryptedBallotsWithMerits
//! ```
//!
//! Semua artifact di sini masuk ke hash-chain serialization, jadi
//! koleksinya selalu diurutkan sebelum disimpan.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use cdao_common::crypto::{decrypt_ballot, digest20, encrypt_ballot, BALLOT_KEY_LEN, DIGEST20_LEN};

use super::proposal::Proposal;
use crate::types::{TxId, PERCENT_SCALE};
use crate::DaoError;

// ════════════════════════════════════════════════════════════════════════════
// VOTES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub accepted: bool,
}

/// Satu entry di ballot list voter. `vote = None` berarti voter melihat
/// proposal tapi tidak memilih (ignored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteWithProposalTxId {
    pub proposal_tx_id: TxId,
    pub vote: Option<Vote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub proposal: Proposal,
    pub vote: Option<Vote>,
}

/// Bukti kontribusi historis: signature atas tx id blind vote, dibuat
/// dengan key yang tercatat di issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merit {
    pub issuance_tx_id: TxId,
    pub signature: Vec<u8>,
}

// ════════════════════════════════════════════════════════════════════════════
// BLIND VOTE PAYLOAD
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindVote {
    pub tx_id: TxId,
    pub encrypted_votes: Vec<u8>,
    pub encrypted_merit_list: Vec<u8>,
}

impl BlindVote {
    /// Enkripsi vote list dan merit list dengan ballot key yang sama.
    pub fn seal(
        tx_id: TxId,
        votes: &[VoteWithProposalTxId],
        merits: &[Merit],
        key: &[u8; BALLOT_KEY_LEN],
    ) -> Result<Self, DaoError> {
        let encrypted_votes = encrypt_ballot(key, &bincode::serialize(votes)?)?;
        let encrypted_merit_list = encrypt_ballot(key, &bincode::serialize(merits)?)?;
        Ok(Self { tx_id, encrypted_votes, encrypted_merit_list })
    }

    /// Digest yang dibawa OP_RETURN blind vote tx.
    pub fn commitment(&self) -> [u8; DIGEST20_LEN] {
        digest20(&self.encrypted_votes)
    }

    pub fn open_votes(&self, key: &[u8; BALLOT_KEY_LEN]) -> Result<Vec<VoteWithProposalTxId>, DaoError> {
        let plain = decrypt_ballot(key, &self.encrypted_votes)?;
        Ok(bincode::deserialize(&plain)?)
    }

    pub fn open_merits(&self, key: &[u8; BALLOT_KEY_LEN]) -> Result<Vec<Merit>, DaoError> {
        let plain = decrypt_ballot(key, &self.encrypted_merit_list)?;
        Ok(bincode::deserialize(&plain)?)
    }
}

/// Majority digest: `digest20` atas serialisasi blind vote yang diurutkan
/// berdasarkan tx id, disambung berurutan.
pub fn blind_vote_list_digest(list: &[BlindVote]) -> Result<[u8; DIGEST20_LEN], DaoError> {
    let mut sorted: Vec<&BlindVote> = list.iter().collect();
    sorted.sort_by_key(|b| b.tx_id);
    let mut buf = Vec::new();
    for bv in sorted {
        buf.extend(bincode::serialize(bv)?);
    }
    Ok(digest20(&buf))
}

// ════════════════════════════════════════════════════════════════════════════
// TALLY ARTIFACTS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedBallotsWithMerits {
    pub vote_reveal_tx_id: TxId,
    pub blind_vote_tx_id: TxId,
    pub hash_of_blind_vote_list: [u8; DIGEST20_LEN],
    pub stake: u64,
    /// Merit stake hasil `merit_stake` (sudah diverifikasi dan di-decay).
    pub merit: u64,
    /// Urut berdasarkan proposal tx id.
    pub ballots: Vec<VoteWithProposalTxId>,
    pub merits: Vec<Merit>,
}

impl DecryptedBallotsWithMerits {
    pub fn weight(&self) -> u64 {
        self.stake.saturating_add(self.merit)
    }

    /// `None` kalau proposal tidak ada di ballot list voter.
    pub fn vote_for(&self, proposal_tx_id: &TxId) -> Option<Option<Vote>> {
        self.ballots
            .binary_search_by_key(proposal_tx_id, |b| b.proposal_tx_id)
            .ok()
            .map(|i| self.ballots[i].vote)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalVoteResult {
    pub stake_of_accepted: u64,
    pub stake_of_rejected: u64,
    pub num_accepted: u32,
    pub num_rejected: u32,
    pub num_ignored: u32,
}

impl ProposalVoteResult {
    /// Total weight yang menyatakan pendapat.
    pub fn quorum(&self) -> u64 {
        self.stake_of_accepted.saturating_add(self.stake_of_rejected)
    }

    /// Accepted share dalam basis points (2 desimal implisit).
    pub fn threshold(&self) -> u64 {
        let quorum = self.quorum();
        if quorum == 0 {
            return 0;
        }
        (self.stake_of_accepted as u128 * PERCENT_SCALE as u128 / quorum as u128) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedProposal {
    pub proposal: Proposal,
    pub accepted: bool,
    pub result: ProposalVoteResult,
}

// ════════════════════════════════════════════════════════════════════════════
// DATA SOURCE
// ════════════════════════════════════════════════════════════════════════════

/// Store payload off-chain (proposal dan blind vote) milik collaborator.
pub trait BallotDataSource: Send + Sync {
    fn proposals(&self) -> Vec<Proposal>;

    fn blind_vote(&self, tx_id: &TxId) -> Option<BlindVote>;

    fn blind_votes(&self) -> Vec<BlindVote>;
}

#[derive(Debug, Default)]
pub struct MemoryBallotStore {
    proposals: RwLock<BTreeMap<TxId, Proposal>>,
    blind_votes: RwLock<BTreeMap<TxId, BlindVote>>,
}

impl MemoryBallotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true kalau proposal baru.
    pub fn add_proposal(&self, proposal: Proposal) -> bool {
        self.proposals.write().insert(proposal.tx_id, proposal).is_none()
    }

    pub fn add_blind_vote(&self, blind_vote: BlindVote) -> bool {
        self.blind_votes.write().insert(blind_vote.tx_id, blind_vote).is_none()
    }
}

impl BallotDataSource for MemoryBallotStore {
    fn proposals(&self) -> Vec<Proposal> {
        self.proposals.read().values().cloned().collect()
    }

    fn blind_vote(&self, tx_id: &TxId) -> Option<BlindVote> {
        self.blind_votes.read().get(tx_id).cloned()
    }

    fn blind_votes(&self) -> Vec<BlindVote> {
        self.blind_votes.read().values().cloned().collect()
    }
}
