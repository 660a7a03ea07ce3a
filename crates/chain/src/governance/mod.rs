//! # Governance
//!
//! Voting layer di atas ledger yang sudah diklasifikasi.
//!
//! ## Modules
//!
//! - `proposal`: `Proposal`, `ProposalKind` (closed sum type), `BondedRole`, validasi
//! - `ballot`: `BlindVote`, `Vote`, `Merit`, `DecryptedBallotsWithMerits`,
//!   `EvaluatedProposal`, `BallotDataSource` + `MemoryBallotStore`
//! - `merit`: time-decayed merit weight (`weighted_merit_amount`, `merit_stake`)
//! - `reconcile`: bounded subset search terhadap majority digest
//! - `tally`: `VoteTally`, dipicu di block pertama RESULT phase
//! - `missing_data`: async re-request blind vote yang hilang
//!
//! ## Relationship with `state`
//!
//! - `governance` = compute (pure read atas `LedgerState`)
//! - `state` = penyimpanan hasil, hanya lewat `HeightWindow`

pub mod proposal;
pub mod ballot;
pub mod merit;
pub mod reconcile;
pub mod tally;
pub mod missing_data;

pub use proposal::{BondedRole, BondedRoleType, Proposal, ProposalKind, ProposalValidationError};
pub use ballot::{
    blind_vote_list_digest, Ballot, BallotDataSource, BlindVote, DecryptedBallotsWithMerits, EvaluatedProposal,
    MemoryBallotStore, Merit, ProposalVoteResult, Vote, VoteWithProposalTxId,
};
pub use merit::{merit_stake, weighted_merit_amount, BLOCKS_PER_YEAR, MAX_MERIT_AGE};
pub use reconcile::{find_matching_subset, ReconcileError};
pub use tally::{CycleOutcome, TallyReport, TallyStatus, VoteTally};
pub use missing_data::{DataRequestSender, MissingDataRequester, NewDataSignal};
