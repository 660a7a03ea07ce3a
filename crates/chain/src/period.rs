//! Governance Cycle & Phase Module
//!
//! A cycle is a contiguous, non-overlapping range of block heights split into
//! sequential phases:
//!
//! ```text
//! PROPOSAL → BREAK1 → BLIND_VOTE → BREAK2 → VOTE_REVEAL → BREAK3 → RESULT
//! ```
//!
//! Phase durations are read from the params active at the cycle's first
//! block. The last block height is always derived, never stored.

use serde::{Deserialize, Serialize};

use crate::param::Param;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DaoPhase {
    Proposal,
    Break1,
    BlindVote,
    Break2,
    VoteReveal,
    Break3,
    Result,
}

impl DaoPhase {
    /// Ordered phases of a cycle.
    pub const ALL: [DaoPhase; 7] = [
        DaoPhase::Proposal,
        DaoPhase::Break1,
        DaoPhase::BlindVote,
        DaoPhase::Break2,
        DaoPhase::VoteReveal,
        DaoPhase::Break3,
        DaoPhase::Result,
    ];

    pub fn duration_param(&self) -> Param {
        match self {
            DaoPhase::Proposal => Param::PhaseProposal,
            DaoPhase::Break1 => Param::PhaseBreak1,
            DaoPhase::BlindVote => Param::PhaseBlindVote,
            DaoPhase::Break2 => Param::PhaseBreak2,
            DaoPhase::VoteReveal => Param::PhaseVoteReveal,
            DaoPhase::Break3 => Param::PhaseBreak3,
            DaoPhase::Result => Param::PhaseResult,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDuration {
    pub phase: DaoPhase,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub height_of_first_block: u64,
    pub phases: Vec<PhaseDuration>,
}

impl Cycle {
    pub fn new(height_of_first_block: u64, phases: Vec<PhaseDuration>) -> Self {
        Self { height_of_first_block, phases }
    }

    /// Build a cycle with durations looked up through `duration_of`.
    pub fn from_params(height_of_first_block: u64, duration_of: impl Fn(Param) -> u64) -> Self {
        let phases = DaoPhase::ALL
            .iter()
            .map(|p| PhaseDuration { phase: *p, duration: duration_of(p.duration_param()) })
            .collect();
        Self::new(height_of_first_block, phases)
    }

    pub fn duration(&self) -> u64 {
        self.phases.iter().map(|p| p.duration).sum()
    }

    /// Derived: first block + sum of durations - 1.
    pub fn height_of_last_block(&self) -> u64 {
        (self.height_of_first_block + self.duration()).saturating_sub(1)
    }

    pub fn contains(&self, height: u64) -> bool {
        height >= self.height_of_first_block && height <= self.height_of_last_block()
    }

    pub fn first_block_of_phase(&self, phase: DaoPhase) -> u64 {
        let offset: u64 = self
            .phases
            .iter()
            .take_while(|p| p.phase != phase)
            .map(|p| p.duration)
            .sum();
        self.height_of_first_block + offset
    }

    pub fn phase_for_height(&self, height: u64) -> Option<DaoPhase> {
        if !self.contains(height) {
            return None;
        }
        let mut start = self.height_of_first_block;
        for p in &self.phases {
            if height < start + p.duration {
                return Some(p.phase);
            }
            start += p.duration;
        }
        None
    }

    pub fn is_in_phase(&self, height: u64, phase: DaoPhase) -> bool {
        self.phase_for_height(height) == Some(phase)
    }
}
