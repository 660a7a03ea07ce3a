//! # Vote Tally
//!
//! Dijalankan di `HeightWindow` block pertama RESULT phase. Alur:
//!
//! ```text
//! 1. reveal tx (VOTE_REVEAL phase)  ─► (majority digest, key, stake)
//! 2. majority digest                 ─► stake terbanyak, wajib >= 80% total
//! 3. blind vote lokal                ─► reconcile ke majority digest
//! 4. decrypt ballot + merit          ─► DecryptedBallotsWithMerits
//! 5. per proposal                    ─► ProposalVoteResult, quorum, threshold
//! 6. cap issuance                    ─► lewat batas = seluruh cycle dibuang
//! 7. commit                          ─► issuance, param, confiscation, role, asset
//! ```
//!
//! | Hasil compute | Aksi |
//! |---------------|------|
//! | `Ok` | commit, cycle selesai |
//! | `ReconciliationFailure` | request data hilang, tunda; ulang saat ada data baru |
//! | `ConsensusViolation` | log error, cycle ditutup tanpa commit |
//!
//! Compute murni atas ledger + data source, jadi aman diulang.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use cdao_common::crypto::{BALLOT_KEY_LEN, DIGEST20_LEN};

use super::ballot::{
    blind_vote_list_digest, BallotDataSource, BlindVote, DecryptedBallotsWithMerits, EvaluatedProposal,
    ProposalVoteResult,
};
use super::merit::merit_stake;
use super::missing_data::{MissingDataRequester, NewDataSignal};
use super::proposal::{Proposal, ProposalKind};
use super::reconcile::find_matching_subset;
use crate::block::{TxOutputType, TxType};
use crate::opreturn;
use crate::param::{Param, ParamChange};
use crate::parser::HeightHook;
use crate::period::{Cycle, DaoPhase};
use crate::state::{HeightWindow, Issuance, IssuanceType, LedgerState};
use crate::types::TxId;
use crate::DaoError;

/// Supermajority data view: `first * 100 >= total * 80`.
pub const MAJORITY_PERCENT: u128 = 80;

// ════════════════════════════════════════════════════════════════════════════
// REPORT TYPES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyStatus {
    Committed { evaluated: usize, accepted: usize },
    Deferred { reason: String },
    Discarded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyReport {
    pub cycle_start: u64,
    pub height: u64,
    pub status: TallyStatus,
}

/// Hasil compute satu cycle, belum di-commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub cycle_start: u64,
    pub evaluated: Vec<EvaluatedProposal>,
    pub decrypted: Vec<DecryptedBallotsWithMerits>,
}

impl CycleOutcome {
    pub fn accepted(&self) -> impl Iterator<Item = &EvaluatedProposal> {
        self.evaluated.iter().filter(|e| e.accepted)
    }
}

/// Vote reveal yang sudah di-link ke blind vote tx-nya.
#[derive(Debug, Clone)]
struct RevealInfo {
    tx_id: TxId,
    blind_vote_tx_id: TxId,
    stake: u64,
    digest: [u8; DIGEST20_LEN],
    key: [u8; BALLOT_KEY_LEN],
}

// ════════════════════════════════════════════════════════════════════════════
// VOTE TALLY
// ════════════════════════════════════════════════════════════════════════════

pub struct VoteTally {
    source: Arc<dyn BallotDataSource>,
    signal: Arc<NewDataSignal>,
    requester: Option<Arc<MissingDataRequester>>,
    max_iterations: u64,
    /// Cycle start yang menunggu data baru.
    deferred: Option<u64>,
    /// Cycle yang hasilnya dibuang (consensus violation).
    closed: BTreeSet<u64>,
    last_report: Option<TallyReport>,
}

impl VoteTally {
    pub fn new(source: Arc<dyn BallotDataSource>, signal: Arc<NewDataSignal>, max_iterations: u64) -> Self {
        Self {
            source,
            signal,
            requester: None,
            max_iterations,
            deferred: None,
            closed: BTreeSet::new(),
            last_report: None,
        }
    }

    pub fn with_requester(mut self, requester: Arc<MissingDataRequester>) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn last_report(&self) -> Option<&TallyReport> {
        self.last_report.as_ref()
    }

    pub fn deferred_cycle(&self) -> Option<u64> {
        self.deferred
    }

    pub fn is_closed(&self, cycle_start: u64) -> bool {
        self.closed.contains(&cycle_start)
    }

    /// Lupakan state in-memory (dipakai setelah rollback).
    pub fn reset(&mut self) {
        self.deferred = None;
        self.closed.clear();
        self.last_report = None;
    }

    fn report(&mut self, cycle_start: u64, height: u64, status: TallyStatus) {
        self.last_report = Some(TallyReport { cycle_start, height, status });
    }

    // ════════════════════════════════════════════════════════════════════════
    // TRIGGER
    // ════════════════════════════════════════════════════════════════════════

    fn should_run(&mut self, ledger: &LedgerState, cycle: &Cycle, height: u64) -> bool {
        let start = cycle.height_of_first_block;
        if self.deferred.is_some_and(|d| d != start) {
            debug!("dropping deferred tally of cycle {}", start);
            self.deferred = None;
        }
        if !cycle.is_in_phase(height, DaoPhase::Result) {
            return false;
        }
        if ledger.has_cycle_result(start) || self.closed.contains(&start) {
            return false;
        }
        if height == cycle.first_block_of_phase(DaoPhase::Result) {
            self.signal.take();
            return true;
        }
        self.deferred == Some(start) && self.signal.take()
    }

    fn run(&mut self, window: &mut HeightWindow<'_>) {
        let height = window.height();
        let cycle = match window.ledger().cycle_for_height(height) {
            Some(c) => c.clone(),
            None => return,
        };
        if !self.should_run(window.ledger(), &cycle, height) {
            return;
        }

        let start = cycle.height_of_first_block;
        let trigger = cycle.first_block_of_phase(DaoPhase::Result);
        match self.compute(window.ledger(), &cycle) {
            Ok(outcome) => {
                let evaluated = outcome.evaluated.len();
                let accepted = outcome.accepted().count();
                info!(
                    "cycle {} tallied at height {}: {} proposals, {} accepted, {} ballots",
                    start,
                    height,
                    evaluated,
                    accepted,
                    outcome.decrypted.len()
                );
                apply_outcome(window, &cycle, trigger, outcome);
                self.deferred = None;
                self.report(start, height, TallyStatus::Committed { evaluated, accepted });
            }
            Err(e @ DaoError::ReconciliationFailure { .. }) => {
                warn!("{}; tally deferred", e);
                let missing = self.missing_blind_votes(window.ledger(), &cycle);
                if let Some(req) = &self.requester {
                    if !missing.is_empty() {
                        req.request(&missing);
                    }
                }
                self.deferred = Some(start);
                self.report(start, height, TallyStatus::Deferred { reason: e.to_string() });
            }
            Err(e @ DaoError::ConsensusViolation { .. }) => {
                error!("{}; cycle result discarded", e);
                self.closed.insert(start);
                self.deferred = None;
                self.report(start, height, TallyStatus::Discarded { reason: e.to_string() });
            }
            Err(e) => {
                error!("tally of cycle {} failed: {}", start, e);
                self.deferred = Some(start);
                self.report(start, height, TallyStatus::Deferred { reason: e.to_string() });
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // COMPUTE
    // ════════════════════════════════════════════════════════════════════════

    /// Hitung hasil cycle tanpa mutasi.
    pub fn compute(&self, ledger: &LedgerState, cycle: &Cycle) -> Result<CycleOutcome, DaoError> {
        let start = cycle.height_of_first_block;
        let trigger = cycle.first_block_of_phase(DaoPhase::Result);

        let proposals = self.cycle_proposals(ledger, trigger);
        let reveals = collect_reveals(ledger, trigger);

        let mut decrypted = Vec::new();
        if !reveals.is_empty() {
            let majority = majority_digest(&reveals, start)?;
            let local = self.local_blind_votes(ledger, trigger);
            let list = find_matching_subset(&local, &majority, self.max_iterations, |l: &[BlindVote]| {
                blind_vote_list_digest(l)
            })
            .map_err(|e| DaoError::ReconciliationFailure { cycle_start: start, reason: e.to_string() })?;

            let by_tx: BTreeMap<TxId, &BlindVote> = list.iter().map(|b| (b.tx_id, b)).collect();
            for reveal in &reveals {
                let blind_vote = match by_tx.get(&reveal.blind_vote_tx_id) {
                    Some(b) => *b,
                    None => {
                        debug!("reveal {} not part of majority view", reveal.tx_id.short());
                        continue;
                    }
                };
                match decrypt(ledger, reveal, blind_vote, majority) {
                    Ok(d) => decrypted.push(d),
                    Err(e) => warn!("{}", e),
                }
            }
        }
        decrypted.sort_by_key(|d| d.vote_reveal_tx_id);

        // vote untuk proposal cycle ini yang payload-nya belum ada lokal
        let known: BTreeSet<TxId> = proposals.iter().map(|(p, _)| p.tx_id).collect();
        for d in &decrypted {
            for b in &d.ballots {
                if !known.contains(&b.proposal_tx_id)
                    && ledger.is_tx_in_phase_and_cycle(&b.proposal_tx_id, DaoPhase::Proposal, trigger)
                {
                    return Err(DaoError::ReconciliationFailure {
                        cycle_start: start,
                        reason: format!("ballot references unknown proposal {}", b.proposal_tx_id),
                    });
                }
            }
        }

        let evaluated: Vec<EvaluatedProposal> = proposals
            .into_iter()
            .map(|(p, valid)| evaluate(ledger, p, valid, &decrypted, trigger))
            .collect();

        let issued: u128 = evaluated
            .iter()
            .filter(|e| e.accepted)
            .filter_map(|e| e.proposal.requested_amount())
            .map(|a| a as u128)
            .sum();
        let limit = ledger.param_value(Param::IssuanceLimit, trigger);
        if issued > limit as u128 {
            return Err(DaoError::ConsensusViolation {
                cycle_start: start,
                reason: format!("accepted issuance {} exceeds limit {}", issued, limit),
            });
        }

        Ok(CycleOutcome { cycle_start: start, evaluated, decrypted })
    }

    /// Proposal dari data source yang tx-nya ada di proposal phase cycle
    /// ini, plus hasil validasi. Urut tx id.
    fn cycle_proposals(&self, ledger: &LedgerState, trigger: u64) -> Vec<(Proposal, bool)> {
        let mut out: Vec<(Proposal, bool)> = self
            .source
            .proposals()
            .into_iter()
            .filter(|p| ledger.is_tx_in_phase_and_cycle(&p.tx_id, DaoPhase::Proposal, trigger))
            .map(|p| {
                let valid = match p.validate(ledger, trigger) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("proposal {} invalid: {}", p.tx_id.short(), e);
                        false
                    }
                };
                (p, valid)
            })
            .collect();
        out.sort_by_key(|(p, _)| p.tx_id);
        out
    }

    /// Blind vote payload lokal yang cocok dengan blind vote tx cycle ini.
    fn local_blind_votes(&self, ledger: &LedgerState, trigger: u64) -> Vec<BlindVote> {
        let mut out: Vec<BlindVote> = self
            .source
            .blind_votes()
            .into_iter()
            .filter(|bv| {
                let tx = match ledger.tx(&bv.tx_id) {
                    Some(tx) if tx.tx_type == TxType::BlindVote => tx,
                    _ => return false,
                };
                if !ledger.is_tx_in_phase_and_cycle(&bv.tx_id, DaoPhase::BlindVote, trigger) {
                    return false;
                }
                let on_chain = tx.op_return_data().and_then(opreturn::payload_hash);
                if on_chain != Some(bv.commitment()) {
                    warn!("blind vote payload {} does not match its tx", bv.tx_id.short());
                    return false;
                }
                true
            })
            .collect();
        out.sort_by_key(|b| b.tx_id);
        out
    }

    /// Blind vote tx yang dirujuk reveal tapi payload-nya tidak ada lokal.
    pub fn missing_blind_votes(&self, ledger: &LedgerState, cycle: &Cycle) -> Vec<TxId> {
        let trigger = cycle.first_block_of_phase(DaoPhase::Result);
        collect_reveals(ledger, trigger)
            .into_iter()
            .map(|r| r.blind_vote_tx_id)
            .filter(|id| self.source.blind_vote(id).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl HeightHook for VoteTally {
    fn on_new_height(&mut self, window: &mut HeightWindow<'_>) {
        self.run(window);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HELPERS
// ════════════════════════════════════════════════════════════════════════════

fn collect_reveals(ledger: &LedgerState, trigger: u64) -> Vec<RevealInfo> {
    let mut out = Vec::new();
    for tx in ledger.txs().filter(|t| t.tx_type == TxType::VoteReveal) {
        if !ledger.is_tx_in_phase_and_cycle(&tx.id, DaoPhase::VoteReveal, trigger) {
            continue;
        }
        let (digest, key) = match tx.op_return_data().and_then(opreturn::vote_reveal_parts) {
            Some(parts) => parts,
            None => continue,
        };
        let stake_input = tx.inputs.iter().find_map(|i| {
            ledger
                .tx_output(&i.connected)
                .filter(|o| o.output_type == TxOutputType::BlindVoteLockStake)
                .map(|o| (o.tx_id, o.value))
        });
        let (blind_vote_tx_id, stake) = match stake_input {
            Some(s) => s,
            None => {
                warn!("reveal {} has no blind vote stake input", tx.id.short());
                continue;
            }
        };
        if !ledger.is_tx_in_phase_and_cycle(&blind_vote_tx_id, DaoPhase::BlindVote, trigger) {
            warn!("reveal {} links to blind vote outside this cycle", tx.id.short());
            continue;
        }
        out.push(RevealInfo { tx_id: tx.id, blind_vote_tx_id, stake, digest, key });
    }
    out.sort_by_key(|r| r.tx_id);
    out
}

/// Digest dengan stake terbanyak; seri dimenangkan digest terkecil.
fn majority_digest(reveals: &[RevealInfo], cycle_start: u64) -> Result<[u8; DIGEST20_LEN], DaoError> {
    let mut by_digest: BTreeMap<[u8; DIGEST20_LEN], u128> = BTreeMap::new();
    for r in reveals {
        *by_digest.entry(r.digest).or_insert(0) += r.stake as u128;
    }
    let total: u128 = by_digest.values().sum();
    let mut best: Option<([u8; DIGEST20_LEN], u128)> = None;
    for (digest, stake) in &by_digest {
        if best.map_or(true, |(_, s)| *stake > s) {
            best = Some((*digest, *stake));
        }
    }
    let (digest, first) = match best {
        Some(b) => b,
        None => {
            return Err(DaoError::ReconciliationFailure {
                cycle_start,
                reason: "no vote reveals".to_string(),
            })
        }
    };
    if first * 100 < total * MAJORITY_PERCENT {
        return Err(DaoError::ConsensusViolation {
            cycle_start,
            reason: format!("majority data view has {} of {} stake, below 80%", first, total),
        });
    }
    Ok(digest)
}

fn decrypt(
    ledger: &LedgerState,
    reveal: &RevealInfo,
    blind_vote: &BlindVote,
    majority: [u8; DIGEST20_LEN],
) -> Result<DecryptedBallotsWithMerits, DaoError> {
    let failure = |e: DaoError| DaoError::DecryptionFailure { reveal_tx_id: reveal.tx_id, reason: e.to_string() };
    let mut ballots = blind_vote.open_votes(&reveal.key).map_err(failure)?;
    let merits = blind_vote.open_merits(&reveal.key).map_err(failure)?;
    ballots.sort_by_key(|b| b.proposal_tx_id);
    ballots.dedup_by_key(|b| b.proposal_tx_id);
    let merit = merit_stake(ledger, &merits, &reveal.blind_vote_tx_id);
    Ok(DecryptedBallotsWithMerits {
        vote_reveal_tx_id: reveal.tx_id,
        blind_vote_tx_id: reveal.blind_vote_tx_id,
        hash_of_blind_vote_list: majority,
        stake: reveal.stake,
        merit,
        ballots,
        merits,
    })
}

/// Proposal yang tidak ada di ballot list voter dihitung sebagai reject.
fn evaluate(
    ledger: &LedgerState,
    proposal: Proposal,
    valid: bool,
    decrypted: &[DecryptedBallotsWithMerits],
    height: u64,
) -> EvaluatedProposal {
    let mut result = ProposalVoteResult::default();
    for d in decrypted {
        let weight = d.weight();
        match d.vote_for(&proposal.tx_id) {
            Some(Some(v)) if v.accepted => {
                result.stake_of_accepted = result.stake_of_accepted.saturating_add(weight);
                result.num_accepted += 1;
            }
            Some(Some(_)) | None => {
                result.stake_of_rejected = result.stake_of_rejected.saturating_add(weight);
                result.num_rejected += 1;
            }
            Some(None) => result.num_ignored += 1,
        }
    }

    let required_quorum = ledger.param_value(proposal.quorum_param(), height);
    let required_threshold = ledger.param_value(proposal.threshold_param(), height);
    let accepted = valid && result.quorum() >= required_quorum && result.threshold() > required_threshold;
    debug!(
        "proposal {} accepted={} quorum={}/{} threshold={}/{}",
        proposal.tx_id.short(),
        accepted,
        result.quorum(),
        required_quorum,
        result.threshold(),
        required_threshold
    );
    EvaluatedProposal { proposal, accepted, result }
}

// ════════════════════════════════════════════════════════════════════════════
// COMMIT
// ════════════════════════════════════════════════════════════════════════════

fn apply_outcome(window: &mut HeightWindow<'_>, cycle: &Cycle, trigger: u64, outcome: CycleOutcome) {
    let activation = cycle.height_of_last_block() + 1;

    let mut param_counts: BTreeMap<Param, usize> = BTreeMap::new();
    for e in outcome.accepted() {
        if let ProposalKind::ChangeParam { param, .. } = e.proposal.kind {
            *param_counts.entry(param).or_insert(0) += 1;
        }
    }

    for e in outcome.accepted() {
        let p = &e.proposal;
        match &p.kind {
            ProposalKind::Compensation { requested_amount, .. } => {
                issue(window, p.tx_id, *requested_amount, IssuanceType::Compensation, trigger)
            }
            ProposalKind::Reimbursement { requested_amount, .. } => {
                issue(window, p.tx_id, *requested_amount, IssuanceType::Reimbursement, trigger)
            }
            ProposalKind::ChangeParam { param, value } => {
                if param_counts.get(param).copied().unwrap_or(0) > 1 {
                    warn!("conflicting accepted changes for {:?}, none applied", param);
                    continue;
                }
                window.add_param_change(ParamChange { param: *param, value: *value, activation_height: activation });
            }
            ProposalKind::Role { role } => window.activate_role(role.clone()),
            ProposalKind::ConfiscateBond { lockup_tx_id } => {
                window.confiscate_bond(lockup_tx_id);
            }
            ProposalKind::Generic => {}
            ProposalKind::RemoveAsset { ticker } => window.remove_asset(ticker),
        }
    }

    window.set_cycle_result(outcome.cycle_start, outcome.evaluated, outcome.decrypted);
}

fn issue(window: &mut HeightWindow<'_>, tx_id: TxId, amount: u64, issuance_type: IssuanceType, height: u64) {
    let ledger = window.ledger();
    let candidate = match ledger.issuance_candidate_output(&tx_id) {
        Some(c) if c.value == amount => c.clone(),
        Some(c) => {
            warn!("issuance candidate of {} has value {}, requested {}", tx_id.short(), c.value, amount);
            return;
        }
        None => {
            warn!("funding request {} has no issuance candidate", tx_id.short());
            return;
        }
    };
    let pub_key = ledger
        .tx(&tx_id)
        .and_then(|tx| tx.inputs.first())
        .and_then(|i| i.pub_key.clone());
    window.add_issuance(
        Issuance { tx_id, chain_height: height, amount, pub_key, issuance_type },
        &candidate,
    );
}
