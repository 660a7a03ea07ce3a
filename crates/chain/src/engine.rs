//! # DAO Engine
//!
//! Pemilik tunggal `LedgerState`. Menghubungkan block classifier, vote
//! tally (sebagai height hook), snapshot manager dan ballot data.
//!
//! ```text
//! block source ──► submit_block() ──► BlockClassifier ──► LedgerState
//!                        │                  │
//!                        │                  ├─ VoteTally (HeightHook)
//!                        │                  └─ SnapshotManager (per block complete)
//!                        │
//!                        └─ ChainDiscontinuity ──► rollback ke snapshot
//!                                                  (atau reset) → RolledBack
//!
//! peer network ──► add_proposal() / add_blind_vote() ──► MemoryBallotStore
//!                                                       + NewDataSignal
//! ```
//!
//! ## Mode
//!
//! | Mode | Perilaku |
//! |------|----------|
//! | replay | block historis, listener mahal ditunda, tanpa snapshot |
//! | steady state | setelah `mark_replay_complete()` |

use std::sync::Arc;

use tracing::{debug, info, warn};

use cdao_common::DaoConfig;

use crate::governance::{
    BlindVote, DataRequestSender, MemoryBallotStore, MissingDataRequester, NewDataSignal, Proposal, VoteTally,
};
use crate::parser::{BlockClassifier, SubmitOutcome};
use crate::raw::RawBlock;
use crate::snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotManager, SnapshotStore};
use crate::state::{LedgerListener, LedgerState};
use crate::DaoError;

#[derive(Debug)]
pub enum EngineOutcome {
    Classified(SubmitOutcome),
    /// Chain discontinuity: ledger dikembalikan, block source harus mengirim
    /// ulang mulai `resume_from`.
    RolledBack { discontinuity_height: u64, resume_from: u64 },
}

pub struct DaoEngine {
    config: DaoConfig,
    ledger: LedgerState,
    classifier: BlockClassifier,
    snapshots: SnapshotManager,
    tally: VoteTally,
    ballots: Arc<MemoryBallotStore>,
    signal: Arc<NewDataSignal>,
    requester: Option<Arc<MissingDataRequester>>,
}

impl DaoEngine {
    /// Store snapshot dari config: file kalau `snapshot.path` diisi.
    pub fn new(config: DaoConfig) -> Result<Self, DaoError> {
        let store: Arc<dyn SnapshotStore> = match &config.snapshot.path {
            Some(path) => Arc::new(FileSnapshotStore::open(path, config.snapshot.max_snapshots)?),
            None => Arc::new(MemorySnapshotStore::new(config.snapshot.max_snapshots)),
        };
        Self::with_parts(config, store, None)
    }

    pub fn with_parts(
        config: DaoConfig,
        store: Arc<dyn SnapshotStore>,
        sender: Option<Arc<dyn DataRequestSender>>,
    ) -> Result<Self, DaoError> {
        config.validate().map_err(|e| DaoError::Config(format!("{:#}", e)))?;
        let ledger = LedgerState::from_config(&config)?;

        let ballots = Arc::new(MemoryBallotStore::new());
        let signal = Arc::new(NewDataSignal::new());
        let requester = sender.map(|s| {
            Arc::new(MissingDataRequester::new(s, signal.clone(), &config.reconciliation))
        });
        let mut tally = VoteTally::new(ballots.clone(), signal.clone(), config.reconciliation.max_iterations);
        if let Some(r) = &requester {
            tally = tally.with_requester(r.clone());
        }
        let snapshots = SnapshotManager::new(store, config.snapshot.interval_blocks);

        info!(
            "dao engine on {} from genesis {} (hard fork {})",
            config.network,
            config.genesis.height,
            config.hard_fork_height
        );
        Ok(Self {
            config,
            ledger,
            classifier: BlockClassifier::new(),
            snapshots,
            tally,
            ballots,
            signal,
            requester,
        })
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn ballot_store(&self) -> &Arc<MemoryBallotStore> {
        &self.ballots
    }

    pub fn requester(&self) -> Option<&Arc<MissingDataRequester>> {
        self.requester.as_ref()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn LedgerListener>) {
        self.ledger.add_listener(listener);
    }

    // ════════════════════════════════════════════════════════════════════════
    // BALLOT DATA
    // ════════════════════════════════════════════════════════════════════════

    pub fn add_proposal(&self, proposal: Proposal) -> bool {
        let added = self.ballots.add_proposal(proposal);
        if added {
            self.signal.notify();
        }
        added
    }

    pub fn add_blind_vote(&self, blind_vote: BlindVote) -> bool {
        let tx_id = blind_vote.tx_id;
        let added = self.ballots.add_blind_vote(blind_vote);
        if added {
            match &self.requester {
                Some(r) => r.mark_received(&tx_id),
                None => self.signal.notify(),
            }
        }
        added
    }

    // ════════════════════════════════════════════════════════════════════════
    // BLOCKS
    // ════════════════════════════════════════════════════════════════════════

    /// Bulk replay block historis. Berhenti di error pertama yang bukan
    /// discontinuity.
    pub fn replay(&mut self, blocks: impl IntoIterator<Item = RawBlock>) -> Result<u64, DaoError> {
        let mut applied = 0u64;
        for block in blocks {
            if let EngineOutcome::Classified(SubmitOutcome::Applied(reports)) = self.submit_block(block)? {
                applied += reports.len() as u64;
            }
        }
        debug!("replayed {} blocks, tip {}", applied, self.ledger.chain_height());
        Ok(applied)
    }

    /// Akhir replay: listener yang ditunda dipanggil sekali.
    pub fn mark_replay_complete(&mut self) {
        self.ledger.mark_replay_complete();
    }

    pub fn submit_block(&mut self, raw: RawBlock) -> Result<EngineOutcome, DaoError> {
        let snapshots = &mut self.snapshots;
        let result = self.classifier.submit_with(&mut self.ledger, raw, &mut self.tally, &mut |ledger| {
            snapshots.on_block_complete(ledger)
        });
        match result {
            Ok(outcome) => Ok(EngineOutcome::Classified(outcome)),
            Err(DaoError::ChainDiscontinuity { height, reason }) => {
                warn!("chain discontinuity at {}: {}", height, reason);
                self.rollback(height)
            }
            Err(e) => Err(e),
        }
    }

    fn rollback(&mut self, height: u64) -> Result<EngineOutcome, DaoError> {
        self.classifier.clear_pending();
        match self.snapshots.rollback_target(height)? {
            Some(snapshot) => {
                info!("rolling back to snapshot at height {}", snapshot.height);
                self.ledger.restore(snapshot);
            }
            None => {
                info!("no snapshot below {}, re-classifying from genesis", height);
                self.ledger.reset();
            }
        }
        self.tally.reset();
        Ok(EngineOutcome::RolledBack {
            discontinuity_height: height,
            resume_from: self.ledger.next_expected_height(),
        })
    }
}
