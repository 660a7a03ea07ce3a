//! Integration test: request blind vote yang hilang ke peer saat tally
//! ditunda, dengan retry task di tokio runtime.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use cdao_chain::engine::DaoEngine;
use cdao_chain::governance::{blind_vote_list_digest, DataRequestSender, TallyStatus};
use cdao_chain::snapshot::MemorySnapshotStore;
use cdao_chain::types::TxId;

use common::*;

#[derive(Default)]
struct RecordingPeer {
    batches: Mutex<Vec<Vec<TxId>>>,
}

impl DataRequestSender for RecordingPeer {
    fn request_blind_votes(&self, tx_ids: &[TxId]) {
        self.batches.lock().push(tx_ids.to_vec());
    }
}

fn engine_with(peer: Arc<RecordingPeer>) -> DaoEngine {
    let mut cfg = config();
    cfg.reconciliation.retry_interval_secs = 1;
    cfg.reconciliation.max_retries = 2;
    let sender: Arc<dyn DataRequestSender> = peer;
    DaoEngine::with_parts(cfg, Arc::new(MemorySnapshotStore::new(3)), Some(sender)).unwrap()
}

#[tokio::test]
async fn deferred_tally_requests_missing_blind_vote_from_peers() {
    let peer = Arc::new(RecordingPeer::default());
    let mut chain = chain_with_proposals(engine_with(peer.clone()));
    let voters = [
        Voter::new(0, 6_000_000, vec![accept(comp_tx_id())]),
        Voter::new(1, 3_000_000, vec![reject(comp_tx_id())]),
    ];
    let payloads = cast_blind_votes(&mut chain, &voters);
    chain.engine.add_blind_vote(payloads[0].clone());
    let digest = blind_vote_list_digest(&payloads).unwrap();
    reveal_votes(&mut chain, &voters, &digest);
    chain.fill_until(RESULT_BLOCK + 1);

    assert!(matches!(
        chain.engine.tally().last_report().unwrap().status,
        TallyStatus::Deferred { .. }
    ));
    let missing = voters[1].blind_vote_tx_id();
    let requester = chain.engine.requester().unwrap().clone();
    assert_eq!(requester.outstanding(), vec![missing]);

    // tick pertama interval langsung jalan
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(peer.batches.lock().first().cloned(), Some(vec![missing]));

    assert!(chain.engine.add_blind_vote(payloads[1].clone()));
    assert!(requester.outstanding().is_empty());

    chain.push(Vec::new());
    assert_eq!(
        chain.engine.tally().last_report().unwrap().status,
        TallyStatus::Committed { evaluated: 2, accepted: 1 }
    );
    assert!(chain.engine.ledger().is_proposal_accepted(&comp_tx_id()));
}

#[test]
fn without_runtime_request_is_sent_once() {
    let peer = Arc::new(RecordingPeer::default());
    let mut chain = chain_with_proposals(engine_with(peer.clone()));
    let voters = [Voter::new(0, 6_000_000, vec![accept(comp_tx_id())])];
    let payloads = cast_blind_votes(&mut chain, &voters);
    let digest = blind_vote_list_digest(&payloads).unwrap();
    reveal_votes(&mut chain, &voters, &digest);
    chain.fill_until(RESULT_BLOCK + 1);

    assert_eq!(peer.batches.lock().clone(), vec![vec![voters[0].blind_vote_tx_id()]]);
    assert!(!chain.engine.ledger().has_cycle_result(GENESIS));
}
