//! Parser unit tests: klasifikasi tx lewat `BlockClassifier` di atas ledger
//! regtest (cycle 11 block mulai dari genesis).
//!
//! ```text
//! 100-101 proposal │ 102 break │ 103-104 blind vote │ 105 break
//! 106-107 reveal   │ 108 break │ 109-110 result
//! ```

use cdao_common::Network;

use super::*;
use crate::block::{TxOutputType, TxType};
use crate::opreturn::{self, LockupReason, OpReturnType};
use crate::raw::{RawBlock, RawTx, RawTxInput, RawTxOutput};
use crate::state::{GenesisParams, LedgerState};
use crate::types::{Hash, TxId, TxOutputKey};
use crate::DaoError;

const GENESIS: u64 = 100;

fn genesis_id() -> TxId {
    Hash::repeat(0x47)
}

fn ledger() -> LedgerState {
    LedgerState::new(
        Network::Regtest,
        GenesisParams { height: GENESIS, tx_id: genesis_id(), total_supply: 1_000_000 },
        1,
    )
}

fn hash_at(height: u64) -> Hash {
    let mut b = [0x3cu8; 32];
    b[..8].copy_from_slice(&height.to_be_bytes());
    Hash(b)
}

fn raw_block(height: u64, txs: Vec<RawTx>) -> RawBlock {
    RawBlock {
        height,
        time: 1_700_000_000 + height,
        hash: hash_at(height),
        previous_block_hash: if height == GENESIS { Hash::ZERO } else { hash_at(height - 1) },
        txs,
    }
}

fn out(value: u64) -> RawTxOutput {
    RawTxOutput { index: 0, value, address: Some("addr".into()), op_return_data: None }
}

fn op_out(data: Vec<u8>) -> RawTxOutput {
    RawTxOutput { index: 0, value: 0, address: None, op_return_data: Some(data) }
}

fn raw_tx(id: TxId, inputs: &[TxOutputKey], outputs: Vec<RawTxOutput>) -> RawTx {
    RawTx {
        id,
        block_height: 0,
        block_hash: Hash::ZERO,
        time: 0,
        inputs: inputs.iter().map(|k| RawTxInput { connected: *k, pub_key: None }).collect(),
        outputs: outputs
            .into_iter()
            .enumerate()
            .map(|(i, o)| RawTxOutput { index: i as u32, ..o })
            .collect(),
    }
}

fn genesis_key(index: u32) -> TxOutputKey {
    TxOutputKey::new(genesis_id(), index)
}

fn apply(ledger: &mut LedgerState, classifier: &mut BlockClassifier, block: RawBlock) -> Vec<BlockReport> {
    match classifier.submit(ledger, block, &mut NoopHook) {
        Ok(SubmitOutcome::Applied(reports)) => reports,
        other => panic!("expected Applied, got {:?}", other),
    }
}

/// Genesis block: 600_000 + 400_000.
fn with_genesis() -> (LedgerState, BlockClassifier) {
    let mut l = ledger();
    let mut c = BlockClassifier::new();
    let g = raw_tx(genesis_id(), &[], vec![out(600_000), out(400_000)]);
    apply(&mut l, &mut c, raw_block(GENESIS, vec![g]));
    (l, c)
}

/// Satu tx di block berikutnya; return hasil klasifikasinya.
fn classify_one(l: &mut LedgerState, c: &mut BlockClassifier, tx: RawTx) -> Option<ClassifiedTx> {
    let height = l.next_expected_height();
    let mut reports = apply(l, c, raw_block(height, vec![tx]));
    reports.remove(0).txs.pop()
}

/// Block kosong sampai `height` (eksklusif).
fn fill_until(l: &mut LedgerState, c: &mut BlockClassifier, height: u64) {
    while l.next_expected_height() < height {
        let h = l.next_expected_height();
        apply(l, c, raw_block(h, vec![]));
    }
}

fn types(c: &ClassifiedTx) -> Vec<TxOutputType> {
    c.tx.outputs.iter().map(|o| o.output_type).collect()
}

// ════════════════════════════════════════════════════════════════════════════
// GENESIS & TRANSFERS
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn genesis_outputs_enter_unspent_index() {
    let (l, _) = with_genesis();
    let g = l.tx(&genesis_id()).unwrap();
    assert_eq!(g.tx_type, TxType::Genesis);
    assert!(g.outputs.iter().all(|o| o.output_type == TxOutputType::GenesisOutput));
    assert_eq!(l.total_unspent_value(), 1_000_000);
}

#[test]
#[should_panic(expected = "more than total supply")]
fn genesis_above_supply_is_fatal() {
    let mut l = ledger();
    let g = raw_tx(genesis_id(), &[], vec![out(1_000_001)]);
    let _ = BlockClassifier::new().submit(&mut l, raw_block(GENESIS, vec![g]), &mut NoopHook);
}

#[test]
fn transfer_moves_value_and_spends_input() {
    let (mut l, mut c) = with_genesis();
    let id = Hash::repeat(1);
    let ct = classify_one(&mut l, &mut c, raw_tx(id, &[genesis_key(0)], vec![out(500_000), out(100_000)])).unwrap();

    assert_eq!(ct.tx.tx_type, TxType::Transfer);
    assert!(ct.issue.is_none());
    assert_eq!(types(&ct), vec![TxOutputType::TokenOutput; 2]);
    assert!(!l.is_unspent(&genesis_key(0)));
    assert_eq!(l.spent_info(&genesis_key(0)).unwrap().tx_id, id);
    assert_eq!(l.total_unspent_value(), 1_000_000);
}

#[test]
fn remaining_value_is_trade_fee() {
    let (mut l, mut c) = with_genesis();
    let ct = classify_one(&mut l, &mut c, raw_tx(Hash::repeat(1), &[genesis_key(0)], vec![out(599_000)])).unwrap();
    assert_eq!(ct.tx.tx_type, TxType::PayTradeFee);
    assert_eq!(ct.tx.burnt_fee(), 1_000);
    assert_eq!(l.total_unspent_value(), 999_000);
}

#[test]
fn output_beyond_available_is_plain_and_sticky() {
    let (mut l, mut c) = with_genesis();
    // 600_000 masuk: 700_000 tidak cukup → plain, sesudahnya juga plain
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(Hash::repeat(1), &[genesis_key(0)], vec![out(100_000), out(700_000), out(1_000)]),
    )
    .unwrap();
    assert_eq!(
        types(&ct),
        vec![TxOutputType::TokenOutput, TxOutputType::PlainOutput, TxOutputType::PlainOutput]
    );
    assert_eq!(ct.tx.tx_type, TxType::PayTradeFee);
    assert_eq!(ct.tx.burnt_value, 500_000);
}

#[test]
fn tx_without_token_inputs_is_not_recorded() {
    let (mut l, mut c) = with_genesis();
    let foreign = TxOutputKey::new(Hash::repeat(0xee), 0);
    let id = Hash::repeat(2);
    assert!(classify_one(&mut l, &mut c, raw_tx(id, &[foreign], vec![out(10)])).is_none());
    assert!(l.tx(&id).is_none());
}

// ════════════════════════════════════════════════════════════════════════════
// APPLICATION DATA
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn proposal_with_exact_fee_in_proposal_phase() {
    let (mut l, mut c) = with_genesis();
    let data = opreturn::build(OpReturnType::Proposal, &[1u8; 20]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(Hash::repeat(3), &[genesis_key(0)], vec![out(599_800), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Proposal);
    assert_eq!(types(&ct), vec![TxOutputType::TokenOutput, TxOutputType::ProposalOpReturn]);
    assert_eq!(ct.tx.burnt_fee(), 200);
}

#[test]
fn proposal_keeps_token_change_after_first_output() {
    let (mut l, mut c) = with_genesis();
    let id = Hash::repeat(3);
    let data = opreturn::build(OpReturnType::Proposal, &[1u8; 20]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(id, &[genesis_key(0)], vec![out(300_000), out(299_800), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Proposal);
    assert!(ct.issue.is_none());
    assert_eq!(
        types(&ct),
        vec![TxOutputType::TokenOutput, TxOutputType::TokenOutput, TxOutputType::ProposalOpReturn]
    );
    assert_eq!(ct.tx.burnt_fee(), 200);
    assert!(l.is_unspent(&TxOutputKey::new(id, 1)));
    assert_eq!(l.total_unspent_value(), 999_800);
}

#[test]
fn proof_of_burn_outputs_after_first_are_plain() {
    let (mut l, mut c) = with_genesis();
    let id = Hash::repeat(8);
    let data = opreturn::build(OpReturnType::ProofOfBurn, &[2u8; 20]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(id, &[genesis_key(0)], vec![out(100_000), out(499_000), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::ProofOfBurn);
    assert_eq!(
        types(&ct),
        vec![TxOutputType::TokenOutput, TxOutputType::PlainOutput, TxOutputType::ProofOfBurnOpReturn]
    );
    assert_eq!(ct.tx.burnt_fee(), 500_000);
    assert!(!l.is_unspent(&TxOutputKey::new(id, 1)));
    assert_eq!(l.total_unspent_value(), 500_000);
}

#[test]
fn proposal_with_wrong_fee_is_irregular_and_keeps_value() {
    let (mut l, mut c) = with_genesis();
    let data = opreturn::build(OpReturnType::Proposal, &[1u8; 20]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(Hash::repeat(3), &[genesis_key(0)], vec![out(599_900), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Irregular);
    assert!(matches!(ct.issue, Some(DaoError::Irregular { .. })));
    assert!(l.is_unspent(&TxOutputKey::new(Hash::repeat(3), 0)));
}

#[test]
fn compensation_request_creates_issuance_candidate() {
    let (mut l, mut c) = with_genesis();
    let id = Hash::repeat(4);
    let data = opreturn::build(OpReturnType::CompensationRequest, &[9u8; 20]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(id, &[genesis_key(0)], vec![out(599_800), out(50_000), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::CompensationRequest);
    assert_eq!(
        types(&ct),
        vec![
            TxOutputType::TokenOutput,
            TxOutputType::IssuanceCandidate,
            TxOutputType::CompensationRequestOpReturn
        ]
    );
    // candidate belum menjadi token sebelum issuance diterima
    assert!(!l.is_unspent(&TxOutputKey::new(id, 1)));
    assert_eq!(l.issuance_candidate_output(&id).unwrap().value, 50_000);
}

#[test]
fn funding_request_with_wrong_fee_demotes_candidate() {
    let (mut l, mut c) = with_genesis();
    let data = opreturn::build(OpReturnType::ReimbursementRequest, &[9u8; 20]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(Hash::repeat(4), &[genesis_key(0)], vec![out(599_700), out(50_000), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Irregular);
    assert_eq!(ct.tx.outputs[1].output_type, TxOutputType::PlainOutput);
}

#[test]
fn blind_vote_outside_phase_releases_stake() {
    let (mut l, mut c) = with_genesis();
    let data = opreturn::build(OpReturnType::BlindVote, &[5u8; 20]);
    // height 101 masih proposal phase
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(Hash::repeat(5), &[genesis_key(0)], vec![out(599_800), op_out(data)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Irregular);
    assert_eq!(ct.tx.outputs[0].output_type, TxOutputType::TokenOutput);
}

#[test]
fn reveal_spending_two_stake_outputs_releases_stake() {
    let (mut l, mut c) = with_genesis();
    fill_until(&mut l, &mut c, GENESIS + 3);
    let blind_vote = |id: TxId, input: TxOutputKey, change: u64| {
        let data = opreturn::build(OpReturnType::BlindVote, &[5u8; 20]);
        raw_tx(id, &[input], vec![out(100_000), out(change), op_out(data)])
    };
    let (bv_a, bv_b) = (Hash::repeat(0x51), Hash::repeat(0x52));
    let reports = apply(
        &mut l,
        &mut c,
        raw_block(
            GENESIS + 3,
            vec![blind_vote(bv_a, genesis_key(0), 499_800), blind_vote(bv_b, genesis_key(1), 299_800)],
        ),
    );
    for ct in &reports[0].txs {
        assert_eq!(ct.tx.tx_type, TxType::BlindVote);
        assert_eq!(ct.tx.outputs[0].output_type, TxOutputType::BlindVoteLockStake);
    }

    fill_until(&mut l, &mut c, GENESIS + 6);
    let reveal_id = Hash::repeat(0x53);
    let data = opreturn::build_vote_reveal(&[1u8; 20], &[2u8; 16]);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(
            reveal_id,
            &[TxOutputKey::new(bv_a, 0), TxOutputKey::new(bv_b, 0)],
            vec![out(200_000), op_out(data)],
        ),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Irregular);
    assert!(matches!(ct.issue, Some(DaoError::Irregular { .. })));
    assert_eq!(types(&ct), vec![TxOutputType::TokenOutput, TxOutputType::VoteRevealOpReturn]);
    assert!(l.is_unspent(&TxOutputKey::new(reveal_id, 0)));
    assert_eq!(l.total_unspent_value(), 999_600);
}

#[test]
fn misplaced_application_data_invalidates_and_burns() {
    let (mut l, mut c) = with_genesis();
    let data = opreturn::build(OpReturnType::Proposal, &[1u8; 20]);
    let id = Hash::repeat(6);
    let ct = classify_one(
        &mut l,
        &mut c,
        raw_tx(id, &[genesis_key(0)], vec![op_out(data), out(599_800)]),
    )
    .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Invalid);
    assert!(matches!(ct.issue, Some(DaoError::StructuralInvalid { .. })));
    assert_eq!(ct.tx.invalidated_value(), 600_000);
    assert!(ct.tx.outputs.iter().all(|o| o.output_type == TxOutputType::PlainOutput));
    assert!(!l.is_unspent(&genesis_key(0)));
    assert!(!l.is_unspent(&TxOutputKey::new(id, 1)));
    assert_eq!(l.total_unspent_value(), 400_000);
}

#[test]
fn non_zero_output_with_data_is_invalid() {
    let (mut l, mut c) = with_genesis();
    let mut last = op_out(opreturn::build(OpReturnType::Proposal, &[1u8; 20]));
    last.value = 1;
    let ct = classify_one(&mut l, &mut c, raw_tx(Hash::repeat(6), &[genesis_key(0)], vec![out(599_000), last]))
        .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Invalid);
}

#[test]
fn unknown_tag_is_invalid() {
    let (mut l, mut c) = with_genesis();
    let mut data = vec![0x99u8, 0x01];
    data.extend_from_slice(&[0u8; 20]);
    let ct = classify_one(&mut l, &mut c, raw_tx(Hash::repeat(7), &[genesis_key(0)], vec![out(599_800), op_out(data)]))
        .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Invalid);
}

// ════════════════════════════════════════════════════════════════════════════
// BONDS
// ════════════════════════════════════════════════════════════════════════════

fn lockup_then_unlock(l: &mut LedgerState, c: &mut BlockClassifier) -> (TxId, TxId) {
    let lockup_id = Hash::repeat(0x61);
    let data = opreturn::build_lockup(LockupReason::BondedRole, 6, &[3u8; 20]);
    let ct = classify_one(l, c, raw_tx(lockup_id, &[genesis_key(0)], vec![out(100_000), out(500_000), op_out(data)]))
        .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Lockup);
    assert_eq!(ct.tx.outputs[0].output_type, TxOutputType::Lockup);
    assert_eq!(ct.tx.outputs[0].lock_time, 6);

    let unlock_id = Hash::repeat(0x62);
    let ct = classify_one(l, c, raw_tx(unlock_id, &[TxOutputKey::new(lockup_id, 0)], vec![out(100_000)])).unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Unlock);
    assert_eq!(ct.tx.outputs[0].output_type, TxOutputType::Unlock);
    assert_eq!(ct.tx.outputs[0].unlock_block_height, ct.tx.block_height + 6);
    (lockup_id, unlock_id)
}

#[test]
fn unlock_output_spent_early_burns_bond() {
    let (mut l, mut c) = with_genesis();
    let (_, unlock_id) = lockup_then_unlock(&mut l, &mut c);

    let ct = classify_one(&mut l, &mut c, raw_tx(Hash::repeat(0x63), &[TxOutputKey::new(unlock_id, 0)], vec![out(100_000)]))
        .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Invalid);
    assert_eq!(ct.tx.burnt_bond_value, 100_000);
    assert_eq!(l.total_unspent_value(), 900_000);
}

#[test]
fn unlock_output_spendable_after_lock_time() {
    let (mut l, mut c) = with_genesis();
    let (_, unlock_id) = lockup_then_unlock(&mut l, &mut c);
    let unlock_height = l.tx(&unlock_id).unwrap().outputs[0].unlock_block_height;
    while l.next_expected_height() < unlock_height {
        let h = l.next_expected_height();
        apply(&mut l, &mut c, raw_block(h, vec![]));
    }

    let ct = classify_one(&mut l, &mut c, raw_tx(Hash::repeat(0x63), &[TxOutputKey::new(unlock_id, 0)], vec![out(100_000)]))
        .unwrap();
    assert_eq!(ct.tx.tx_type, TxType::Transfer);
    assert_eq!(ct.tx.burnt_bond_value, 0);
}

// ════════════════════════════════════════════════════════════════════════════
// ORDERING
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn future_block_is_buffered_until_gap_fills() {
    let (mut l, mut c) = with_genesis();
    let outcome = c.submit(&mut l, raw_block(GENESIS + 2, vec![]), &mut NoopHook).unwrap();
    assert!(matches!(outcome, SubmitOutcome::Buffered { height } if height == GENESIS + 2));
    assert_eq!(c.pending_heights(), vec![GENESIS + 2]);

    let reports = apply(&mut l, &mut c, raw_block(GENESIS + 1, vec![]));
    assert_eq!(reports.iter().map(|r| r.height).collect::<Vec<_>>(), vec![GENESIS + 1, GENESIS + 2]);
    assert!(c.pending_heights().is_empty());
    assert_eq!(l.chain_height(), GENESIS + 2);
}

#[test]
fn duplicate_and_pre_genesis_blocks_are_ignored() {
    let (mut l, mut c) = with_genesis();
    let dup = c.submit(&mut l, raw_block(GENESIS, vec![]), &mut NoopHook).unwrap();
    assert!(matches!(dup, SubmitOutcome::Ignored { .. }));
    let early = c.submit(&mut l, raw_block(GENESIS - 5, vec![]), &mut NoopHook).unwrap();
    assert!(matches!(early, SubmitOutcome::Ignored { .. }));
    assert_eq!(l.chain_height(), GENESIS);
}

#[test]
fn conflicting_blocks_report_discontinuity() {
    let (mut l, mut c) = with_genesis();
    apply(&mut l, &mut c, raw_block(GENESIS + 1, vec![]));

    let mut replaced = raw_block(GENESIS + 1, vec![]);
    replaced.hash = Hash::repeat(0xab);
    let err = c.submit(&mut l, replaced, &mut NoopHook).unwrap_err();
    assert!(matches!(err, DaoError::ChainDiscontinuity { height, .. } if height == GENESIS + 1));

    let mut orphan = raw_block(GENESIS + 2, vec![]);
    orphan.previous_block_hash = Hash::repeat(0xcd);
    let err = c.submit(&mut l, orphan, &mut NoopHook).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(l.chain_height(), GENESIS + 1);
}

#[test]
fn raw_tx_height_is_not_trusted() {
    let (mut l, mut c) = with_genesis();
    let mut t = raw_tx(Hash::repeat(1), &[genesis_key(0)], vec![out(600_000)]);
    t.block_height = 9_999;
    let ct = classify_one(&mut l, &mut c, t).unwrap();
    assert_eq!(ct.tx.block_height, GENESIS + 1);
    assert_eq!(ct.tx.block_hash, hash_at(GENESIS + 1));
}
