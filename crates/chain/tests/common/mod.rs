//! Shared fixtures untuk integration test: chain regtest lewat `DaoEngine`.
//!
//! ```text
//! 111-112 proposal │ 113 break │ 114-115 blind vote │ 116 break
//! 117-118 reveal   │ 119 break │ 120-121 result     │ 122 cycle 2
//! ```
//!
//! Genesis: 5 output × 10_000_000. Output 0..=3 untuk voter, output 4
//! membiayai proposal.

#![allow(dead_code)]

use cdao_chain::engine::{DaoEngine, EngineOutcome};
use cdao_chain::governance::{
    blind_vote_list_digest, BlindVote, Merit, Proposal, ProposalKind, Vote, VoteWithProposalTxId,
};
use cdao_chain::opreturn::{self, OpReturnType};
use cdao_chain::parser::{BlockReport, SubmitOutcome};
use cdao_chain::raw::{RawBlock, RawTx, RawTxInput, RawTxOutput};
use cdao_chain::types::{BlockHash, Hash, TxId, TxOutputKey};
use cdao_common::DaoConfig;

pub const GENESIS: u64 = 111;
pub const PROPOSAL_BLOCK: u64 = 112;
pub const BLIND_VOTE_BLOCK: u64 = 114;
pub const REVEAL_BLOCK: u64 = 117;
pub const RESULT_BLOCK: u64 = 120;
pub const GENESIS_OUTPUT: u64 = 10_000_000;
pub const FEE: u64 = 200;
pub const COMP_AMOUNT: u64 = 100_000;

pub fn genesis_id() -> TxId {
    Hash::repeat(0x47)
}

pub fn genesis_key(index: u32) -> TxOutputKey {
    TxOutputKey::new(genesis_id(), index)
}

pub fn config() -> DaoConfig {
    let mut cfg = DaoConfig::regtest();
    cfg.genesis.height = GENESIS;
    cfg.genesis.tx_id = genesis_id().to_hex();
    cfg
}

// ════════════════════════════════════════════════════════════════════════════
// RAW BUILDERS
// ════════════════════════════════════════════════════════════════════════════

pub fn block_hash(height: u64, fork: u8) -> BlockHash {
    let mut b = [fork; 32];
    b[..8].copy_from_slice(&height.to_be_bytes());
    Hash(b)
}

pub fn out(value: u64) -> RawTxOutput {
    RawTxOutput { index: 0, value, address: Some("addr".into()), op_return_data: None }
}

pub fn op_out(data: Vec<u8>) -> RawTxOutput {
    RawTxOutput { index: 0, value: 0, address: None, op_return_data: Some(data) }
}

pub fn raw_tx(id: TxId, inputs: &[TxOutputKey], outputs: Vec<RawTxOutput>) -> RawTx {
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

pub fn genesis_tx() -> RawTx {
    raw_tx(genesis_id(), &[], (0..5).map(|_| out(GENESIS_OUTPUT)).collect())
}

// ════════════════════════════════════════════════════════════════════════════
// CHAIN DRIVER
// ════════════════════════════════════════════════════════════════════════════

pub struct Chain {
    pub engine: DaoEngine,
    /// Byte pengisi hash block; ganti untuk membangun fork.
    pub fork: u8,
}

/// `RUST_LOG=cdao_chain=debug cargo test` untuk melihat log klasifikasi.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Chain {
    pub fn new(engine: DaoEngine) -> Self {
        init_tracing();
        Self { engine, fork: 0x3c }
    }

    pub fn tip_hash(&self) -> BlockHash {
        self.engine.ledger().last_block().map(|b| b.hash).unwrap_or(Hash::ZERO)
    }

    pub fn next_block(&self, txs: Vec<RawTx>) -> RawBlock {
        let height = self.engine.ledger().next_expected_height();
        RawBlock {
            height,
            time: 1_700_000_000 + height,
            hash: block_hash(height, self.fork),
            previous_block_hash: self.tip_hash(),
            txs,
        }
    }

    pub fn push(&mut self, txs: Vec<RawTx>) -> BlockReport {
        let block = self.next_block(txs);
        let height = block.height;
        match self.engine.submit_block(block) {
            Ok(EngineOutcome::Classified(SubmitOutcome::Applied(mut reports))) => reports.remove(0),
            other => panic!("block {} not applied: {:?}", height, other),
        }
    }

    /// Block kosong sampai `height` (eksklusif).
    pub fn fill_until(&mut self, height: u64) {
        while self.engine.ledger().next_expected_height() < height {
            self.push(Vec::new());
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GOVERNANCE SCENARIO
// ════════════════════════════════════════════════════════════════════════════

pub fn comp_tx_id() -> TxId {
    Hash::repeat(0xc1)
}

pub fn generic_tx_id() -> TxId {
    Hash::repeat(0xc2)
}

pub fn comp_proposal() -> Proposal {
    Proposal {
        tx_id: comp_tx_id(),
        name: "audit".into(),
        link: "https://example.org/audit".into(),
        kind: ProposalKind::Compensation { requested_amount: COMP_AMOUNT, address: "contributor".into() },
    }
}

pub fn generic_proposal() -> Proposal {
    Proposal {
        tx_id: generic_tx_id(),
        name: "roadmap".into(),
        link: "https://example.org/roadmap".into(),
        kind: ProposalKind::Generic,
    }
}

/// Proposal tx berantai mulai dari `input`: setiap tx membayar FEE dan
/// meneruskan sisa token di output 0. Funding request membawa candidate di
/// output 1.
pub fn proposal_txs(input: TxOutputKey, input_value: u64, proposals: &[Proposal]) -> Vec<RawTx> {
    let mut input = input;
    let mut value = input_value;
    let mut txs = Vec::new();
    for p in proposals {
        let op_type = match p.kind {
            ProposalKind::Compensation { .. } => OpReturnType::CompensationRequest,
            ProposalKind::Reimbursement { .. } => OpReturnType::ReimbursementRequest,
            _ => OpReturnType::Proposal,
        };
        value -= FEE;
        let mut outputs = vec![out(value)];
        if let Some(amount) = p.requested_amount() {
            // candidate dibayar di luar token input, tidak mengurangi available
            outputs.push(out(amount));
        }
        outputs.push(op_out(opreturn::build(op_type, &p.payload_hash().unwrap())));
        txs.push(raw_tx(p.tx_id, &[input], outputs));
        input = TxOutputKey::new(p.tx_id, 0);
    }
    txs
}

/// Block proposal dari genesis output 4; payload ikut masuk ballot store.
pub fn push_proposals(chain: &mut Chain, proposals: &[Proposal]) {
    let report = chain.push(proposal_txs(genesis_key(4), GENESIS_OUTPUT, proposals));
    assert_eq!(report.irregular_count() + report.invalid_count(), 0, "{:?}", report);
    for p in proposals {
        chain.engine.add_proposal(p.clone());
    }
}

/// Genesis block + block proposal (compensation request dan generic).
pub fn chain_with_proposals(engine: DaoEngine) -> Chain {
    let mut chain = Chain::new(engine);
    chain.push(vec![genesis_tx()]);
    push_proposals(&mut chain, &[comp_proposal(), generic_proposal()]);
    assert_eq!(chain.engine.ledger().chain_height(), PROPOSAL_BLOCK);
    chain
}

pub fn accept(proposal_tx_id: TxId) -> VoteWithProposalTxId {
    VoteWithProposalTxId { proposal_tx_id, vote: Some(Vote { accepted: true }) }
}

pub fn reject(proposal_tx_id: TxId) -> VoteWithProposalTxId {
    VoteWithProposalTxId { proposal_tx_id, vote: Some(Vote { accepted: false }) }
}

pub fn ignore(proposal_tx_id: TxId) -> VoteWithProposalTxId {
    VoteWithProposalTxId { proposal_tx_id, vote: None }
}

pub struct Voter {
    pub tag: u8,
    pub genesis_index: u32,
    pub stake: u64,
    pub votes: Vec<VoteWithProposalTxId>,
}

impl Voter {
    pub fn new(tag: u8, stake: u64, votes: Vec<VoteWithProposalTxId>) -> Self {
        Self { tag, genesis_index: tag as u32, stake, votes }
    }

    pub fn key(&self) -> [u8; 16] {
        [0xa0 + self.tag; 16]
    }

    pub fn blind_vote_tx_id(&self) -> TxId {
        Hash::repeat(0xb0 + self.tag)
    }

    pub fn reveal_tx_id(&self) -> TxId {
        Hash::repeat(0xd0 + self.tag)
    }

    pub fn blind_vote(&self) -> BlindVote {
        self.blind_vote_with_merits(&[])
    }

    pub fn blind_vote_with_merits(&self, merits: &[Merit]) -> BlindVote {
        BlindVote::seal(self.blind_vote_tx_id(), &self.votes, merits, &self.key()).unwrap()
    }

    pub fn blind_vote_tx(&self, payload: &BlindVote) -> RawTx {
        raw_tx(
            self.blind_vote_tx_id(),
            &[genesis_key(self.genesis_index)],
            vec![
                out(self.stake),
                out(GENESIS_OUTPUT - self.stake - FEE),
                op_out(opreturn::build(OpReturnType::BlindVote, &payload.commitment())),
            ],
        )
    }

    pub fn reveal_tx(&self, digest: &[u8; 20]) -> RawTx {
        self.reveal_tx_with_key(digest, &self.key())
    }

    pub fn reveal_tx_with_key(&self, digest: &[u8; 20], key: &[u8; 16]) -> RawTx {
        raw_tx(
            self.reveal_tx_id(),
            &[TxOutputKey::new(self.blind_vote_tx_id(), 0)],
            vec![out(self.stake), op_out(opreturn::build_vote_reveal(digest, key))],
        )
    }
}

/// Block blind vote untuk semua voter. Payload dikembalikan, belum masuk
/// ballot store.
pub fn cast_blind_votes(chain: &mut Chain, voters: &[Voter]) -> Vec<BlindVote> {
    chain.fill_until(BLIND_VOTE_BLOCK);
    let payloads: Vec<BlindVote> = voters.iter().map(|v| v.blind_vote()).collect();
    let txs = voters.iter().zip(&payloads).map(|(v, p)| v.blind_vote_tx(p)).collect();
    let report = chain.push(txs);
    assert_eq!(report.irregular_count() + report.invalid_count(), 0, "{:?}", report);
    payloads
}

/// Block reveal; setiap voter membawa `digest` sebagai view blind vote list.
pub fn reveal_votes(chain: &mut Chain, voters: &[Voter], digest: &[u8; 20]) {
    chain.fill_until(REVEAL_BLOCK);
    let txs = voters.iter().map(|v| v.reveal_tx(digest)).collect();
    let report = chain.push(txs);
    assert_eq!(report.irregular_count() + report.invalid_count(), 0, "{:?}", report);
}

/// Satu cycle penuh sampai block pertama RESULT (tally sudah jalan).
pub fn run_cycle(chain: &mut Chain, voters: &[Voter]) -> Vec<BlindVote> {
    let payloads = cast_blind_votes(chain, voters);
    for p in &payloads {
        chain.engine.add_blind_vote(p.clone());
    }
    let digest = blind_vote_list_digest(&payloads).unwrap();
    reveal_votes(chain, voters, &digest);
    chain.fill_until(RESULT_BLOCK + 1);
    payloads
}
