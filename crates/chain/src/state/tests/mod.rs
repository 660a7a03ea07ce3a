//! State unit tests.
//!
//! | File | Cakupan |
//! |------|---------|
//! | `window_tests` | urutan mutation window, panic saat urutan salah |
//! | `cycle_tests` | cycle bookkeeping, param lookup, phase queries |
//! | `bond_tests` | bond lifecycle dan konfiskasi |
//! | `listener_tests` | notifikasi listener dan replay gating |
//! | `snapshot_tests` | snapshot/restore dan hash-chain bytes |


use cdao_common::Network;

use crate::block::{Block, Tx, TxInput, TxOutput, TxOutputType, TxType};
use crate::state::{GenesisParams, LedgerState};
use crate::types::{Hash, TxId, TxOutputKey};

// ════════════════════════════════════════════════════════════════════════════
// FIXTURES
// ════════════════════════════════════════════════════════════════════════════

pub(super) const GENESIS_HEIGHT: u64 = 100;

pub(super) fn genesis_tx_id() -> TxId {
    Hash::repeat(0x6e)
}

pub(super) fn regtest_ledger() -> LedgerState {
    LedgerState::new(
        Network::Regtest,
        GenesisParams { height: GENESIS_HEIGHT, tx_id: genesis_tx_id(), total_supply: 1_000_000 },
        1,
    )
}

/// Hash deterministik per height.
pub(super) fn block_hash(height: u64) -> Hash {
    let mut b = [0xbbu8; 32];
    b[..8].copy_from_slice(&height.to_be_bytes());
    Hash(b)
}

pub(super) fn header(ledger: &LedgerState, height: u64) -> Block {
    Block {
        height,
        time: 1_600_000_000 + height,
        hash: block_hash(height),
        previous_block_hash: ledger.last_block().map(|b| b.hash).unwrap_or(Hash::ZERO),
        txs: Vec::new(),
    }
}

/// advance → append block kosong → complete.
pub(super) fn push_empty_block(ledger: &mut LedgerState) -> u64 {
    let height = ledger.next_expected_height();
    let block = header(ledger, height);
    ledger.advance_height(height).append_block(block).complete();
    height
}

pub(super) fn push_blocks_until(ledger: &mut LedgerState, height: u64) {
    while ledger.next_expected_height() <= height {
        push_empty_block(ledger);
    }
}

pub(super) fn output(tx_id: TxId, index: u32, value: u64, height: u64, ty: TxOutputType) -> TxOutput {
    TxOutput {
        index,
        value,
        tx_id,
        address: None,
        op_return_data: None,
        block_height: height,
        output_type: ty,
        lock_time: 0,
        unlock_block_height: 0,
    }
}

pub(super) fn tx(id: TxId, height: u64, inputs: Vec<TxOutputKey>, outputs: Vec<TxOutput>, tx_type: TxType) -> Tx {
    Tx {
        id,
        block_height: height,
        block_hash: block_hash(height),
        time: 1_600_000_000 + height,
        inputs: inputs.into_iter().map(|k| TxInput { connected: k, pub_key: None }).collect(),
        outputs,
        tx_type,
        burnt_value: 0,
        burnt_bond_value: 0,
    }
}

/// Block dengan tx yang sudah diklasifikasi; input di-spend sebelum append.
pub(super) fn push_block_with_txs(ledger: &mut LedgerState, txs: Vec<Tx>) -> u64 {
    let height = ledger.next_expected_height();
    let block = header(ledger, height);
    let mut window = ledger.advance_height(height).append_block(block);
    for tx in txs {
        for (i, input) in tx.inputs.iter().enumerate() {
            window.spend_output(
                &input.connected,
                crate::block::SpentInfo { block_height: height, tx_id: tx.id, input_index: i as u32 },
            );
        }
        window.append_tx(tx);
    }
    window.complete();
    height
}

/// Ledger dengan genesis tx: satu GenesisOutput senilai `value`.
pub(super) fn ledger_with_genesis(value: u64) -> LedgerState {
    let mut ledger = regtest_ledger();
    let g = tx(
        genesis_tx_id(),
        GENESIS_HEIGHT,
        vec![],
        vec![output(genesis_tx_id(), 0, value, GENESIS_HEIGHT, TxOutputType::GenesisOutput)],
        TxType::Genesis,
    );
    push_block_with_txs(&mut ledger, vec![g]);
    ledger
}
