//! Ledger entries: Block, Tx, TxOutput dan scratch record `TempTx`.
//!
//! `TempTx`/`TempTxOutput` hanya hidup selama klasifikasi satu transaksi.
//! Setelah klasifikasi selesai dikonversi sekali ke `Tx`/`TxOutput` yang
//! immutable dan masuk ke `LedgerState`.

use serde::{Deserialize, Serialize};

use crate::raw::{RawBlock, RawTx, RawTxInput, RawTxOutput};
use crate::types::{BlockHash, TxId, TxOutputKey};

// ════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxType {
    Genesis,
    Transfer,
    PayTradeFee,
    Proposal,
    CompensationRequest,
    ReimbursementRequest,
    BlindVote,
    VoteReveal,
    Lockup,
    Unlock,
    AssetListingFee,
    ProofOfBurn,
    /// Anomali yang ditoleransi: value dipertahankan, ditandai untuk audit.
    Irregular,
    /// Seluruh validated input value dibakar.
    Invalid,
}

impl TxType {
    pub fn is_invalid(&self) -> bool {
        matches!(self, TxType::Invalid)
    }

    pub fn is_irregular(&self) -> bool {
        matches!(self, TxType::Irregular)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxOutputType {
    /// Belum diklasifikasi. Tidak boleh tersisa di tx yang valid.
    Undefined,
    GenesisOutput,
    /// Colored-coin value.
    TokenOutput,
    /// Ordinary value, tidak dilacak ledger.
    PlainOutput,
    ProposalOpReturn,
    CompensationRequestOpReturn,
    ReimbursementRequestOpReturn,
    IssuanceCandidate,
    BlindVoteLockStake,
    BlindVoteOpReturn,
    VoteRevealUnlockStake,
    VoteRevealOpReturn,
    AssetListingFeeOpReturn,
    ProofOfBurnOpReturn,
    Lockup,
    LockupOpReturn,
    Unlock,
    Invalid,
}

impl TxOutputType {
    /// Output dengan tipe ini masuk ke unspent index saat tx di-append.
    pub fn is_unspent_candidate(&self) -> bool {
        matches!(
            self,
            TxOutputType::GenesisOutput
                | TxOutputType::TokenOutput
                | TxOutputType::BlindVoteLockStake
                | TxOutputType::VoteRevealUnlockStake
                | TxOutputType::Lockup
                | TxOutputType::Unlock
        )
    }

    pub fn is_op_return(&self) -> bool {
        matches!(
            self,
            TxOutputType::ProposalOpReturn
                | TxOutputType::CompensationRequestOpReturn
                | TxOutputType::ReimbursementRequestOpReturn
                | TxOutputType::BlindVoteOpReturn
                | TxOutputType::VoteRevealOpReturn
                | TxOutputType::AssetListingFeeOpReturn
                | TxOutputType::ProofOfBurnOpReturn
                | TxOutputType::LockupOpReturn
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub connected: TxOutputKey,
    pub pub_key: Option<Vec<u8>>,
}

impl From<&RawTxInput> for TxInput {
    fn from(raw: &RawTxInput) -> Self {
        Self { connected: raw.connected, pub_key: raw.pub_key.clone() }
    }
}

/// Pointer dari output yang sudah di-spend ke input yang men-spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentInfo {
    pub block_height: u64,
    pub tx_id: TxId,
    pub input_index: u32,
}

// ════════════════════════════════════════════════════════════════════════════
// OUTPUTS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempTxOutput {
    pub index: u32,
    pub value: u64,
    pub tx_id: TxId,
    pub address: Option<String>,
    pub op_return_data: Option<Vec<u8>>,
    pub block_height: u64,
    pub output_type: TxOutputType,
    /// Diisi untuk Lockup output (dibaca dari OP_RETURN lockup).
    pub lock_time: u16,
    /// Diisi untuk Unlock output.
    pub unlock_block_height: u64,
}

impl TempTxOutput {
    pub fn from_raw(raw: &RawTxOutput, tx_id: TxId, block_height: u64) -> Self {
        Self {
            index: raw.index,
            value: raw.value,
            tx_id,
            address: raw.address.clone(),
            op_return_data: raw.op_return_data.clone(),
            block_height,
            output_type: TxOutputType::Undefined,
            lock_time: 0,
            unlock_block_height: 0,
        }
    }

    pub fn key(&self) -> TxOutputKey {
        TxOutputKey::new(self.tx_id, self.index)
    }

    pub fn has_op_return_data(&self) -> bool {
        self.op_return_data.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub index: u32,
    pub value: u64,
    pub tx_id: TxId,
    pub address: Option<String>,
    pub op_return_data: Option<Vec<u8>>,
    pub block_height: u64,
    pub output_type: TxOutputType,
    pub lock_time: u16,
    pub unlock_block_height: u64,
}

impl TxOutput {
    pub fn key(&self) -> TxOutputKey {
        TxOutputKey::new(self.tx_id, self.index)
    }
}

impl From<TempTxOutput> for TxOutput {
    fn from(t: TempTxOutput) -> Self {
        Self {
            index: t.index,
            value: t.value,
            tx_id: t.tx_id,
            address: t.address,
            op_return_data: t.op_return_data,
            block_height: t.block_height,
            output_type: t.output_type,
            lock_time: t.lock_time,
            unlock_block_height: t.unlock_block_height,
        }
    }
}

impl From<&TxOutput> for TempTxOutput {
    fn from(o: &TxOutput) -> Self {
        Self {
            index: o.index,
            value: o.value,
            tx_id: o.tx_id,
            address: o.address.clone(),
            op_return_data: o.op_return_data.clone(),
            block_height: o.block_height,
            output_type: o.output_type,
            lock_time: o.lock_time,
            unlock_block_height: o.unlock_block_height,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempTx {
    pub id: TxId,
    pub block_height: u64,
    pub block_hash: BlockHash,
    pub time: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TempTxOutput>,
    /// None selama klasifikasi belum memutuskan.
    pub tx_type: Option<TxType>,
    pub burnt_value: u64,
    pub burnt_bond_value: u64,
}

impl TempTx {
    pub fn from_raw(raw: &RawTx) -> Self {
        Self {
            id: raw.id,
            block_height: raw.block_height,
            block_hash: raw.block_hash,
            time: raw.time,
            inputs: raw.inputs.iter().map(TxInput::from).collect(),
            outputs: raw
                .outputs
                .iter()
                .map(|o| TempTxOutput::from_raw(o, raw.id, raw.block_height))
                .collect(),
            tx_type: None,
            burnt_value: 0,
            burnt_bond_value: 0,
        }
    }

    /// Rebuild scratch fields from a ledger entry.
    pub fn from_tx(tx: &Tx) -> Self {
        Self {
            id: tx.id,
            block_height: tx.block_height,
            block_hash: tx.block_hash,
            time: tx.time,
            inputs: tx.inputs.clone(),
            outputs: tx.outputs.iter().map(TempTxOutput::from).collect(),
            tx_type: Some(tx.tx_type),
            burnt_value: tx.burnt_value,
            burnt_bond_value: tx.burnt_bond_value,
        }
    }

    pub fn last_output(&self) -> Option<&TempTxOutput> {
        self.outputs.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub id: TxId,
    pub block_height: u64,
    pub block_hash: BlockHash,
    pub time: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub tx_type: TxType,
    pub burnt_value: u64,
    pub burnt_bond_value: u64,
}

impl Tx {
    /// Konversi final. `tx_type` harus sudah diputuskan; kalau belum,
    /// tx diperlakukan invalid.
    pub fn from_temp(temp: TempTx) -> Self {
        Self {
            id: temp.id,
            block_height: temp.block_height,
            block_hash: temp.block_hash,
            time: temp.time,
            inputs: temp.inputs,
            outputs: temp.outputs.into_iter().map(TxOutput::from).collect(),
            tx_type: temp.tx_type.unwrap_or(TxType::Invalid),
            burnt_value: temp.burnt_value,
            burnt_bond_value: temp.burnt_bond_value,
        }
    }

    pub fn last_output(&self) -> Option<&TxOutput> {
        self.outputs.last()
    }

    /// Application data dari output terakhir.
    pub fn op_return_data(&self) -> Option<&[u8]> {
        self.last_output().and_then(|o| o.op_return_data.as_deref())
    }

    /// Fee yang dibakar oleh tx valid/irregular.
    pub fn burnt_fee(&self) -> u64 {
        if self.tx_type.is_invalid() { 0 } else { self.burnt_value }
    }

    /// Value yang hangus karena tx invalid.
    pub fn invalidated_value(&self) -> u64 {
        if self.tx_type.is_invalid() { self.burnt_value } else { 0 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BLOCK
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: u64,
    pub hash: BlockHash,
    pub previous_block_hash: BlockHash,
    /// Hanya diisi selama klasifikasi block ini.
    pub txs: Vec<Tx>,
}

impl Block {
    /// Header saja, tanpa tx.
    pub fn empty_from_raw(raw: &RawBlock) -> Self {
        Self {
            height: raw.height,
            time: raw.time,
            hash: raw.hash,
            previous_block_hash: raw.previous_block_hash,
            txs: Vec::new(),
        }
    }
}
