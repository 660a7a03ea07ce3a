//! Untrusted input records supplied by the block source.
//!
//! Nothing here is validated; `parser` turns these into ledger entries.

use serde::{Deserialize, Serialize};

use crate::types::{BlockHash, TxId, TxOutputKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub height: u64,
    pub time: u64,
    pub hash: BlockHash,
    pub previous_block_hash: BlockHash,
    pub txs: Vec<RawTx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTx {
    pub id: TxId,
    pub block_height: u64,
    pub block_hash: BlockHash,
    pub time: u64,
    pub inputs: Vec<RawTxInput>,
    pub outputs: Vec<RawTxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxInput {
    /// Output yang di-spend oleh input ini.
    pub connected: TxOutputKey,
    /// Public key dari witness/scriptSig, kalau ada.
    pub pub_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxOutput {
    pub index: u32,
    pub value: u64,
    pub address: Option<String>,
    /// Application data (OP_RETURN payload).
    pub op_return_data: Option<Vec<u8>>,
}

impl RawTxOutput {
    pub fn has_op_return_data(&self) -> bool {
        self.op_return_data.is_some()
    }
}
