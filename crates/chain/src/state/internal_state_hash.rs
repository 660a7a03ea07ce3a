//! # Hash-chain Serialization
//!
//! Byte yang dihasilkan di sini adalah input untuk rolling state-hash chain
//! antar peer. Format bincode atas koleksi berurutan, jadi dua ledger
//! dengan isi sama menghasilkan byte yang sama persis.
//!
//! ```text
//! bytes = bincode(LedgerData tanpa blocks) || bincode(last block)
//! hash  = SHA3-256(prev_hash || bytes)
//! ```
//!
//! Block list dibuang karena sudah tercakup oleh hash sebelumnya di chain.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha3::{Digest, Sha3_256};

use super::{Issuance, LedgerData, LedgerState};
use crate::block::{Block, SpentInfo, TxOutput};
use crate::governance::{BondedRole, DecryptedBallotsWithMerits, EvaluatedProposal};
use crate::param::ParamChange;
use crate::period::Cycle;
use crate::types::{Hash, TxId, TxOutputKey};
use crate::DaoError;

/// View borrowed dari LedgerData tanpa block list.
#[derive(Serialize)]
struct HashChainView<'a> {
    chain_height: u64,
    cycles: &'a [Cycle],
    unspent_outputs: &'a BTreeMap<TxOutputKey, TxOutput>,
    spent_infos: &'a BTreeMap<TxOutputKey, SpentInfo>,
    tx_heights: &'a BTreeMap<TxId, u64>,
    confiscated_lockup_tx_ids: &'a BTreeSet<TxId>,
    param_changes: &'a [ParamChange],
    issuances: &'a BTreeMap<TxId, Issuance>,
    evaluated_proposals: &'a BTreeMap<u64, Vec<EvaluatedProposal>>,
    decrypted_ballots: &'a BTreeMap<u64, Vec<DecryptedBallotsWithMerits>>,
    bonded_roles: &'a BTreeMap<String, BondedRole>,
    removed_assets: &'a BTreeSet<String>,
}

impl<'a> From<&'a LedgerData> for HashChainView<'a> {
    fn from(d: &'a LedgerData) -> Self {
        Self {
            chain_height: d.chain_height,
            cycles: &d.cycles,
            unspent_outputs: &d.unspent_outputs,
            spent_infos: &d.spent_infos,
            tx_heights: &d.tx_heights,
            confiscated_lockup_tx_ids: &d.confiscated_lockup_tx_ids,
            param_changes: &d.param_changes,
            issuances: &d.issuances,
            evaluated_proposals: &d.evaluated_proposals,
            decrypted_ballots: &d.decrypted_ballots,
            bonded_roles: &d.bonded_roles,
            removed_assets: &d.removed_assets,
        }
    }
}

impl LedgerState {
    pub fn serialize_for_hash_chain(&self) -> Result<Vec<u8>, DaoError> {
        let mut out = bincode::serialize(&HashChainView::from(&self.data))?;
        let last: Option<&Block> = self.data.blocks.last();
        out.extend(bincode::serialize(&last)?);
        Ok(out)
    }

    /// Hash berikutnya di rolling chain: `SHA3-256(prev || serialize_for_hash_chain())`.
    pub fn state_hash(&self, prev: &Hash) -> Result<Hash, DaoError> {
        let bytes = self.serialize_for_hash_chain()?;
        let mut hasher = Sha3_256::new();
        hasher.update(prev.as_bytes());
        hasher.update(&bytes);
        let digest = hasher.finalize();
        let mut h = [0u8; 32];
        h.copy_from_slice(&digest);
        Ok(Hash(h))
    }
}
