//! # Merit Scoring
//!
//! Merit = bonus voting weight dari issuance historis, turun linear dari
//! nilai penuh di issuance height sampai nol setelah `MAX_MERIT_AGE` block.
//!
//! ```text
//! weight = amount * (MAX_MERIT_AGE - age) / MAX_MERIT_AGE      (integer, u128)
//! age    = block_height - issuance_height
//! ```
//!
//! Integer-only: semua peer harus mendapatkan angka yang sama persis.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use cdao_common::crypto::verify_signature;

use super::ballot::Merit;
use crate::state::{IssuanceType, LedgerState};
use crate::types::TxId;

pub const BLOCKS_PER_YEAR: u64 = 50_000;
pub const MAX_MERIT_AGE: u64 = 2 * BLOCKS_PER_YEAR;

/// Weighted amount untuk satu issuance. Issuance dari masa depan
/// (issuance_height > block_height) tidak bernilai.
pub fn weighted_merit_amount(amount: u64, issuance_height: u64, block_height: u64) -> u64 {
    if issuance_height > block_height {
        return 0;
    }
    let age = block_height - issuance_height;
    if age >= MAX_MERIT_AGE {
        return 0;
    }
    let inverse_age = MAX_MERIT_AGE - age;
    (amount as u128 * inverse_age as u128 / MAX_MERIT_AGE as u128) as u64
}

/// Total merit untuk blind vote `blind_vote_tx_id`.
///
/// Entry di-skip (tanpa menggugurkan ballot) kalau: issuance duplikat,
/// issuance tidak dikenal atau bukan compensation, issuance lebih baru
/// dari blind vote tx, atau signature tidak valid.
pub fn merit_stake(ledger: &LedgerState, merits: &[Merit], blind_vote_tx_id: &TxId) -> u64 {
    let blind_vote_height = match ledger.tx(blind_vote_tx_id) {
        Some(tx) => tx.block_height,
        None => {
            warn!("merit: blind vote tx {} unknown", blind_vote_tx_id);
            return 0;
        }
    };

    let mut seen: BTreeSet<TxId> = BTreeSet::new();
    let mut total: u64 = 0;
    for merit in merits {
        if !seen.insert(merit.issuance_tx_id) {
            debug!("merit: duplicate issuance {} ignored", merit.issuance_tx_id.short());
            continue;
        }
        let issuance = match ledger.issuance(&merit.issuance_tx_id) {
            Some(i) if i.issuance_type == IssuanceType::Compensation => i,
            Some(_) => {
                debug!("merit: issuance {} is not a compensation", merit.issuance_tx_id.short());
                continue;
            }
            None => {
                warn!("merit: issuance {} unknown", merit.issuance_tx_id.short());
                continue;
            }
        };
        if issuance.chain_height > blind_vote_height {
            warn!("merit: issuance {} is newer than blind vote", merit.issuance_tx_id.short());
            continue;
        }
        let pub_key = match &issuance.pub_key {
            Some(k) => k,
            None => {
                warn!("merit: issuance {} has no public key", merit.issuance_tx_id.short());
                continue;
            }
        };
        match verify_signature(pub_key, blind_vote_tx_id.as_bytes(), &merit.signature) {
            Ok(true) => {}
            Ok(false) => {
                warn!("merit: bad signature for issuance {}", merit.issuance_tx_id.short());
                continue;
            }
            Err(e) => {
                warn!("merit: signature check for {} failed: {}", merit.issuance_tx_id.short(), e);
                continue;
            }
        }
        let weighted = weighted_merit_amount(issuance.amount, issuance.chain_height, blind_vote_height);
        total = total.saturating_add(weighted);
    }
    total
}
