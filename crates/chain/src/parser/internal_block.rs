//! # Block Classification
//!
//! Menerima raw block dari block source dan menjalankan mutation window:
//!
//! ```text
//! submit(raw)
//!   height <  expected  ── hash sama ──► Ignored (duplikat)
//!                       └─ hash beda ──► Err(ChainDiscontinuity)
//!   height >  expected  ───────────────► Buffered (pending map)
//!   height == expected  ── prev hash beda ► Err(ChainDiscontinuity)
//!                       └─ apply:
//!                            advance_height(h) ─► hook.on_new_height()
//!                            append_block()    ─► classify_tx() × N
//!                            complete()
//!                          lalu apply pending block yang sekarang tersambung
//! ```
//!
//! Rollback sendiri bukan urusan classifier: caller (engine) yang memegang
//! snapshot.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::internal_tx::{classify_tx, ClassifiedTx};
use super::HeightHook;
use crate::block::Block;
use crate::raw::RawBlock;
use crate::state::LedgerState;
use crate::types::BlockHash;
use crate::DaoError;

/// Batas jumlah block future yang ditahan.
pub const DEFAULT_MAX_PENDING: usize = 1_000;

#[derive(Debug)]
pub struct BlockReport {
    pub height: u64,
    pub hash: BlockHash,
    /// Tx relevan, urut sesuai posisi di block.
    pub txs: Vec<ClassifiedTx>,
}

impl BlockReport {
    pub fn irregular_count(&self) -> usize {
        self.txs.iter().filter(|c| c.tx.tx_type.is_irregular()).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.txs.iter().filter(|c| c.tx.tx_type.is_invalid()).count()
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Block (dan pending block yang tersambung) sudah masuk ledger.
    Applied(Vec<BlockReport>),
    /// Height di depan chain; ditahan sampai gap terisi.
    Buffered { height: u64 },
    /// Duplikat, di bawah genesis, atau pending penuh.
    Ignored { height: u64 },
}

pub struct BlockClassifier {
    pending: BTreeMap<u64, RawBlock>,
    max_pending: usize,
}

impl Default for BlockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockClassifier {
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self { pending: BTreeMap::new(), max_pending }
    }

    pub fn pending_heights(&self) -> Vec<u64> {
        self.pending.keys().copied().collect()
    }

    /// Dipanggil setelah rollback: block yang ditahan mungkin dari fork lama.
    pub fn clear_pending(&mut self) {
        if !self.pending.is_empty() {
            debug!("dropping {} pending blocks", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn submit(
        &mut self,
        ledger: &mut LedgerState,
        raw: RawBlock,
        hook: &mut dyn HeightHook,
    ) -> Result<SubmitOutcome, DaoError> {
        self.submit_with(ledger, raw, hook, &mut |_| {})
    }

    /// Seperti `submit`, dengan callback setelah setiap block complete
    /// (window sudah tertutup, ledger boleh di-snapshot).
    pub fn submit_with(
        &mut self,
        ledger: &mut LedgerState,
        raw: RawBlock,
        hook: &mut dyn HeightHook,
        on_complete: &mut dyn FnMut(&LedgerState),
    ) -> Result<SubmitOutcome, DaoError> {
        let expected = ledger.next_expected_height();
        let height = raw.height;

        if height < expected {
            return match ledger.block_at(height) {
                Some(known) if known.hash == raw.hash => {
                    debug!("block {} already applied", height);
                    Ok(SubmitOutcome::Ignored { height })
                }
                Some(known) => Err(DaoError::ChainDiscontinuity {
                    height,
                    reason: format!("block {} replaces known block {}", raw.hash.short(), known.hash.short()),
                }),
                None => {
                    debug!("block {} below genesis height {}", height, expected);
                    Ok(SubmitOutcome::Ignored { height })
                }
            };
        }

        if height > expected {
            if self.pending.len() >= self.max_pending && !self.pending.contains_key(&height) {
                warn!("pending buffer full ({}), block {} dropped", self.max_pending, height);
                return Ok(SubmitOutcome::Ignored { height });
            }
            debug!("block {} buffered, waiting for {}", height, expected);
            self.pending.insert(height, raw);
            return Ok(SubmitOutcome::Buffered { height });
        }

        check_connects(ledger, &raw)?;
        let mut reports = vec![apply_block(ledger, raw, hook)];
        on_complete(ledger);

        loop {
            let next = ledger.next_expected_height();
            self.pending = self.pending.split_off(&next);
            let raw = match self.pending.remove(&next) {
                Some(raw) => raw,
                None => break,
            };
            if let Err(e) = check_connects(ledger, &raw) {
                warn!("pending block {} discarded: {}", next, e);
                break;
            }
            info!("applying buffered block {}", next);
            reports.push(apply_block(ledger, raw, hook));
            on_complete(ledger);
        }

        Ok(SubmitOutcome::Applied(reports))
    }
}

fn check_connects(ledger: &LedgerState, raw: &RawBlock) -> Result<(), DaoError> {
    match ledger.last_block() {
        Some(last) if last.hash != raw.previous_block_hash => Err(DaoError::ChainDiscontinuity {
            height: raw.height,
            reason: format!(
                "previous hash {} does not match tip {}",
                raw.previous_block_hash.short(),
                last.hash.short()
            ),
        }),
        _ => Ok(()),
    }
}

fn apply_block(ledger: &mut LedgerState, raw: RawBlock, hook: &mut dyn HeightHook) -> BlockReport {
    let height = raw.height;
    let mut height_window = ledger.advance_height(height);
    hook.on_new_height(&mut height_window);

    let mut block_window = height_window.append_block(Block::empty_from_raw(&raw));
    let mut txs = Vec::new();
    for raw_tx in &raw.txs {
        if let Some(classified) = classify_tx(&mut block_window, raw_tx) {
            block_window.append_tx(classified.tx.clone());
            txs.push(classified);
        }
    }
    block_window.complete();

    debug!("block {} applied with {} relevant txs", height, txs.len());
    BlockReport { height, hash: raw.hash, txs }
}
