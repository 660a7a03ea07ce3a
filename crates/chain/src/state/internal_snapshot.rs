//! # Ledger Snapshots
//!
//! Snapshot adalah clone immutable dari `LedgerData` pada block boundary.
//! Penulisan ke storage dilakukan oleh `crate::snapshot` di thread lain;
//! module ini hanya membuat clone dan memulihkannya.
//!
//! | Operasi | Syarat |
//! |---------|--------|
//! | `snapshot()` | window tertutup (Idle) |
//! | `restore()` | window tertutup (Idle) |
//! | `reset()` | window tertutup (Idle) |

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{invariant_violation, LedgerData, LedgerState, WritePhase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Chain height saat snapshot diambil.
    pub height: u64,
    pub data: LedgerData,
}

impl LedgerSnapshot {
    pub fn last_block_hash(&self) -> Option<crate::types::BlockHash> {
        self.data.blocks.last().map(|b| b.hash)
    }
}

impl LedgerState {
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.require_idle("snapshot");
        LedgerSnapshot {
            height: self.data.chain_height,
            data: self.data.clone(),
        }
    }

    /// Ganti seluruh data dengan snapshot. Listener dan konfigurasi tetap.
    pub fn restore(&mut self, snapshot: LedgerSnapshot) {
        self.require_idle("restore");
        info!(
            "ledger restored to snapshot at height {} (was {})",
            snapshot.height, self.data.chain_height
        );
        self.data = snapshot.data;
    }

    /// Kembali ke ledger kosong; dipakai saat rollback tanpa snapshot.
    pub fn reset(&mut self) {
        self.require_idle("reset");
        info!("ledger reset from height {}", self.data.chain_height);
        self.data = LedgerData::default();
    }

    fn require_idle(&self, op: &str) {
        if self.write_phase != WritePhase::Idle {
            invariant_violation(format!("{} while window {:?} is open", op, self.write_phase));
        }
    }
}
