//! # Ledger Listeners
//!
//! Empat callback, semua default no-op:
//!
//! | Callback | Kapan |
//! |----------|-------|
//! | `on_new_block_height` | setiap height-advance |
//! | `on_block_complete` | setiap block, murah, selalu |
//! | `on_block_complete_after_replay` | setiap block tapi hanya setelah replay selesai |
//! | `on_replay_complete` | sekali, saat historical replay selesai |
//!
//! Listener mahal (rebuild derived view) cukup implement dua callback
//! terakhir supaya tidak jalan ratusan ribu kali saat replay.

use std::sync::Arc;

use tracing::info;

use super::LedgerState;
use crate::block::Block;

pub trait LedgerListener: Send + Sync {
    fn on_new_block_height(&self, _height: u64) {}

    fn on_block_complete(&self, _block: &Block, _ledger: &LedgerState) {}

    fn on_block_complete_after_replay(&self, _block: &Block, _ledger: &LedgerState) {}

    fn on_replay_complete(&self, _ledger: &LedgerState) {}
}

impl LedgerState {
    pub fn add_listener(&mut self, listener: Arc<dyn LedgerListener>) {
        self.listeners.push(listener);
    }

    /// Dipanggil sekali setelah bulk replay historis selesai.
    pub fn mark_replay_complete(&mut self) {
        if self.replay_complete {
            return;
        }
        self.replay_complete = true;
        info!("replay complete at height {}", self.data.chain_height);
        let listeners = self.listeners.clone();
        for l in &listeners {
            l.on_replay_complete(self);
        }
    }

    pub(super) fn notify_new_block_height(&self, height: u64) {
        for l in &self.listeners {
            l.on_new_block_height(height);
        }
    }

    pub(super) fn notify_block_complete(&self) {
        let block = match self.data.blocks.last() {
            Some(b) => b,
            None => return,
        };
        for l in &self.listeners {
            l.on_block_complete(block, self);
        }
        if self.replay_complete {
            for l in &self.listeners {
                l.on_block_complete_after_replay(block, self);
            }
        }
    }
}
