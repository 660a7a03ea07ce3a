//! # Cycles, Params & Phase Queries
//!
//! Cycle pertama mulai di genesis height. Cycle berikutnya dibuat saat
//! height-advance melewati last block cycle terakhir, dengan durasi phase
//! dari param yang aktif di height tersebut.

use tracing::info;

use super::LedgerState;
use crate::param::{Param, ParamChange};
use crate::period::{Cycle, DaoPhase};
use crate::types::TxId;

impl LedgerState {
    // ════════════════════════════════════════════════════════════════════════
    // PARAMS
    // ════════════════════════════════════════════════════════════════════════

    /// Value param yang berlaku di `height`: override terakhir dengan
    /// activation height <= height, atau default network.
    pub fn param_value(&self, param: Param, height: u64) -> u64 {
        self.data
            .param_changes
            .iter()
            .filter(|c| c.param == param && c.activation_height <= height)
            .last()
            .map(|c| c.value)
            .unwrap_or_else(|| param.default_value(self.network))
    }

    pub fn param_changes(&self) -> &[ParamChange] {
        &self.data.param_changes
    }

    // ════════════════════════════════════════════════════════════════════════
    // CYCLES
    // ════════════════════════════════════════════════════════════════════════

    pub fn cycles(&self) -> &[Cycle] {
        &self.data.cycles
    }

    pub fn current_cycle(&self) -> Option<&Cycle> {
        self.data.cycles.last()
    }

    pub fn cycle_for_height(&self, height: u64) -> Option<&Cycle> {
        self.data.cycles.iter().rev().find(|c| c.contains(height))
    }

    /// Index 0-based dari cycle dalam sejarah.
    pub fn cycle_index(&self, cycle: &Cycle) -> Option<usize> {
        self.data
            .cycles
            .iter()
            .position(|c| c.height_of_first_block == cycle.height_of_first_block)
    }

    pub fn phase_for_height(&self, height: u64) -> Option<DaoPhase> {
        self.cycle_for_height(height)?.phase_for_height(height)
    }

    pub fn is_in_phase(&self, height: u64, phase: DaoPhase) -> bool {
        self.phase_for_height(height) == Some(phase)
    }

    pub fn first_block_of_phase(&self, height: u64, phase: DaoPhase) -> Option<u64> {
        Some(self.cycle_for_height(height)?.first_block_of_phase(phase))
    }

    pub fn is_first_block_of_phase(&self, height: u64, phase: DaoPhase) -> bool {
        self.first_block_of_phase(height, phase) == Some(height)
    }

    /// Tx tercatat di `phase` dari cycle yang sama dengan `height`.
    pub fn is_tx_in_phase_and_cycle(&self, tx_id: &TxId, phase: DaoPhase, height: u64) -> bool {
        let tx_height = match self.data.tx_heights.get(tx_id) {
            Some(h) => *h,
            None => return false,
        };
        match self.cycle_for_height(height) {
            Some(cycle) => cycle.contains(tx_height) && cycle.is_in_phase(tx_height, phase),
            None => false,
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // WINDOW-ONLY MUTATORS
    // ════════════════════════════════════════════════════════════════════════

    pub(super) fn maybe_start_new_cycle(&mut self, height: u64) {
        let start = match self.data.cycles.last() {
            None => {
                if height != self.genesis.height {
                    return;
                }
                height
            }
            Some(last) => {
                if height <= last.height_of_last_block() {
                    return;
                }
                last.height_of_last_block() + 1
            }
        };
        let cycle = Cycle::from_params(start, |p| self.param_value(p, start));
        info!(
            "new cycle #{} at height {} (last block {})",
            self.data.cycles.len(),
            cycle.height_of_first_block,
            cycle.height_of_last_block()
        );
        self.data.cycles.push(cycle);
    }
}
