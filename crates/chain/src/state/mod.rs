//! # Ledger State Module
//!
//! Module ini adalah **ENTRY POINT** dan **FACADE** untuk seluruh state DAO:
//! satu-satunya mutable source of truth yang dibangun dari block yang sudah
//! diklasifikasi.
//!
//! ## Arsitektur
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         mod.rs (FACADE)                         │
//! │  - LedgerState / LedgerData definition                          │
//! │  - Constructor new()                                            │
//! │  - Public re-exports                                            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//!  ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!  │   Unspent    │         │   Mutation   │         │  Cycles &    │
//!  │    Index     │         │    Window    │         │   Params     │
//!  └──────────────┘         └──────────────┘         └──────────────┘
//!          │                         │                         │
//!          ▼                         ▼                         ▼
//!  ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!  │  Issuance    │         │    Bonds &   │         │  Governance  │
//!  │   Records    │         │ Confiscation │         │   Results    │
//!  └──────────────┘         └──────────────┘         └──────────────┘
//!                                    │
//!                    ┌───────────────┼───────────────┐
//!                    ▼               ▼               ▼
//!             ┌────────────┐  ┌────────────┐  ┌────────────┐
//!             │ Listeners  │  │ Hash-chain │  │ Snapshots  │
//!             └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! ## Module Structure
//!
//! | Module | Fungsi |
//! |--------|--------|
//! | `internal_unspent` | Unspent index, spend pointers, tx/block lookup |
//! | `internal_window` | Mutation window: `HeightWindow` → `BlockWindow` |
//! | `internal_cycle` | Cycle bookkeeping, param lookup as of height, phase queries |
//! | `internal_issuance` | Issuance records |
//! | `internal_bond` | Bond state, confiscation markers |
//! | `internal_governance` | Evaluated proposals, decrypted ballots, roles, removed assets |
//! | `internal_listener` | `LedgerListener` notification fan-out |
//! | `internal_state_hash` | Deterministic serialization for the state-hash chain |
//! | `internal_snapshot` | Immutable snapshot clone & restore |
//!
//! ## Mutation Order (CONSENSUS-CRITICAL)
//!
//! ```text
//! advance_height(h) ──► HeightWindow ──append_block()──► BlockWindow
//!                          │                               │
//!                          │ governance commits            │ spend_output()
//!                          │ (vote result at trigger)      │ append_tx() × N
//!                          ▼                               ▼
//!                                                      complete()
//! ```
//!
//! Mutator hanya ada di tipe window. Window meminjam `&mut LedgerState`,
//! jadi concurrent writer tidak bisa dikompilasi. Urutan yang salah
//! (height tidak bersambung, window lama belum di-complete) adalah
//! programming fault dan langsung `panic!`.
//!
//! Reads (`unspent_output`, `param_value`, `phase_for_height`, ...) murni
//! dan boleh dipanggil kapan saja.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cdao_common::{DaoConfig, Network};

use crate::block::{Block, SpentInfo, TxOutput};
use crate::governance::{BondedRole, DecryptedBallotsWithMerits, EvaluatedProposal};
use crate::param::ParamChange;
use crate::period::Cycle;
use crate::types::{TxId, TxOutputKey};

// ════════════════════════════════════════════════════════════════════════════
// INTERNAL MODULES
// ════════════════════════════════════════════════════════════════════════════

/// Unspent index & lookups: unspent_output, spent_info, tx, block_at
mod internal_unspent;

/// Mutation window typestate: HeightWindow, BlockWindow
mod internal_window;

/// Cycle & param: param_value, cycle_for_height, phase_for_height
mod internal_cycle;

/// Issuance records: Issuance, IssuanceType
mod internal_issuance;

/// Bond lifecycle: bond_state, is_confiscated_output
mod internal_bond;

/// Governance results storage
mod internal_governance;

/// Listener trait dan fan-out
mod internal_listener;

/// Hash-chain serialization
mod internal_state_hash;

/// Snapshot clone & restore
mod internal_snapshot;

#[cfg(test)]
mod tests;

// ════════════════════════════════════════════════════════════════════════════
// PUBLIC RE-EXPORTS
// ════════════════════════════════════════════════════════════════════════════

pub use internal_window::{BlockWindow, HeightWindow};
pub use internal_issuance::{Issuance, IssuanceType};
pub use internal_bond::BondState;
pub use internal_listener::LedgerListener;
pub use internal_snapshot::LedgerSnapshot;

// ════════════════════════════════════════════════════════════════════════════
// GENESIS PARAMS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisParams {
    pub height: u64,
    pub tx_id: TxId,
    pub total_supply: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// LEDGER DATA
// ════════════════════════════════════════════════════════════════════════════
//
// Bagian yang di-snapshot dan di-serialize. Semua koleksi memakai BTreeMap /
// BTreeSet / Vec berurutan supaya serialisasi byte-exact antar peer.
//
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerData {
    pub chain_height: u64,
    /// Contiguous dari genesis height.
    pub blocks: Vec<Block>,
    pub cycles: Vec<Cycle>,
    pub unspent_outputs: BTreeMap<TxOutputKey, TxOutput>,
    pub spent_infos: BTreeMap<TxOutputKey, SpentInfo>,
    /// tx id → block height
    pub tx_heights: BTreeMap<TxId, u64>,
    pub confiscated_lockup_tx_ids: BTreeSet<TxId>,
    /// Urut berdasarkan activation height.
    pub param_changes: Vec<ParamChange>,
    pub issuances: BTreeMap<TxId, Issuance>,
    /// cycle start height → hasil evaluasi (urut tx id)
    pub evaluated_proposals: BTreeMap<u64, Vec<EvaluatedProposal>>,
    /// cycle start height → ballot yang didekripsi (urut vote reveal tx id)
    pub decrypted_ballots: BTreeMap<u64, Vec<DecryptedBallotsWithMerits>>,
    pub bonded_roles: BTreeMap<String, BondedRole>,
    pub removed_assets: BTreeSet<String>,
}

/// Posisi state machine mutation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WritePhase {
    Idle,
    HeightAdvanced(u64),
    BlockOpen(u64),
}

// ════════════════════════════════════════════════════════════════════════════
// LEDGER STATE
// ════════════════════════════════════════════════════════════════════════════

pub struct LedgerState {
    data: LedgerData,
    network: Network,
    genesis: GenesisParams,
    hard_fork_height: u64,
    write_phase: WritePhase,
    replay_complete: bool,
    listeners: Vec<Arc<dyn LedgerListener>>,
}

impl LedgerState {
    pub fn new(network: Network, genesis: GenesisParams, hard_fork_height: u64) -> Self {
        Self {
            data: LedgerData::default(),
            network,
            genesis,
            hard_fork_height,
            write_phase: WritePhase::Idle,
            replay_complete: false,
            listeners: Vec::new(),
        }
    }

    pub fn from_config(config: &DaoConfig) -> Result<Self, crate::DaoError> {
        let tx_id = config
            .genesis
            .tx_id
            .parse()
            .map_err(|e| crate::DaoError::Config(format!("genesis tx id: {}", e)))?;
        Ok(Self::new(
            config.network,
            GenesisParams {
                height: config.genesis.height,
                tx_id,
                total_supply: config.genesis.total_supply,
            },
            config.hard_fork_height,
        ))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn genesis(&self) -> &GenesisParams {
        &self.genesis
    }

    pub fn hard_fork_height(&self) -> u64 {
        self.hard_fork_height
    }

    pub fn is_hard_fork_activated(&self, height: u64) -> bool {
        height >= self.hard_fork_height
    }

    pub fn chain_height(&self) -> u64 {
        self.data.chain_height
    }

    pub fn is_replay_complete(&self) -> bool {
        self.replay_complete
    }

    pub fn data(&self) -> &LedgerData {
        &self.data
    }

    pub(crate) fn write_phase(&self) -> WritePhase {
        self.write_phase
    }
}

impl std::fmt::Debug for LedgerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerState")
            .field("network", &self.network)
            .field("chain_height", &self.data.chain_height)
            .field("blocks", &self.data.blocks.len())
            .field("unspent_outputs", &self.data.unspent_outputs.len())
            .field("write_phase", &self.write_phase)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Programming fault: mutasi di luar window atau urutan window salah.
#[track_caller]
pub(crate) fn invariant_violation(msg: String) -> ! {
    tracing::error!("ledger invariant violation: {}", msg);
    panic!("ledger invariant violation: {}", msg);
}
