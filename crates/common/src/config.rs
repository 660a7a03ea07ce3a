//! # DAO Consensus Configuration
//!
//! Konfigurasi engine bisa di-load dari TOML atau memakai preset per network.
//!
//! ## Config File Format
//!
//! ```toml
//! network = "regtest"
//! # hard_fork_height = 1
//!
//! [genesis]
//! height = 111
//! tx_id = "aa...aa"
//! total_supply = 250000000
//!
//! [snapshot]
//! interval_blocks = 20
//! max_snapshots = 3
//! # path = "./snapshots"
//!
//! [reconciliation]
//! max_iterations = 1000000
//! retry_interval_secs = 30
//! max_retries = 10
//! ```
//!
//! Semua field optional. Field yang tidak ada diambil dari preset network.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// ════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ════════════════════════════════════════════════════════════════════════════

pub const MAINNET_GENESIS_HEIGHT: u64 = 571_747;
pub const MAINNET_GENESIS_TX_ID: &str =
    "4b5417ec5ab6112bedf539c3b4f5a806ed539542d8b717e1c4470aa3180edce5";
/// 2.5M token, 2 decimals.
pub const GENESIS_TOTAL_SUPPLY: u64 = 250_000_000;
pub const MAINNET_HARD_FORK_HEIGHT: u64 = 680_300;

pub const REGTEST_GENESIS_HEIGHT: u64 = 111;
pub const REGTEST_GENESIS_TX_ID: &str =
    "30af0050040befd8af25068cc697e418e09c2d8ebd8d411d2240591b9ec203cf";

pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 20;
pub const DEFAULT_MAX_SNAPSHOTS: usize = 3;
pub const DEFAULT_RECONCILIATION_BUDGET: u64 = 1_000_000;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 10;

// ════════════════════════════════════════════════════════════════════════════
// NETWORK
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Regtest,
}

impl Network {
    /// Height mulai berlakunya perbaikan klasifikasi funding candidate.
    pub fn hard_fork_height(&self) -> u64 {
        match self {
            Network::Mainnet => MAINNET_HARD_FORK_HEIGHT,
            Network::Regtest => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Regtest => "regtest",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub height: u64,
    /// Hex tx id.
    pub tx_id: String,
    pub total_supply: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Snapshot candidate dibuat setiap N block.
    pub interval_blocks: u64,
    /// Berapa persisted snapshot yang disimpan store.
    pub max_snapshots: usize,
    /// None = in-memory store.
    pub path: Option<PathBuf>,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            interval_blocks: DEFAULT_SNAPSHOT_INTERVAL,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    /// Batas global jumlah digest kandidat yang dihitung.
    pub max_iterations: u64,
    pub retry_interval_secs: u64,
    pub max_retries: u32,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_RECONCILIATION_BUDGET,
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DAO CONFIG
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoConfig {
    pub network: Network,
    pub genesis: GenesisConfig,
    pub hard_fork_height: u64,
    pub snapshot: SnapshotSettings,
    pub reconciliation: ReconciliationSettings,
}

impl DaoConfig {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            genesis: GenesisConfig {
                height: MAINNET_GENESIS_HEIGHT,
                tx_id: MAINNET_GENESIS_TX_ID.to_string(),
                total_supply: GENESIS_TOTAL_SUPPLY,
            },
            hard_fork_height: Network::Mainnet.hard_fork_height(),
            snapshot: SnapshotSettings::default(),
            reconciliation: ReconciliationSettings::default(),
        }
    }

    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            genesis: GenesisConfig {
                height: REGTEST_GENESIS_HEIGHT,
                tx_id: REGTEST_GENESIS_TX_ID.to_string(),
                total_supply: GENESIS_TOTAL_SUPPLY,
            },
            hard_fork_height: Network::Regtest.hard_fork_height(),
            snapshot: SnapshotSettings::default(),
            reconciliation: ReconciliationSettings::default(),
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// Parse dari string TOML, field kosong diisi dari preset network.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: DaoToml = toml::from_str(s).context("failed to parse dao config toml")?;
        let mut cfg = Self::for_network(raw.network.unwrap_or(Network::Mainnet));

        if let Some(h) = raw.hard_fork_height {
            cfg.hard_fork_height = h;
        }
        if let Some(g) = raw.genesis {
            if let Some(v) = g.height {
                cfg.genesis.height = v;
            }
            if let Some(v) = g.tx_id {
                cfg.genesis.tx_id = v;
            }
            if let Some(v) = g.total_supply {
                cfg.genesis.total_supply = v;
            }
        }
        if let Some(s) = raw.snapshot {
            if let Some(v) = s.interval_blocks {
                cfg.snapshot.interval_blocks = v;
            }
            if let Some(v) = s.max_snapshots {
                cfg.snapshot.max_snapshots = v;
            }
            if s.path.is_some() {
                cfg.snapshot.path = s.path;
            }
        }
        if let Some(r) = raw.reconciliation {
            if let Some(v) = r.max_iterations {
                cfg.reconciliation.max_iterations = v;
            }
            if let Some(v) = r.retry_interval_secs {
                cfg.reconciliation.retry_interval_secs = v;
            }
            if let Some(v) = r.max_retries {
                cfg.reconciliation.max_retries = v;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let p = path.as_ref();
        let s = fs::read_to_string(p)
            .with_context(|| format!("failed to read config file {}", p.display()))?;
        let cfg = Self::from_toml_str(&s)?;
        info!(
            "loaded {} config from {} (genesis height {}, snapshot every {} blocks)",
            cfg.network,
            p.display(),
            cfg.genesis.height,
            cfg.snapshot.interval_blocks
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.genesis.tx_id.len() != 64 || hex::decode(&self.genesis.tx_id).is_err() {
            bail!("genesis tx_id must be 32 bytes hex, got {:?}", self.genesis.tx_id);
        }
        if self.genesis.total_supply == 0 {
            bail!("genesis total_supply must be > 0");
        }
        if self.snapshot.interval_blocks == 0 {
            bail!("snapshot interval_blocks must be > 0");
        }
        if self.snapshot.max_snapshots == 0 {
            bail!("snapshot max_snapshots must be > 0");
        }
        if self.reconciliation.max_iterations == 0 {
            bail!("reconciliation max_iterations must be > 0");
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TOML RAW STRUCTS (intermediate for deserialization)
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct DaoToml {
    network: Option<Network>,
    hard_fork_height: Option<u64>,
    genesis: Option<GenesisToml>,
    snapshot: Option<SnapshotToml>,
    reconciliation: Option<ReconciliationToml>,
}

#[derive(Debug, Deserialize)]
struct GenesisToml {
    height: Option<u64>,
    tx_id: Option<String>,
    total_supply: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SnapshotToml {
    interval_blocks: Option<u64>,
    max_snapshots: Option<usize>,
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ReconciliationToml {
    max_iterations: Option<u64>,
    retry_interval_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        DaoConfig::mainnet().validate().expect("mainnet");
        DaoConfig::regtest().validate().expect("regtest");
        assert_eq!(DaoConfig::mainnet().hard_fork_height, MAINNET_HARD_FORK_HEIGHT);
    }

    #[test]
    fn test_empty_toml_is_mainnet() {
        let cfg = DaoConfig::from_toml_str("").expect("parse");
        assert_eq!(cfg, DaoConfig::mainnet());
    }

    #[test]
    fn test_toml_overrides_preset() {
        let toml = r#"
            network = "regtest"
            hard_fork_height = 500

            [genesis]
            height = 200

            [snapshot]
            interval_blocks = 5

            [reconciliation]
            max_iterations = 42
        "#;
        let cfg = DaoConfig::from_toml_str(toml).expect("parse");
        assert_eq!(cfg.network, Network::Regtest);
        assert_eq!(cfg.hard_fork_height, 500);
        assert_eq!(cfg.genesis.height, 200);
        assert_eq!(cfg.genesis.tx_id, REGTEST_GENESIS_TX_ID);
        assert_eq!(cfg.snapshot.interval_blocks, 5);
        assert_eq!(cfg.snapshot.max_snapshots, DEFAULT_MAX_SNAPSHOTS);
        assert_eq!(cfg.reconciliation.max_iterations, 42);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DaoConfig::from_toml_str("[snapshot]\ninterval_blocks = 0").is_err());
        assert!(DaoConfig::from_toml_str("[genesis]\ntx_id = \"abc\"").is_err());
        assert!(DaoConfig::from_toml_str("network = \"moon\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "network = \"regtest\"\n[snapshot]\nmax_snapshots = 7\n").expect("write");
        let cfg = DaoConfig::from_toml_file(tmp.path()).expect("load");
        assert_eq!(cfg.snapshot.max_snapshots, 7);
        assert_eq!(cfg.genesis.height, REGTEST_GENESIS_HEIGHT);
    }
}
