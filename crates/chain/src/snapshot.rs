//! # Snapshot Persistence
//!
//! Snapshot dipakai untuk rollback saat chain discontinuity (reorg).
//!
//! ## Candidate → Persisted
//!
//! ```text
//! height % interval == 0 (replay sudah selesai)
//!        │
//!        ▼
//!  ledger.snapshot() ──► candidate baru
//!                           │ candidate lama
//!                           ▼
//!                 channel ──► writer thread ──► SnapshotStore::save()
//! ```
//!
//! Candidate lama minimal `interval` block di belakang tip, jadi snapshot
//! yang ditulis selalu cukup dalam untuk dipakai rollback. Writer menerima
//! clone immutable; klasifikasi tidak pernah menunggu I/O kecuali saat
//! rollback (`flush`).
//!
//! ## Layout (FileSnapshotStore)
//!
//! ```text
//! {dir}/
//! ├── snapshot_{height}.bin   ← bincode(LedgerSnapshot)
//! └── ...                     (FIFO, maksimum max_snapshots)
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::state::{LedgerSnapshot, LedgerState};
use crate::DaoError;

// ════════════════════════════════════════════════════════════════════════════
// STORE
// ════════════════════════════════════════════════════════════════════════════

pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), DaoError>;

    /// Snapshot tertinggi dengan height < `height`.
    fn load_below(&self, height: u64) -> Result<Option<LedgerSnapshot>, DaoError>;

    /// Height snapshot yang tersimpan, urut naik.
    fn heights(&self) -> Result<Vec<u64>, DaoError>;
}

/// Store in-memory untuk test dan node tanpa path.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<u64, LedgerSnapshot>>,
    max_snapshots: usize,
}

impl MemorySnapshotStore {
    pub fn new(max_snapshots: usize) -> Self {
        Self { snapshots: Mutex::new(BTreeMap::new()), max_snapshots: max_snapshots.max(1) }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), DaoError> {
        let mut map = self.snapshots.lock();
        map.insert(snapshot.height, snapshot.clone());
        while map.len() > self.max_snapshots {
            let oldest = match map.keys().next() {
                Some(h) => *h,
                None => break,
            };
            map.remove(&oldest);
        }
        Ok(())
    }

    fn load_below(&self, height: u64) -> Result<Option<LedgerSnapshot>, DaoError> {
        Ok(self.snapshots.lock().range(..height).next_back().map(|(_, s)| s.clone()))
    }

    fn heights(&self) -> Result<Vec<u64>, DaoError> {
        Ok(self.snapshots.lock().keys().copied().collect())
    }
}

/// Store berbasis file bincode, satu file per snapshot.
#[derive(Debug)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    max_snapshots: usize,
}

const FILE_PREFIX: &str = "snapshot_";
const FILE_SUFFIX: &str = ".bin";

fn io_err(context: &str, path: &Path, e: std::io::Error) -> DaoError {
    DaoError::Snapshot(format!("{} {}: {}", context, path.display(), e))
}

impl FileSnapshotStore {
    pub fn open(dir: impl AsRef<Path>, max_snapshots: usize) -> Result<Self, DaoError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| io_err("create", &dir, e))?;
        Ok(Self { dir, max_snapshots: max_snapshots.max(1) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, height: u64) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, height, FILE_SUFFIX))
    }

    fn list(&self) -> Result<Vec<u64>, DaoError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| io_err("read", &self.dir, e))?;
        let mut heights = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let name = entry.file_name();
            let height = name
                .to_str()
                .and_then(|n| n.strip_prefix(FILE_PREFIX))
                .and_then(|n| n.strip_suffix(FILE_SUFFIX))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(h) = height {
                heights.push(h);
            }
        }
        heights.sort_unstable();
        Ok(heights)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), DaoError> {
        let path = self.path_for(snapshot.height);
        let tmp = path.with_extension("tmp");
        let bytes = bincode::serialize(snapshot)?;
        fs::write(&tmp, &bytes).map_err(|e| io_err("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err("rename", &path, e))?;
        debug!("snapshot {} written ({} bytes)", snapshot.height, bytes.len());

        let heights = self.list()?;
        if heights.len() > self.max_snapshots {
            for h in &heights[..heights.len() - self.max_snapshots] {
                let old = self.path_for(*h);
                if let Err(e) = fs::remove_file(&old) {
                    warn!("cannot remove old snapshot {}: {}", old.display(), e);
                }
            }
        }
        Ok(())
    }

    fn load_below(&self, height: u64) -> Result<Option<LedgerSnapshot>, DaoError> {
        let target = match self.list()?.into_iter().filter(|h| *h < height).max() {
            Some(h) => h,
            None => return Ok(None),
        };
        let path = self.path_for(target);
        let bytes = fs::read(&path).map_err(|e| io_err("read", &path, e))?;
        let snapshot: LedgerSnapshot = bincode::deserialize(&bytes)?;
        if snapshot.height != target {
            return Err(DaoError::Snapshot(format!(
                "{} contains height {}",
                path.display(),
                snapshot.height
            )));
        }
        Ok(Some(snapshot))
    }

    fn heights(&self) -> Result<Vec<u64>, DaoError> {
        self.list()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MANAGER
// ════════════════════════════════════════════════════════════════════════════

enum WriterMsg {
    Save(Box<LedgerSnapshot>),
    Flush(Sender<()>),
}

pub struct SnapshotManager {
    interval: u64,
    store: Arc<dyn SnapshotStore>,
    candidate: Option<LedgerSnapshot>,
    tx: Option<Sender<WriterMsg>>,
    writer: Option<JoinHandle<()>>,
}

impl SnapshotManager {
    pub fn new(store: Arc<dyn SnapshotStore>, interval: u64) -> Self {
        let (tx, rx) = mpsc::channel();
        let writer_store = store.clone();
        let writer = std::thread::Builder::new()
            .name("snapshot-writer".into())
            .spawn(move || writer_loop(writer_store, rx));
        let (tx, writer) = match writer {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                warn!("snapshot writer thread not started, writing inline: {}", e);
                (None, None)
            }
        };
        Self { interval: interval.max(1), store, candidate: None, tx, writer }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub fn candidate_height(&self) -> Option<u64> {
        self.candidate.as_ref().map(|c| c.height)
    }

    /// Dipanggil setelah block complete.
    pub fn on_block_complete(&mut self, ledger: &LedgerState) {
        let height = ledger.chain_height();
        if !ledger.is_replay_complete() || height % self.interval != 0 {
            return;
        }
        if self.candidate_height() == Some(height) {
            return;
        }
        let snapshot = ledger.snapshot();
        debug!("snapshot candidate at height {}", height);
        if let Some(previous) = self.candidate.replace(snapshot) {
            info!("persisting snapshot at height {}", previous.height);
            self.persist(previous);
        }
    }

    fn persist(&mut self, snapshot: LedgerSnapshot) {
        if let Some(tx) = &self.tx {
            match tx.send(WriterMsg::Save(Box::new(snapshot))) {
                Ok(()) => return,
                Err(mpsc::SendError(msg)) => {
                    warn!("snapshot writer gone, writing inline");
                    self.tx = None;
                    if let WriterMsg::Save(snapshot) = msg {
                        write_logged(&*self.store, &snapshot);
                    }
                    return;
                }
            }
        }
        write_logged(&*self.store, &snapshot);
    }

    /// Tunggu semua snapshot yang sudah dikirim selesai ditulis.
    pub fn flush(&self) {
        if let Some(tx) = &self.tx {
            let (ack_tx, ack_rx) = mpsc::channel();
            if tx.send(WriterMsg::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }

    /// Snapshot persisted terbaru di bawah `height`. Candidate dibuang karena
    /// bisa berasal dari fork yang ditinggalkan.
    pub fn rollback_target(&mut self, height: u64) -> Result<Option<LedgerSnapshot>, DaoError> {
        self.flush();
        self.candidate = None;
        self.store.load_below(height)
    }
}

impl Drop for SnapshotManager {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}

fn write_logged(store: &dyn SnapshotStore, snapshot: &LedgerSnapshot) {
    if let Err(e) = store.save(snapshot) {
        warn!("snapshot at height {} not persisted: {}", snapshot.height, e);
    }
}

fn writer_loop(store: Arc<dyn SnapshotStore>, rx: Receiver<WriterMsg>) {
    while let Ok(msg) = rx.recv() {
        match msg {
            WriterMsg::Save(snapshot) => write_logged(&*store, &snapshot),
            WriterMsg::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("snapshot writer stopped");
}
