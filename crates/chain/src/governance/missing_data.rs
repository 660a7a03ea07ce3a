//! # Missing Ballot Data Requests
//!
//! Kalau reconciliation gagal, blind vote yang dirujuk reveal tapi tidak
//! ada di store diminta ulang ke peer. Request bersifat fire-and-forget:
//!
//! ```text
//! request(ids) ──► outstanding += ids
//!                   │
//!                   ├─ tokio runtime ada ─► spawn retry task:
//!                   │                        tick → send(outstanding) → ...
//!                   │                        berhenti: outstanding kosong /
//!                   │                        max_retries tercapai
//!                   └─ tanpa runtime ─────► satu kali send()
//!
//! mark_received(id) ──► outstanding -= id, NewDataSignal di-set
//! ```
//!
//! Tally tidak menunggu task ini; tally hanya melihat `NewDataSignal` di
//! height berikutnya dan menghitung ulang.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use cdao_common::ReconciliationSettings;

use crate::types::TxId;

/// Transport ke peer (implementasi milik network layer).
pub trait DataRequestSender: Send + Sync {
    fn request_blind_votes(&self, tx_ids: &[TxId]);
}

/// Flag "ada data baru sejak tally terakhir".
#[derive(Debug, Default)]
pub struct NewDataSignal {
    flag: Mutex<bool>,
}

impl NewDataSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        *self.flag.lock() = true;
    }

    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Baca lalu reset.
    pub fn take(&self) -> bool {
        std::mem::replace(&mut *self.flag.lock(), false)
    }
}

#[derive(Debug, Default)]
struct RequestState {
    outstanding: BTreeSet<TxId>,
    task_running: bool,
    sends: u64,
}

pub struct MissingDataRequester {
    sender: Arc<dyn DataRequestSender>,
    signal: Arc<NewDataSignal>,
    retry_interval: Duration,
    max_retries: u32,
    state: Arc<Mutex<RequestState>>,
}

impl MissingDataRequester {
    pub fn new(sender: Arc<dyn DataRequestSender>, signal: Arc<NewDataSignal>, settings: &ReconciliationSettings) -> Self {
        Self {
            sender,
            signal,
            retry_interval: Duration::from_secs(settings.retry_interval_secs),
            max_retries: settings.max_retries,
            state: Arc::new(Mutex::new(RequestState::default())),
        }
    }

    /// Override interval (test memakai milidetik).
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn signal(&self) -> Arc<NewDataSignal> {
        self.signal.clone()
    }

    pub fn outstanding(&self) -> Vec<TxId> {
        self.state.lock().outstanding.iter().copied().collect()
    }

    /// Jumlah batch request yang sudah dikirim.
    pub fn sends(&self) -> u64 {
        self.state.lock().sends
    }

    pub fn request(&self, tx_ids: &[TxId]) {
        let spawn_task = {
            let mut st = self.state.lock();
            let before = st.outstanding.len();
            st.outstanding.extend(tx_ids.iter().copied());
            if st.outstanding.len() > before {
                info!("requesting {} missing blind votes", st.outstanding.len());
            }
            if st.outstanding.is_empty() || st.task_running {
                return;
            }
            match Handle::try_current() {
                Ok(handle) => {
                    st.task_running = true;
                    Some(handle)
                }
                Err(_) => None,
            }
        };

        match spawn_task {
            Some(handle) => {
                handle.spawn(retry_loop(
                    self.sender.clone(),
                    self.state.clone(),
                    self.retry_interval,
                    self.max_retries,
                ));
            }
            None => {
                debug!("no tokio runtime, sending missing data request once");
                send_outstanding(&*self.sender, &self.state);
            }
        }
    }

    /// Data untuk `tx_id` sudah diterima dari peer.
    pub fn mark_received(&self, tx_id: &TxId) {
        let removed = self.state.lock().outstanding.remove(tx_id);
        if removed {
            debug!("missing blind vote {} received", tx_id.short());
        }
        self.signal.notify();
    }
}

fn send_outstanding(sender: &dyn DataRequestSender, state: &Mutex<RequestState>) -> bool {
    let ids: Vec<TxId> = {
        let mut st = state.lock();
        if st.outstanding.is_empty() {
            return false;
        }
        st.sends += 1;
        st.outstanding.iter().copied().collect()
    };
    sender.request_blind_votes(&ids);
    true
}

async fn retry_loop(
    sender: Arc<dyn DataRequestSender>,
    state: Arc<Mutex<RequestState>>,
    retry_interval: Duration,
    max_retries: u32,
) {
    // interval() panic pada durasi nol
    let mut ticker = tokio::time::interval(retry_interval.max(Duration::from_millis(1)));
    let mut attempts: u32 = 0;
    loop {
        ticker.tick().await;
        if attempts > max_retries {
            warn!("missing data still outstanding after {} retries", max_retries);
            break;
        }
        if !send_outstanding(&*sender, &state) {
            break;
        }
        attempts += 1;
    }
    state.lock().task_running = false;
}
