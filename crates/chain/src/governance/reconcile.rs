//! # Ballot Reconciliation
//!
//! List lokal bisa berbeda dari list yang dipakai mayoritas jaringan.
//! Kalau digest lokal tidak cocok, coba buang 1 elemen di setiap posisi,
//! lalu 2, dst. Setiap kandidat memakan 1 unit budget; budget habis ⇒
//! `Exhausted` dan caller harus meminta data yang hilang.
//!
//! ```text
//! [a b c d]   k=1: [b c d] [a c d] [a b d] [a b c]
//!             k=2: [c d] [b d] [b c] [a d] [a c] [a b]
//!             ...
//! ```
//!
//! Kombinasi dibangkitkan secara iteratif (lexicographic index set), tanpa
//! rekursi. Urutan relatif elemen yang tersisa selalu dipertahankan.

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("no matching subset within {budget} candidates")]
    Exhausted { budget: u64 },

    #[error("digest computation failed")]
    Digest,
}

/// Cari subset `list` (urutan dipertahankan) yang digest-nya sama dengan
/// `target`. `digest` boleh gagal; kegagalan menghentikan pencarian.
pub fn find_matching_subset<T, D, E>(
    list: &[T],
    target: &D,
    budget: u64,
    digest: impl Fn(&[T]) -> Result<D, E>,
) -> Result<Vec<T>, ReconcileError>
where
    T: Clone,
    D: PartialEq,
{
    let mut remaining = budget;
    if remaining == 0 {
        return Err(ReconcileError::Exhausted { budget });
    }
    remaining -= 1;
    if digest(list).map_err(|_| ReconcileError::Digest)? == *target {
        return Ok(list.to_vec());
    }

    let n = list.len();
    for k in 1..n {
        // index yang dibuang, selalu terurut naik
        let mut removed: Vec<usize> = (0..k).collect();
        loop {
            if remaining == 0 {
                info!("reconciliation budget of {} exhausted at k={}", budget, k);
                return Err(ReconcileError::Exhausted { budget });
            }
            remaining -= 1;

            let candidate = without_indices(list, &removed);
            if digest(&candidate).map_err(|_| ReconcileError::Digest)? == *target {
                debug!("reconciled by removing indices {:?}", removed);
                return Ok(candidate);
            }

            if !next_combination(&mut removed, n) {
                break;
            }
        }
    }
    Err(ReconcileError::Exhausted { budget })
}

fn without_indices<T: Clone>(list: &[T], removed: &[usize]) -> Vec<T> {
    let mut out = Vec::with_capacity(list.len() - removed.len());
    let mut r = removed.iter().peekable();
    for (i, item) in list.iter().enumerate() {
        if r.peek() == Some(&&i) {
            r.next();
            continue;
        }
        out.push(item.clone());
    }
    out
}

/// Kombinasi berikutnya dalam urutan lexicographic. False kalau sudah habis.
fn next_combination(idx: &mut [usize], n: usize) -> bool {
    let k = idx.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if idx[i] < n - k + i {
            idx[i] += 1;
            for j in i + 1..k {
                idx[j] = idx[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
