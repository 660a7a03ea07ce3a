//! Crypto helpers dipakai oleh consensus engine.
//!
//! Engine ini tidak mengimplementasikan primitive sendiri; modul ini hanya
//! membungkus `sha3`, `ed25519-dalek` (v2) dan `aes-gcm` supaya semua call site
//! memakai format byte yang sama.
//!
//! ```text
//! digest20(data)        = SHA3-256(data)[0..20]
//! ballot blob           = nonce (12 bytes) || AES-128-GCM ciphertext+tag
//! keypair bytes (64)    = [0..32] secret || [32..64] public
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Sha3_256};
use thiserror::Error;

/// Panjang digest yang dibawa di application-data output.
pub const DIGEST20_LEN: usize = 20;
/// Panjang symmetric key yang diungkap di vote reveal.
pub const BALLOT_KEY_LEN: usize = 16;
/// Panjang nonce AES-GCM di depan ciphertext.
pub const BALLOT_NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, found {found}")]
    InvalidKeyLength { expected: usize, found: usize },

    #[error("ciphertext too short: {0} bytes")]
    CiphertextTooShort(usize),

    #[error("decryption failed")]
    DecryptFailed,

    #[error("encryption failed")]
    EncryptFailed,
}

// ════════════════════════════════════════════════════════════════════════════
// HASHING
// ════════════════════════════════════════════════════════════════════════════

pub fn sha3_256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Truncated SHA3-256, format digest di OP_RETURN.
pub fn digest20(data: &[u8]) -> [u8; DIGEST20_LEN] {
    let full = sha3_256_bytes(data);
    let mut out = [0u8; DIGEST20_LEN];
    out.copy_from_slice(&full[..DIGEST20_LEN]);
    out
}

// ════════════════════════════════════════════════════════════════════════════
// ED25519
// ════════════════════════════════════════════════════════════════════════════

/// Generate a new Ed25519 keypair and return concatenated 64-byte (private + public).
pub fn generate_keypair_bytes() -> Vec<u8> {
    let mut rng = OsRng;
    let sk = SigningKey::generate(&mut rng);
    let vk = sk.verifying_key();

    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(&sk.to_bytes());
    combined.extend_from_slice(&vk.to_bytes());
    combined
}

/// Extract public key bytes from 64-byte keypair.
pub fn public_key_bytes_from_keypair_bytes(kp_bytes: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if kp_bytes.len() != 64 {
        return Err(CryptoError::InvalidKeyLength { expected: 64, found: kp_bytes.len() });
    }
    Ok(kp_bytes[32..64].to_vec())
}

/// Sign a message and return 64-byte signature.
pub fn sign_message(kp_bytes: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if kp_bytes.len() != 64 {
        return Err(CryptoError::InvalidKeyLength { expected: 64, found: kp_bytes.len() });
    }
    let mut sk_bytes = [0u8; 32];
    sk_bytes.copy_from_slice(&kp_bytes[0..32]);
    let sk = SigningKey::from_bytes(&sk_bytes);
    Ok(sk.sign(message).to_bytes().to_vec())
}

/// Verify a message given public key and signature.
///
/// Key atau signature dengan panjang salah adalah error; signature yang
/// tidak cocok menghasilkan `Ok(false)`.
pub fn verify_signature(pubkey_bytes: &[u8], message: &[u8], sig_bytes: &[u8]) -> Result<bool, CryptoError> {
    if pubkey_bytes.len() != 32 {
        return Err(CryptoError::InvalidKeyLength { expected: 32, found: pubkey_bytes.len() });
    }
    if sig_bytes.len() != 64 {
        return Err(CryptoError::InvalidKeyLength { expected: 64, found: sig_bytes.len() });
    }

    let mut pk_arr = [0u8; 32];
    pk_arr.copy_from_slice(pubkey_bytes);
    let vk = match VerifyingKey::from_bytes(&pk_arr) {
        Ok(vk) => vk,
        Err(_) => return Ok(false),
    };

    let mut sig_arr = [0u8; 64];
    sig_arr.copy_from_slice(sig_bytes);
    let sig = Signature::from_bytes(&sig_arr);

    Ok(vk.verify(message, &sig).is_ok())
}

// ════════════════════════════════════════════════════════════════════════════
// BALLOT ENCRYPTION (AES-128-GCM)
// ════════════════════════════════════════════════════════════════════════════

/// Random 16-byte ballot key.
pub fn gen_ballot_key() -> [u8; BALLOT_KEY_LEN] {
    let mut k = [0u8; BALLOT_KEY_LEN];
    OsRng.fill_bytes(&mut k);
    k
}

/// Encrypt plaintext. Output: nonce (12 bytes) || ciphertext
pub fn encrypt_ballot(key: &[u8; BALLOT_KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: BALLOT_KEY_LEN,
        found: key.len(),
    })?;

    let mut nonce_bytes = [0u8; BALLOT_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptFailed)?;

    let mut out = Vec::with_capacity(BALLOT_NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt data produced by [`encrypt_ballot`].
pub fn decrypt_ballot(key: &[u8; BALLOT_KEY_LEN], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < BALLOT_NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort(blob.len()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(BALLOT_NONCE_LEN);

    let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: BALLOT_KEY_LEN,
        found: key.len(),
    })?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptFailed)
}
