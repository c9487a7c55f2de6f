//! Token file encryption and I/O
//!
//! File format:
//! - nonce: 24 bytes (XChaCha20-Poly1305)
//! - ciphertext: AEAD output (= ciphertext + 16-byte tag)
//!
//! No header and no AAD; a fresh key and nonce are drawn for every write.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::io::Write;
use std::path::Path;
use zeroize::Zeroizing;

/// Symmetric key length (256-bit)
pub const KEY_LEN: usize = 32;

/// Nonce length (24 bytes for XChaCha20-Poly1305)
pub const NONCE_LEN: usize = 24;

/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

pub type SymmetricKey = Zeroizing<[u8; KEY_LEN]>;

/// Source of key and nonce material.
pub trait EntropySource: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error>;
}

/// Operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(buf)
    }
}

pub fn generate_key(entropy: &dyn EntropySource) -> Result<SymmetricKey, rand::Error> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let buf: &mut [u8; KEY_LEN] = &mut key;
    entropy.fill(buf)?;
    Ok(key)
}

pub fn generate_nonce(entropy: &dyn EntropySource) -> Result<[u8; NONCE_LEN], rand::Error> {
    let mut nonce = [0u8; NONCE_LEN];
    entropy.fill(&mut nonce)?;
    Ok(nonce)
}

/// Lowercase hex, as stored in the key ring.
pub fn encode_key(key: &SymmetricKey) -> Zeroizing<String> {
    let bytes: &[u8; KEY_LEN] = key;
    Zeroizing::new(hex::encode(bytes))
}

/// `None` unless `encoded` is exactly `2 * KEY_LEN` hex characters.
pub fn decode_key(encoded: &str) -> Option<SymmetricKey> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let buf: &mut [u8; KEY_LEN] = &mut key;
    hex::decode_to_slice(encoded, buf).ok()?;
    Some(key)
}

/// Encrypts `plaintext` and returns `nonce || ciphertext || tag`.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, chacha20poly1305::aead::Error> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let ciphertext = cipher.encrypt(XNonce::from_slice(nonce), plaintext)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Reverses [`seal`]. `None` on a truncated blob or failed authentication.
pub fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .ok()
        .map(Zeroizing::new)
}

/// Atomic write readable by the owner only.
///
/// Each call writes through its own uniquely named temp file in the target
/// directory, so concurrent writers to one path never share a temp file.
pub fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // tempfile creates with 0600 on unix and removes the file if we bail out
    let mut tmp = tempfile::Builder::new()
        .prefix(".token_")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Creates `dir` (and missing parents) as owner-only. Existing directories are left as they are.
pub fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}
