//! Token file naming
//!
//! `token_<hex(sha256(namespace + "-" + name)[..16])>.bin`: deterministic per
//! slot and opaque, so a directory listing reveals nothing about which
//! credentials are stored.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub const TOKEN_FILE_PREFIX: &str = "token_";
pub const TOKEN_FILE_SUFFIX: &str = ".bin";

/// Bytes of the digest kept in the file name
const NAME_DIGEST_LEN: usize = 16;

pub fn token_file_name(namespace: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"-");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();

    format!(
        "{}{}{}",
        TOKEN_FILE_PREFIX,
        hex::encode(&digest[..NAME_DIGEST_LEN]),
        TOKEN_FILE_SUFFIX
    )
}

pub fn token_path(dir: &Path, namespace: &str, name: &str) -> PathBuf {
    dir.join(token_file_name(namespace, name))
}
