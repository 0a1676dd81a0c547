use sha2::{Digest, Sha256};

/// SHA-256 of `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Lowercase hex SHA-256 of `data`. Every protocol hash (txid, seed,
/// shuffle key, ledger hash) is exchanged in this form.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(sha256(data))
}

/// SHA-256 applied twice, as used by Base58Check checksums and the
/// signed-message envelope.
pub fn double_sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    sha256(sha256(data))
}
