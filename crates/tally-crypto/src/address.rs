// P2PKH ADDRESSES
// Base58Check(version || RIPEMD160(SHA256(pubkey)))
//
// INVARIANTS:
// 1. Only version 0x00 (prefix "1") is a spendable address on this network
// 2. Script-hash addresses (version 0x05, prefix "3") are always rejected
// 3. The checksum is verified before the version byte is looked at

use crate::error::CryptoError;
use crate::hashing::sha256;
use secp256k1::hashes::{ripemd160, Hash};

/// Version byte of pay-to-pubkey-hash addresses.
pub const P2PKH_VERSION: u8 = 0x00;

/// Version byte of pay-to-script-hash addresses.
pub const P2SH_VERSION: u8 = 0x05;

const PAYLOAD_LEN: usize = 21;

/// HASH160 of a serialized public key.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160::Hash::hash(&sha256(data)).to_byte_array()
}

/// Encode a serialized public key as a P2PKH address.
pub fn p2pkh_address(pubkey: &[u8]) -> String {
    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.push(P2PKH_VERSION);
    payload.extend_from_slice(&hash160(pubkey));
    bs58::encode(payload).with_check().into_string()
}

/// Check that `address` is a well-formed, non-script-hash P2PKH address.
pub fn validate_p2pkh(address: &str) -> Result<(), CryptoError> {
    let invalid = |reason: &str| CryptoError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| invalid(&format!("not Base58Check: {}", e)))?;

    if payload.len() != PAYLOAD_LEN {
        return Err(invalid("wrong payload length"));
    }

    match payload[0] {
        P2PKH_VERSION => Ok(()),
        P2SH_VERSION => Err(invalid("script-hash addresses are not accepted")),
        other => Err(invalid(&format!("unknown version byte {:#04x}", other))),
    }
}

/// Boolean form of [`validate_p2pkh`].
pub fn is_p2pkh(address: &str) -> bool {
    validate_p2pkh(address).is_ok()
}
