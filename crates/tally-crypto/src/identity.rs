// NODE & WALLET IDENTITY
// secp256k1 keys with recoverable message signatures
//
// SAFETY INVARIANTS:
// 1. Signatures commit to the double-SHA-256 of the signed-message envelope,
//    never to the raw message bytes
// 2. The header byte records the recovery id and whether the signer's address
//    was derived from the compressed public key
// 3. Verification always recovers the key from the signature; no caller ever
//    supplies a public key it received over the wire

use crate::address::p2pkh_address;
use crate::error::CryptoError;
use crate::hashing::double_sha256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use std::fmt;

const MESSAGE_MAGIC: &[u8] = b"\x18Bitcoin Signed Message:\n";
const WIF_VERSION: u8 = 0x80;
const WIF_COMPRESSED_FLAG: u8 = 0x01;
const HEADER_BASE: u8 = 27;
const HEADER_COMPRESSED: u8 = 4;
const SIGNATURE_LEN: usize = 65;

/// A signing key plus the compression flag that fixes which address it owns.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: SecretKey,
    compressed: bool,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .field("compressed", &self.compressed)
            .finish()
    }
}

impl PrivateKey {
    /// Fresh random key (compressed).
    pub fn generate() -> Self {
        PrivateKey {
            secret: SecretKey::new(&mut rand::thread_rng()),
            compressed: true,
        }
    }

    pub fn from_bytes(bytes: &[u8], compressed: bool) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
        Ok(PrivateKey { secret, compressed })
    }

    /// Parse a Wallet Import Format key.
    pub fn from_wif(wif: &str) -> Result<Self, CryptoError> {
        let payload = bs58::decode(wif)
            .with_check(Some(WIF_VERSION))
            .into_vec()
            .map_err(|e| CryptoError::MalformedKey(format!("bad WIF encoding: {}", e)))?;

        match payload.len() {
            33 => Self::from_bytes(&payload[1..33], false),
            34 if payload[33] == WIF_COMPRESSED_FLAG => Self::from_bytes(&payload[1..33], true),
            _ => Err(CryptoError::MalformedKey("bad WIF payload".to_string())),
        }
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.secret.secret_bytes());
        if self.compressed {
            payload.push(WIF_COMPRESSED_FLAG);
        }
        bs58::encode(payload).with_check().into_string()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::signing_only();
        PublicKey {
            inner: secp256k1::PublicKey::from_secret_key(&secp, &self.secret),
            compressed: self.compressed,
        }
    }

    pub fn address(&self) -> String {
        self.public_key().address()
    }

    /// Sign `message` and return the base64 recoverable signature.
    pub fn sign(&self, message: &[u8]) -> String {
        let secp = Secp256k1::signing_only();
        let digest = Message::from_digest(signed_message_digest(message));
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&digest, &self.secret)
            .serialize_compact();

        let mut header = HEADER_BASE + recovery_id.to_i32() as u8;
        if self.compressed {
            header += HEADER_COMPRESSED;
        }

        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        bytes.push(header);
        bytes.extend_from_slice(&compact);
        STANDARD.encode(bytes)
    }
}

/// A public key carrying the serialization its address is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
    compressed: bool,
}

impl PublicKey {
    pub fn serialize(&self) -> Vec<u8> {
        if self.compressed {
            self.inner.serialize().to_vec()
        } else {
            self.inner.serialize_uncompressed().to_vec()
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    pub fn address(&self) -> String {
        p2pkh_address(&self.serialize())
    }
}

/// Double-SHA-256 of the signed-message envelope around `message`.
fn signed_message_digest(message: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(MESSAGE_MAGIC.len() + 9 + message.len());
    buf.extend_from_slice(MESSAGE_MAGIC);
    write_varint(&mut buf, message.len() as u64);
    buf.extend_from_slice(message);
    double_sha256(buf)
}

fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn decode_signature(signature: &str) -> Result<(RecoverableSignature, bool), CryptoError> {
    let bytes = STANDARD
        .decode(signature.trim())
        .map_err(|e| CryptoError::MalformedSignature(format!("not base64: {}", e)))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(CryptoError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        )));
    }

    let header = bytes[0];
    if !(HEADER_BASE..HEADER_BASE + 8).contains(&header) {
        return Err(CryptoError::MalformedSignature(format!(
            "bad header byte {}",
            header
        )));
    }
    let compressed = header >= HEADER_BASE + HEADER_COMPRESSED;
    let recovery_id = RecoveryId::from_i32(((header - HEADER_BASE) & 3) as i32)
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let sig = RecoverableSignature::from_compact(&bytes[1..], recovery_id)
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    Ok((sig, compressed))
}

/// Sign `message` with `key`.
pub fn sign(message: &[u8], key: &PrivateKey) -> String {
    key.sign(message)
}

/// Recover the public key that produced `signature` over `message`.
pub fn recover_pubkey(message: &[u8], signature: &str) -> Result<PublicKey, CryptoError> {
    let (sig, compressed) = decode_signature(signature)?;
    let secp = Secp256k1::verification_only();
    let digest = Message::from_digest(signed_message_digest(message));
    let inner = secp
        .recover_ecdsa(&digest, &sig)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(PublicKey { inner, compressed })
}

/// Check `signature` over `message` against `pubkey`.
pub fn verify(message: &[u8], signature: &str, pubkey: &PublicKey) -> bool {
    let sig = match decode_signature(signature) {
        Ok((sig, _)) => sig,
        Err(_) => return false,
    };
    let secp = Secp256k1::verification_only();
    let digest = Message::from_digest(signed_message_digest(message));
    secp.verify_ecdsa(&digest, &sig.to_standard(), &pubkey.inner).is_ok()
}

pub fn address_of(pubkey: &PublicKey) -> String {
    pubkey.address()
}

pub fn address_of_private_key(key: &PrivateKey) -> String {
    key.address()
}

/// Recover the signer of `message` and require it to own `address`.
///
/// This is the single check every signed protocol object goes through.
pub fn verify_signed_by(message: &[u8], signature: &str, address: &str) -> Result<(), CryptoError> {
    let pubkey = recover_pubkey(message, signature)?;
    if pubkey.address() != address {
        log::debug!("signature recovered to {} but {} was claimed", pubkey.address(), address);
        return Err(CryptoError::RecoveryFailed(format!(
            "signing key does not match address {}",
            address
        )));
    }
    if !verify(message, signature, &pubkey) {
        return Err(CryptoError::RecoveryFailed("signature does not verify".to_string()));
    }
    Ok(())
}
