pub mod address;
pub mod error;
pub mod hashing;
pub mod identity;

pub use address::{is_p2pkh, p2pkh_address, validate_p2pkh};
pub use error::CryptoError;
pub use hashing::{double_sha256, sha256, sha256_hex};
pub use identity::{
    address_of, address_of_private_key, recover_pubkey, sign, verify, verify_signed_by,
    PrivateKey, PublicKey,
};
