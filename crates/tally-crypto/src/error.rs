use thiserror::Error;

/// Failures raised by the identity layer.
///
/// Callers in the validation pipeline translate these into protocol error
/// kinds; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Malformed private key: {0}")]
    MalformedKey(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
}
