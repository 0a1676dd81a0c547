// PROTOCOL ERROR TAXONOMY
//
// Every validation failure is terminal for the object being checked: no
// partial acceptance, no retry inside the core. Kinds are flat tags; no kind
// is a specialisation of another.

use serde::{Deserialize, Serialize};
use tally_crypto::CryptoError;
use thiserror::Error;

/// Tag identifying the kind of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidTimestamp,
    ExpiredTimestamp,
    InvalidAddress,
    InvalidAmounts,
    InvalidFee,
    InvalidSignature,
    InvalidTransaction,
    InvalidObject,
    RejectedTransaction,
    PotentialDoubleSpend,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTimestamp => "InvalidTimestamp",
            ErrorKind::ExpiredTimestamp => "ExpiredTimestamp",
            ErrorKind::InvalidAddress => "InvalidAddress",
            ErrorKind::InvalidAmounts => "InvalidAmounts",
            ErrorKind::InvalidFee => "InvalidFee",
            ErrorKind::InvalidSignature => "InvalidSignature",
            ErrorKind::InvalidTransaction => "InvalidTransaction",
            ErrorKind::InvalidObject => "InvalidObject",
            ErrorKind::RejectedTransaction => "RejectedTransaction",
            ErrorKind::PotentialDoubleSpend => "PotentialDoubleSpend",
        }
    }
}

/// Why a transaction or protocol message was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Timestamp falls inside the closing window of its epoch
    #[error("InvalidTimestamp: {0}")]
    InvalidTimestamp(String),

    /// Timestamp is outside the propagation window around "now"
    #[error("ExpiredTimestamp: {0}")]
    ExpiredTimestamp(String),

    #[error("InvalidAddress: {0}")]
    InvalidAddress(String),

    /// Non-positive, over-precise or unbacked amounts
    #[error("InvalidAmounts: {0}")]
    InvalidAmounts(String),

    #[error("InvalidFee: {0}")]
    InvalidFee(String),

    #[error("InvalidSignature: {0}")]
    InvalidSignature(String),

    /// Input spent again before the previous spend propagated
    #[error("InvalidTransaction: {0}")]
    InvalidTransaction(String),

    /// Protocol message outside its validity window
    #[error("InvalidObject: {0}")]
    InvalidObject(String),

    #[error("RejectedTransaction: {0}")]
    RejectedTransaction(String),

    #[error("PotentialDoubleSpend: {0}")]
    PotentialDoubleSpend(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::InvalidTimestamp(_) => ErrorKind::InvalidTimestamp,
            ValidationError::ExpiredTimestamp(_) => ErrorKind::ExpiredTimestamp,
            ValidationError::InvalidAddress(_) => ErrorKind::InvalidAddress,
            ValidationError::InvalidAmounts(_) => ErrorKind::InvalidAmounts,
            ValidationError::InvalidFee(_) => ErrorKind::InvalidFee,
            ValidationError::InvalidSignature(_) => ErrorKind::InvalidSignature,
            ValidationError::InvalidTransaction(_) => ErrorKind::InvalidTransaction,
            ValidationError::InvalidObject(_) => ErrorKind::InvalidObject,
            ValidationError::RejectedTransaction(_) => ErrorKind::RejectedTransaction,
            ValidationError::PotentialDoubleSpend(_) => ErrorKind::PotentialDoubleSpend,
        }
    }

    /// Human-readable detail without the kind tag.
    pub fn message(&self) -> &str {
        match self {
            ValidationError::InvalidTimestamp(m)
            | ValidationError::ExpiredTimestamp(m)
            | ValidationError::InvalidAddress(m)
            | ValidationError::InvalidAmounts(m)
            | ValidationError::InvalidFee(m)
            | ValidationError::InvalidSignature(m)
            | ValidationError::InvalidTransaction(m)
            | ValidationError::InvalidObject(m)
            | ValidationError::RejectedTransaction(m)
            | ValidationError::PotentialDoubleSpend(m) => m,
        }
    }

    /// `"<Kind>: <message>"`, the reason string carried by rejections.
    pub fn display(&self) -> String {
        self.to_string()
    }

    /// Map an identity-layer failure on a signed object.
    pub fn from_signature_failure(what: &str, err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidAddress { address, reason } => {
                ValidationError::InvalidAddress(format!("{}: {}", address, reason))
            }
            other => ValidationError::InvalidSignature(format!("{} not valid: {}", what, other)),
        }
    }
}
