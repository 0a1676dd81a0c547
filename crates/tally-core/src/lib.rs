// === Network Parameters and Time ===
pub mod config;
pub mod clock;

// === Values and Errors ===
pub mod amount;
pub mod error;

// === Signed Objects ===
pub mod message;
pub mod transaction;
pub mod attestation;
pub mod registration;

// === External Ledger View ===
pub mod ledger;

// === Re-exports ===
pub use amount::{Amount, SIGNED_AMOUNT_DECIMALS};
pub use attestation::{
    make_rejection, make_transaction_authorization, validate_rejection,
    validate_transaction_authorization, Rejection, TransactionAuthorization,
};
pub use clock::{format_timestamp, parse_timestamp, EpochClock, TIMESTAMP_FORMAT};
pub use config::{ConfigError, NetworkConfig};
pub use error::{ErrorKind, ValidationError};
pub use ledger::{sort_ledger, LedgerEntry, LedgerOracle, MemoryLedger};
pub use registration::{make_peer_registration, validate_peer_registration, PeerRegistration};
pub use transaction::{
    make_transaction, make_transaction_at, make_txid, validate_transaction, SigningInput,
    Transaction, TxInput, TxOutput,
};
