// NODE ATTESTATIONS
// Signed statements a node makes about a transaction it has judged
//
// SAFETY INVARIANTS:
// 1. Both authorization and rejection sign `txid || domain`, binding the
//    verdict to one transaction and one node
// 2. A rejection's reason is the full "<Kind>: <message>" of the failure, so
//    peers can audit the verdict without re-running validation

use crate::error::ValidationError;
use crate::message::attestation_message;
use crate::transaction::{make_txid, Transaction};
use log::debug;
use serde::{Deserialize, Serialize};
use tally_crypto::{verify_signed_by, PrivateKey};

/// A node vouching that it accepted a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAuthorization {
    pub domain: String,
    pub signature: String,
}

/// A node's signed refusal of a transaction, with the reason it gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub domain: String,
    pub txid: String,
    pub signature: String,
    pub reason: String,
}

pub fn make_transaction_authorization(
    tx: &Transaction,
    domain: &str,
    key: &PrivateKey,
) -> TransactionAuthorization {
    let message = attestation_message(&make_txid(tx), domain);
    TransactionAuthorization {
        domain: domain.to_string(),
        signature: key.sign(message.as_bytes()),
    }
}

/// Check an authorization was signed by the node paid at `payout_address`.
pub fn validate_transaction_authorization(
    tx: &Transaction,
    auth: &TransactionAuthorization,
    payout_address: &str,
) -> Result<(), ValidationError> {
    let message = attestation_message(&make_txid(tx), &auth.domain);
    verify_signed_by(message.as_bytes(), &auth.signature, payout_address)
        .map_err(|e| ValidationError::from_signature_failure("Authorization signature", e))?;
    debug!("Authorization from {} verified", auth.domain);
    Ok(())
}

pub fn make_rejection(
    txid: &str,
    error: &ValidationError,
    domain: &str,
    key: &PrivateKey,
) -> Rejection {
    let message = attestation_message(txid, domain);
    Rejection {
        domain: domain.to_string(),
        txid: txid.to_string(),
        signature: key.sign(message.as_bytes()),
        reason: error.display(),
    }
}

pub fn validate_rejection(rejection: &Rejection, payout_address: &str) -> Result<(), ValidationError> {
    let message = attestation_message(&rejection.txid, &rejection.domain);
    verify_signed_by(message.as_bytes(), &rejection.signature, payout_address)
        .map_err(|e| ValidationError::from_signature_failure("Rejection signature", e))?;
    debug!("Rejection of {} by {} verified", rejection.txid, rejection.domain);
    Ok(())
}
