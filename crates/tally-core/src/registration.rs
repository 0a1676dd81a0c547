use crate::clock::{format_timestamp, parse_timestamp, EpochClock};
use crate::config::NetworkConfig;
use crate::error::ValidationError;
use crate::message::registration_message;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tally_crypto::{verify_signed_by, PrivateKey};

/// A node announcing the payout address that signs on behalf of its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRegistration {
    pub domain: String,
    pub payout_address: String,
    pub timestamp: String,
    pub signature: String,
}

pub fn make_peer_registration(key: &PrivateKey, domain: &str, now: DateTime<Utc>) -> PeerRegistration {
    let payout_address = key.address();
    let timestamp = format_timestamp(now);
    let message = registration_message(domain, &payout_address, &timestamp);
    PeerRegistration {
        domain: domain.to_string(),
        signature: key.sign(message.as_bytes()),
        payout_address,
        timestamp,
    }
}

/// Timestamp must pass the clock rules; the signature must come from the
/// registered payout address.
pub fn validate_peer_registration(
    reg: &PeerRegistration,
    now: DateTime<Utc>,
    config: &NetworkConfig,
) -> Result<(), ValidationError> {
    let result = check_registration(reg, now, config);
    match &result {
        Ok(()) => debug!("Registration of {} as {} accepted", reg.domain, reg.payout_address),
        Err(e) => warn!("Registration of {} rejected: {}", reg.domain, e),
    }
    result
}

fn check_registration(
    reg: &PeerRegistration,
    now: DateTime<Utc>,
    config: &NetworkConfig,
) -> Result<(), ValidationError> {
    let ts = parse_timestamp(&reg.timestamp)?;
    EpochClock::new(config).validate_timestamp(ts, now)?;

    let message = registration_message(&reg.domain, &reg.payout_address, &reg.timestamp);
    verify_signed_by(message.as_bytes(), &reg.signature, &reg.payout_address)
        .map_err(|e| ValidationError::from_signature_failure("Registration signature", e))
}
