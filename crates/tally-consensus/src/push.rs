// EPOCH HASH PUSH
// One node's signed claim of an epoch's hash matrix row, sent to one peer
//
// SAFETY INVARIANTS:
// 1. The signature covers from_domain || to_domain || concat(hashes) || epoch;
//    reordering or replacing any hash invalidates it
// 2. A fresh push is only accepted between its epoch's start and
//    start + push window; cited evidence skips that check

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tally_core::message::push_message;
use tally_core::{format_timestamp, EpochClock, NetworkConfig, ValidationError};
use tally_crypto::{verify_signed_by, PrivateKey};

/// Whether a push is checked against the push window.
#[derive(Debug, Clone, Copy)]
pub enum Expiry<'a> {
    Check {
        now: DateTime<Utc>,
        config: &'a NetworkConfig,
    },
    /// For pushes cited as evidence after the fact
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochHashPush {
    pub epoch: u64,
    pub from_domain: String,
    pub to_domain: String,
    pub hashes: Vec<String>,
    pub signature: String,
}

impl EpochHashPush {
    pub fn make(
        epoch: u64,
        from_domain: &str,
        to_domain: &str,
        from_key: &PrivateKey,
        hashes: Vec<String>,
    ) -> Self {
        let message = push_message(from_domain, to_domain, &hashes, epoch);
        EpochHashPush {
            epoch,
            from_domain: from_domain.to_string(),
            to_domain: to_domain.to_string(),
            signature: from_key.sign(message.as_bytes()),
            hashes,
        }
    }

    /// The signed body.
    pub fn message(&self) -> String {
        push_message(&self.from_domain, &self.to_domain, &self.hashes, self.epoch)
    }

    /// Check the push window (unless skipped) and that `payout_address`
    /// signed it.
    pub fn validate(&self, payout_address: &str, expiry: Expiry<'_>) -> Result<(), ValidationError> {
        if let Expiry::Check { now, config } = expiry {
            let clock = EpochClock::new(config);
            let window = clock
                .epoch_start(self.epoch)
                .and_then(|start| Some((start, clock.offset(start, config.push_window_seconds)?)));
            let (start, closes) = window.ok_or_else(|| {
                warn!("Push from {} names unreachable epoch {}", self.from_domain, self.epoch);
                ValidationError::InvalidObject(format!("Push epoch {} is out of range", self.epoch))
            })?;
            if now < start || now > closes {
                warn!(
                    "Push for epoch {} from {} outside its window ({} .. {})",
                    self.epoch,
                    self.from_domain,
                    format_timestamp(start),
                    format_timestamp(closes)
                );
                return Err(ValidationError::InvalidObject(format!(
                    "Push for epoch {} only accepted from {} to {}",
                    self.epoch,
                    format_timestamp(start),
                    format_timestamp(closes)
                )));
            }
        }

        verify_signed_by(self.message().as_bytes(), &self.signature, payout_address).map_err(|e| {
            warn!("Push from {} carries a bad signature: {}", self.from_domain, e);
            ValidationError::from_signature_failure("Push signature", e)
        })?;

        debug!("Push for epoch {} from {} verified", self.epoch, self.from_domain);
        Ok(())
    }
}
