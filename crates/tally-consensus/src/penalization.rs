// NODE PENALIZATION
// Signed accusations that a peer pushed a wrong epoch hash, or none at all
//
// SAFETY INVARIANTS:
// 1. An accusation citing a push carries that push verbatim; the cited push
//    must itself verify against its sender's payout address
// 2. Cited pushes are evidence and are never rejected for being stale
// 3. The accuser signs real_hash || reason, so the claimed real hash cannot be
//    swapped after the fact

use crate::peers::PeerRegistry;
use crate::push::{EpochHashPush, Expiry};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tally_core::message::{penalization_message, push_reason, NO_PUSH_REASON};
use tally_core::ValidationError;
use tally_crypto::{verify_signed_by, PrivateKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePenalization {
    pub epoch: u64,
    pub real_hash: String,
    /// The offending push, or `None` when the peer never pushed
    pub wrong: Option<EpochHashPush>,
    pub signature: String,
}

impl NodePenalization {
    pub fn make(
        epoch: u64,
        real_hash: &str,
        wrong: Option<EpochHashPush>,
        accuser_key: &PrivateKey,
    ) -> Self {
        let reason = reason_for(wrong.as_ref());
        let signature = accuser_key.sign(penalization_message(real_hash, &reason).as_bytes());

        match &wrong {
            Some(push) => info!(
                "Penalization issued for epoch {}: {} pushed a wrong hash",
                epoch, push.from_domain
            ),
            None => info!("Penalization issued for epoch {}: missing push", epoch),
        }

        NodePenalization {
            epoch,
            real_hash: real_hash.to_string(),
            wrong,
            signature,
        }
    }

    /// The cited push rendered with its signature, or the no-push sentinel.
    pub fn reason(&self) -> String {
        reason_for(self.wrong.as_ref())
    }

    pub fn message(&self) -> String {
        penalization_message(&self.real_hash, &self.reason())
    }

    /// Domain of the accused node, when a push is cited.
    pub fn accused_domain(&self) -> Option<&str> {
        self.wrong.as_ref().map(|p| p.from_domain.as_str())
    }

    /// Verify the cited push (signature only) against its sender's payout
    /// address from `peers`, then the accusation against `accuser_address`.
    pub fn validate<P>(&self, accuser_address: &str, peers: &P) -> Result<(), ValidationError>
    where
        P: PeerRegistry + ?Sized,
    {
        if let Some(push) = &self.wrong {
            let sender = peers.payout_address(&push.from_domain).ok_or_else(|| {
                warn!("Penalization cites a push from unregistered peer {}", push.from_domain);
                ValidationError::InvalidSignature(format!(
                    "No payout address registered for {}",
                    push.from_domain
                ))
            })?;
            push.validate(sender, Expiry::Skip)?;
        }

        verify_signed_by(self.message().as_bytes(), &self.signature, accuser_address).map_err(|e| {
            warn!("Penalization for epoch {} carries a bad signature: {}", self.epoch, e);
            ValidationError::from_signature_failure("Penalization signature", e)
        })?;

        debug!("Penalization for epoch {} verified", self.epoch);
        Ok(())
    }
}

fn reason_for(wrong: Option<&EpochHashPush>) -> String {
    match wrong {
        Some(push) => push_reason(
            &push.from_domain,
            &push.to_domain,
            &push.hashes,
            push.epoch,
            &push.signature,
        ),
        None => NO_PUSH_REASON.to_string(),
    }
}
