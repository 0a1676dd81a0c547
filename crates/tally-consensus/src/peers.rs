use std::collections::{BTreeMap, HashMap};

/// Resolves a peer domain to the payout address that signs for it.
///
/// Registration bookkeeping lives outside the consensus layer; pushes and
/// penalizations only need this lookup.
pub trait PeerRegistry {
    fn payout_address(&self, domain: &str) -> Option<&str>;
}

impl PeerRegistry for HashMap<String, String> {
    fn payout_address(&self, domain: &str) -> Option<&str> {
        self.get(domain).map(String::as_str)
    }
}

impl PeerRegistry for BTreeMap<String, String> {
    fn payout_address(&self, domain: &str) -> Option<&str> {
        self.get(domain).map(String::as_str)
    }
}
