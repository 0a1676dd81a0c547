// EPOCH LEDGER-HASH CONSENSUS
// Seed derivation, mini-hash chains, the legitimate ledger hash and the
// decoy matrix that hides it on the wire
//
// SAFETY INVARIANTS:
// 1. The seed depends on the epoch's transaction count, which is unknown until
//    the epoch closes, so it cannot be ground in advance
// 2. Every value here is a pure function of ledger state all honest nodes
//    share; no randomness, no clock
// 3. Exactly one candidate in a decoy set is not produced by the seed's hash
//    chain, and only a seed holder can tell which

use crate::error::ConsensusError;
use crate::shuffle::{matrix, shuffle};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tally_core::{LedgerEntry, LedgerOracle};
use tally_crypto::{sha256, sha256_hex};

pub const DEFAULT_MINI_HASH_LIMIT: usize = 5;

/// Hex characters kept from each hash that goes on the wire.
pub const SHORT_HASH_LEN: usize = 8;

fn short(hash: &str) -> String {
    hash.chars().take(SHORT_HASH_LEN).collect()
}

/// Seed for an epoch, anchored on the ledger entry at
/// `epoch_tx_count mod ledger_size` of the (amount, address)-sorted ledger.
pub fn epoch_seed<E, F>(
    epoch_tx_count: u64,
    ledger_size: usize,
    sorted_ledger: &[E],
    address_of: F,
) -> Result<String, ConsensusError>
where
    F: Fn(&E) -> String,
{
    if ledger_size == 0 {
        return Err(ConsensusError::EmptyLedger);
    }
    if ledger_size != sorted_ledger.len() {
        return Err(ConsensusError::LedgerSnapshotMismatch {
            reported: ledger_size,
            listed: sorted_ledger.len(),
        });
    }

    let index = (epoch_tx_count % ledger_size as u64) as usize;
    let anchor = address_of(&sorted_ledger[index]);
    debug!("Epoch seed anchored on ledger entry {} ({})", index, anchor);
    Ok(sha256_hex(format!("{}{}", epoch_tx_count, anchor)))
}

/// [`epoch_seed`] over a ledger oracle snapshot.
pub fn epoch_seed_from_oracle(
    epoch_tx_count: u64,
    ledger: &dyn LedgerOracle,
) -> Result<String, ConsensusError> {
    let entries = ledger.sorted_ledger();
    let seed = epoch_seed(epoch_tx_count, ledger.ledger_size(), &entries, |e: &LedgerEntry| {
        e.address.clone()
    })?;
    info!("Epoch seed derived from {} ledger entries: {}", entries.len(), seed);
    Ok(seed)
}

/// Forward hash chain from `seed`: each link is the SHA-256 of the previous
/// full link, truncated to [`SHORT_HASH_LEN`] characters on output.
pub fn mini_hashes(seed: &str, limit: usize) -> Vec<String> {
    let mut current = seed.to_string();
    let mut out = Vec::with_capacity(limit);
    for _ in 0..limit {
        current = sha256_hex(&current);
        out.push(short(&current));
    }
    out
}

/// First four bytes, big-endian, of the hash of the lowest txid. An epoch
/// without transactions hashes the empty string.
pub fn lucky_number(txids: &[String]) -> u32 {
    let lowest = txids.iter().min().map(String::as_str).unwrap_or("");
    let digest = sha256(lowest);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// The real ledger hash for an epoch.
///
/// `lucky_fn` maps the lucky number to the hash of the ledger-weighted draw;
/// it is supplied by the ledger layer.
pub fn legit_hash<F>(txids: &[String], epoch: u64, lucky_fn: F) -> String
where
    F: Fn(u32) -> String,
{
    let mut sorted: Vec<&str> = txids.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let lucky_hash = lucky_fn(lucky_number(txids));
    sha256_hex(format!("{}{}{}", sorted.concat(), epoch, lucky_hash))
}

/// The real short hash hidden among seed-derived decoys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoySet {
    candidates: Vec<String>,
}

impl DecoySet {
    /// `decoys` chain hashes plus the truncated `legit_hash`, permuted by `seed`.
    pub fn build(legit_hash: &str, seed: &str, decoys: usize) -> Self {
        let mut candidates = mini_hashes(seed, decoys);
        candidates.push(short(legit_hash));
        let candidates = shuffle(&candidates, seed, 0);
        debug!("Decoy set built with {} candidates", candidates.len());
        DecoySet { candidates }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn into_candidates(self) -> Vec<String> {
        self.candidates
    }

    /// The one candidate a holder of `seed` recognises as not being a decoy.
    pub fn reveal(candidates: &[String], seed: &str, decoys: usize) -> Result<String, ConsensusError> {
        let chain = mini_hashes(seed, decoys);
        let mut real = candidates.iter().filter(|c| !chain.contains(c));

        match (real.next(), real.next()) {
            (Some(hash), None) => Ok(hash.clone()),
            (None, _) => Err(ConsensusError::NoAuthoritativeHash(
                "every candidate is a decoy".to_string(),
            )),
            (Some(_), Some(_)) => Err(ConsensusError::NoAuthoritativeHash(
                "more than one candidate is off the seed chain".to_string(),
            )),
        }
    }
}

/// Per-peer rows of the decoy set, each a distinct seed-keyed permutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashMatrix {
    rows: Vec<Vec<String>>,
}

impl HashMatrix {
    pub fn build(set: &DecoySet, seed: &str, rows: usize) -> Result<Self, ConsensusError> {
        if rows == 0 {
            return Err(ConsensusError::InvalidMatrixShape("at least one row is required".to_string()));
        }
        let width = set.candidates().len() as u64;
        let rows = matrix(set.candidates(), seed, width, rows)?;
        info!("Hash matrix built: {} rows of {} hashes", rows.len(), width);
        Ok(HashMatrix { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Row pushed to the peer at `peer_index`; indices wrap. `None` only for
    /// a matrix decoded without rows.
    pub fn row_for(&self, peer_index: usize) -> Option<&[String]> {
        let row = peer_index.checked_rem(self.rows.len())?;
        self.rows.get(row).map(Vec::as_slice)
    }
}
