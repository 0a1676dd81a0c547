// TALLY NODE CORE
// Facade over the identity, validation and consensus crates, plus the
// end-of-epoch routine that turns a closed epoch into per-peer pushes.

pub use tally_consensus;
pub use tally_core;
pub use tally_crypto;

use log::info;
use tally_consensus::{
    epoch_seed_from_oracle, legit_hash, ConsensusError, DecoySet, EpochHashPush, HashMatrix,
    DEFAULT_MINI_HASH_LIMIT,
};
use tally_core::LedgerOracle;
use tally_crypto::PrivateKey;

/// Everything a node derives locally once an epoch has closed.
#[derive(Debug, Clone)]
pub struct EpochOutcome {
    /// The epoch that was hashed
    pub epoch: u64,
    /// The epoch the pushes are stamped with and sent in
    pub push_epoch: u64,
    pub seed: String,
    pub legit_hash: String,
    pub pushes: Vec<EpochHashPush>,
}

/// Derive the epoch seed and ledger hash, hide the hash among decoys and
/// sign one matrix row for each peer in `peer_domains`.
///
/// Hashing only starts once `epoch` has ended, so the pushes are stamped with
/// `epoch + 1` and fall inside that epoch's push window.
pub fn close_epoch<F>(
    epoch: u64,
    txids: &[String],
    ledger: &dyn LedgerOracle,
    lucky_fn: F,
    from_domain: &str,
    key: &PrivateKey,
    peer_domains: &[&str],
) -> Result<EpochOutcome, ConsensusError>
where
    F: Fn(u32) -> String,
{
    let push_epoch = epoch.checked_add(1).ok_or(ConsensusError::EpochOutOfRange(epoch))?;
    let seed = epoch_seed_from_oracle(txids.len() as u64, ledger)?;
    let hash = legit_hash(txids, epoch, lucky_fn);

    let set = DecoySet::build(&hash, &seed, DEFAULT_MINI_HASH_LIMIT);
    let rows = HashMatrix::build(&set, &seed, peer_domains.len().max(1))?;

    let pushes = peer_domains
        .iter()
        .enumerate()
        .map(|(i, to)| -> Result<EpochHashPush, ConsensusError> {
            let row = rows
                .row_for(i)
                .ok_or_else(|| ConsensusError::InvalidMatrixShape("matrix has no rows".to_string()))?;
            Ok(EpochHashPush::make(push_epoch, from_domain, to, key, row.to_vec()))
        })
        .collect::<Result<Vec<_>, ConsensusError>>()?;

    info!("Epoch {} closed by {}: {} pushes prepared", epoch, from_domain, pushes.len());
    Ok(EpochOutcome {
        epoch,
        push_epoch,
        seed,
        legit_hash: hash,
        pushes,
    })
}
