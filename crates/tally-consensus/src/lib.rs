// === Permutation and Epoch Hashing ===
pub mod shuffle;
pub mod epoch_hash;

// === Peer Messages ===
pub mod push;
pub mod penalization;
pub mod peers;

// === Epoch Lifecycle ===
pub mod phase;
pub mod error;

// === Re-exports ===
pub use epoch_hash::{
    epoch_seed, epoch_seed_from_oracle, legit_hash, lucky_number, mini_hashes, DecoySet,
    HashMatrix, DEFAULT_MINI_HASH_LIMIT, SHORT_HASH_LEN,
};
pub use error::ConsensusError;
pub use penalization::NodePenalization;
pub use peers::PeerRegistry;
pub use phase::{EpochPhase, EpochRound};
pub use push::{EpochHashPush, Expiry};
pub use shuffle::{matrix, row_parameter, shuffle, shuffle_by};
