use crate::phase::EpochPhase;
use thiserror::Error;

/// Failures of the epoch hashing machinery itself, as opposed to a peer's
/// object failing validation (those are `ValidationError`s).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("Ledger is empty; no entry can anchor the epoch seed")]
    EmptyLedger,

    #[error("Ledger snapshot reports {reported} entries but lists {listed}")]
    LedgerSnapshotMismatch { reported: usize, listed: usize },

    #[error("Invalid hash matrix shape: {0}")]
    InvalidMatrixShape(String),

    #[error("No authoritative hash among candidates: {0}")]
    NoAuthoritativeHash(String),

    #[error("Epoch {0} has no successor to push in")]
    EpochOutOfRange(u64),

    #[error("Illegal epoch phase transition {from:?} -> {to:?}")]
    IllegalTransition { from: EpochPhase, to: EpochPhase },
}
