// EPOCH PHASES
// Per-node lifecycle of one epoch, from accepting transactions to agreeing
// (or not) with peers on its ledger hash
//
// SAFETY INVARIANTS:
// 1. Open -> Closing -> Hashing -> Pushed -> Reconciled | Disputed; nothing
//    moves backwards and terminal phases never change
// 2. Open and Closing are a function of the clock; hashing cannot begin until
//    the epoch has ended
// 3. Illegal moves return an error and leave the round untouched

use crate::error::ConsensusError;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_core::EpochClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpochPhase {
    /// Accepting transactions
    Open,
    /// Closing-window guard active
    Closing,
    /// Local hash and matrix computed
    Hashing,
    /// Matrix rows sent to peers
    Pushed,
    Reconciled,
    /// Mismatch found; penalization follows
    Disputed,
}

impl EpochPhase {
    /// Phase the clock alone puts `epoch` in at `now`.
    pub fn at(clock: &EpochClock<'_>, epoch: u64, now: DateTime<Utc>) -> EpochPhase {
        // an epoch ending past the calendar never ends
        let before_end = clock.epoch_range(epoch).map_or(true, |(_, end)| now < end);
        if before_end && !(clock.epoch_number(now) == epoch && clock.in_closing_window(now)) {
            EpochPhase::Open
        } else {
            EpochPhase::Closing
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EpochPhase::Reconciled | EpochPhase::Disputed)
    }

    pub fn accepts_transactions(&self) -> bool {
        matches!(self, EpochPhase::Open)
    }
}

impl fmt::Display for EpochPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One node's progress through a single epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRound {
    epoch: u64,
    phase: EpochPhase,
    legit_hash: Option<String>,
}

impl EpochRound {
    pub fn new(epoch: u64) -> Self {
        EpochRound {
            epoch,
            phase: EpochPhase::Open,
            legit_hash: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> EpochPhase {
        self.phase
    }

    /// The local ledger hash, once computed.
    pub fn legit_hash(&self) -> Option<&str> {
        self.legit_hash.as_deref()
    }

    fn transition(&mut self, allowed_from: &[EpochPhase], to: EpochPhase) -> Result<(), ConsensusError> {
        if !allowed_from.contains(&self.phase) {
            return Err(ConsensusError::IllegalTransition { from: self.phase, to });
        }
        debug!("Epoch {}: {} -> {}", self.epoch, self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Move Open to Closing once the clock says so. Returns the current phase.
    pub fn tick(&mut self, clock: &EpochClock<'_>, now: DateTime<Utc>) -> EpochPhase {
        if self.phase == EpochPhase::Open && EpochPhase::at(clock, self.epoch, now) == EpochPhase::Closing {
            debug!("Epoch {}: closing", self.epoch);
            self.phase = EpochPhase::Closing;
        }
        self.phase
    }

    /// Record the local ledger hash. Only after the epoch has ended.
    pub fn hashed(
        &mut self,
        clock: &EpochClock<'_>,
        now: DateTime<Utc>,
        legit_hash: String,
    ) -> Result<(), ConsensusError> {
        self.tick(clock, now);
        let ended = clock.epoch_range(self.epoch).map_or(false, |(_, end)| now >= end);
        if !ended {
            return Err(ConsensusError::IllegalTransition {
                from: self.phase,
                to: EpochPhase::Hashing,
            });
        }
        self.transition(&[EpochPhase::Closing], EpochPhase::Hashing)?;
        info!("Epoch {} hashed: {}", self.epoch, legit_hash);
        self.legit_hash = Some(legit_hash);
        Ok(())
    }

    pub fn pushed(&mut self) -> Result<(), ConsensusError> {
        self.transition(&[EpochPhase::Hashing], EpochPhase::Pushed)
    }

    pub fn reconciled(&mut self) -> Result<(), ConsensusError> {
        self.transition(&[EpochPhase::Pushed], EpochPhase::Reconciled)?;
        info!("Epoch {} reconciled with peers", self.epoch);
        Ok(())
    }

    /// A peer disagreed, possibly before our own pushes went out.
    pub fn disputed(&mut self) -> Result<(), ConsensusError> {
        self.transition(&[EpochPhase::Hashing, EpochPhase::Pushed], EpochPhase::Disputed)?;
        info!("Epoch {} disputed", self.epoch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{parse_timestamp, NetworkConfig};

    fn at(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_phase_from_clock() {
        let config = NetworkConfig::default();
        let clock = EpochClock::new(&config);

        assert_eq!(EpochPhase::at(&clock, 2067, at("2019-02-28T18:30:04")), EpochPhase::Open);
        assert_eq!(EpochPhase::at(&clock, 2067, at("2019-02-28T18:39:50")), EpochPhase::Open);
        assert_eq!(EpochPhase::at(&clock, 2067, at("2019-02-28T18:39:51")), EpochPhase::Closing);
        assert_eq!(EpochPhase::at(&clock, 2067, at("2019-02-28T18:40:05")), EpochPhase::Closing);
        // a future epoch is still open
        assert_eq!(EpochPhase::at(&clock, 2068, at("2019-02-28T18:39:55")), EpochPhase::Open);
    }

    #[test]
    fn test_full_round() {
        let config = NetworkConfig::default();
        let clock = EpochClock::new(&config);
        let mut round = EpochRound::new(2067);

        assert_eq!(round.tick(&clock, at("2019-02-28T18:35:00")), EpochPhase::Open);
        assert_eq!(round.tick(&clock, at("2019-02-28T18:39:55")), EpochPhase::Closing);
        round.hashed(&clock, at("2019-02-28T18:40:01"), "abcd".to_string()).unwrap();
        assert_eq!(round.legit_hash(), Some("abcd"));
        round.pushed().unwrap();
        round.reconciled().unwrap();
        assert!(round.phase().is_terminal());
        assert!(round.disputed().is_err());
    }

    #[test]
    fn test_hashing_waits_for_epoch_end() {
        let config = NetworkConfig::default();
        let clock = EpochClock::new(&config);
        let mut round = EpochRound::new(2067);

        let err = round.hashed(&clock, at("2019-02-28T18:39:55"), "abcd".to_string()).unwrap_err();
        assert_eq!(
            err,
            ConsensusError::IllegalTransition { from: EpochPhase::Closing, to: EpochPhase::Hashing }
        );
        assert_eq!(round.legit_hash(), None);

        // skipping straight past the close still works
        let mut late = EpochRound::new(2067);
        late.hashed(&clock, at("2019-02-28T18:41:00"), "abcd".to_string()).unwrap();
        assert_eq!(late.phase(), EpochPhase::Hashing);
    }

    #[test]
    fn test_illegal_moves() {
        let mut round = EpochRound::new(7);
        assert_eq!(
            round.pushed(),
            Err(ConsensusError::IllegalTransition { from: EpochPhase::Open, to: EpochPhase::Pushed })
        );
        assert!(round.reconciled().is_err());
        assert_eq!(round.phase(), EpochPhase::Open);
    }

    #[test]
    fn test_dispute_before_push() {
        let config = NetworkConfig::default();
        let clock = EpochClock::new(&config);
        let mut round = EpochRound::new(0);
        round.hashed(&clock, at("2019-02-14T10:10:00"), "abcd".to_string()).unwrap();
        round.disputed().unwrap();
        assert_eq!(round.phase(), EpochPhase::Disputed);
        assert!(!round.phase().accepts_transactions());
    }
}
