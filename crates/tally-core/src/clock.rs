// EPOCH CLOCK
// Wall-clock time to fixed-length epochs since genesis
//
// SAFETY INVARIANTS:
// 1. Epoch numbers are a pure function of (time, genesis, epoch length), so all
//    correctly-clocked nodes agree on every boundary
// 2. No timestamp inside the closing window of its epoch is valid; consensus
//    hashing for that epoch is about to start
// 3. Expiry is data: every check compares against a caller-supplied "now"

use crate::config::NetworkConfig;
use crate::error::ValidationError;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Format used for timestamps this node creates.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Render a timestamp the way it is embedded in signed objects.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| ValidationError::InvalidTimestamp(format!("unparseable timestamp {:?}: {}", raw, e)))
}

/// Epoch arithmetic over one network configuration.
#[derive(Debug, Clone, Copy)]
pub struct EpochClock<'a> {
    config: &'a NetworkConfig,
}

impl<'a> EpochClock<'a> {
    pub fn new(config: &'a NetworkConfig) -> Self {
        EpochClock { config }
    }

    pub fn config(&self) -> &NetworkConfig {
        self.config
    }

    fn seconds(secs: u64) -> Option<Duration> {
        i64::try_from(secs).ok().and_then(Duration::try_seconds)
    }

    /// Epoch containing `t`. Instants before genesis belong to epoch 0.
    pub fn epoch_number(&self, t: DateTime<Utc>) -> u64 {
        let delta = t.signed_duration_since(self.config.genesis);
        if delta < Duration::zero() {
            return 0;
        }
        delta.num_seconds() as u64 / self.config.epoch_length_seconds
    }

    /// `(start, end)` of epoch `n`; `end` is the start of epoch `n + 1`.
    /// `None` when either bound falls outside the representable calendar.
    pub fn epoch_range(&self, n: u64) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let offset = self.config.epoch_length_seconds.checked_mul(n)?;
        let start = self.config.genesis.checked_add_signed(Self::seconds(offset)?)?;
        let end = start.checked_add_signed(Self::seconds(self.config.epoch_length_seconds)?)?;
        Some((start, end))
    }

    pub fn epoch_start(&self, n: u64) -> Option<DateTime<Utc>> {
        self.epoch_range(n).map(|(start, _)| start)
    }

    /// `t` shifted by `secs`, if representable.
    pub fn offset(&self, t: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
        t.checked_add_signed(Self::seconds(secs)?)
    }

    /// Seconds from `t` until the next epoch boundary, in `(0, epoch_length]`.
    pub fn seconds_to_next_epoch(&self, t: DateTime<Utc>) -> f64 {
        let length = self.config.epoch_length_seconds as f64;
        let elapsed = match t.signed_duration_since(self.config.genesis).num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => t.signed_duration_since(self.config.genesis).num_seconds() as f64,
        };
        length - elapsed.rem_euclid(length)
    }

    /// True while `t` lies in the closing window of its epoch.
    pub fn in_closing_window(&self, t: DateTime<Utc>) -> bool {
        self.seconds_to_next_epoch(t) < self.config.epoch_closing_seconds as f64
    }

    /// Check a timestamp against the closing guard and the propagation window.
    pub fn validate_timestamp(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.in_closing_window(ts) {
            return Err(ValidationError::InvalidTimestamp(format!(
                "{} is within the closing interval of epoch {}",
                format_timestamp(ts),
                self.epoch_number(ts)
            )));
        }

        let window = Duration::seconds(self.config.propagation_window_seconds as i64);
        let drift = now.signed_duration_since(ts);
        if drift > window || drift < -window {
            return Err(ValidationError::ExpiredTimestamp(format!(
                "Propagation window exceeded: {} is {}ms from now",
                format_timestamp(ts),
                drift.num_milliseconds()
            )));
        }
        Ok(())
    }
}
