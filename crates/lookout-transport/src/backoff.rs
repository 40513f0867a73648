//! Reconnect backoff: a doubling delay with a ceiling.
//!
//! The event channel asks for [`Backoff::next_delay`] every time a
//! connection attempt fails (or an open stream drops) and calls
//! [`Backoff::reset`] as soon as a subscription opens. With the default
//! config the delays run `1, 2, 4, 8, 16, 32, 64, 64, ...` seconds.

use std::time::Duration;

use tracing::warn;

use crate::TransportError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Bounds for the reconnect delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay after the first failure, and the value restored on reset.
    pub initial: Duration,
    /// Ceiling the delay never exceeds. At most [`Self::MAX_CEILING`].
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(64),
        }
    }
}

impl BackoffConfig {
    /// Smallest initial delay accepted by [`Self::validate`].
    pub const MIN_INITIAL: Duration = Duration::from_secs(1);

    /// Largest ceiling accepted by [`Self::validate`].
    pub const MAX_CEILING: Duration = Duration::from_secs(64);

    /// Checks that `1s <= initial <= max <= 64s`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidConfig`] naming the offending field.
    pub fn validate(self) -> Result<Self, TransportError> {
        if self.initial < Self::MIN_INITIAL {
            return Err(TransportError::InvalidConfig(format!(
                "backoff initial delay {:?} is below {:?}",
                self.initial,
                Self::MIN_INITIAL
            )));
        }
        if self.max < self.initial {
            return Err(TransportError::InvalidConfig(format!(
                "backoff max {:?} is below initial {:?}",
                self.max, self.initial
            )));
        }
        if self.max > Self::MAX_CEILING {
            return Err(TransportError::InvalidConfig(format!(
                "backoff max {:?} is above {:?}",
                self.max,
                Self::MAX_CEILING
            )));
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Doubling reconnect delay, capped at [`BackoffConfig::max`].
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `config.initial`.
    ///
    /// An invalid config is not rejected here; out-of-range values are
    /// clamped (with a warning) so the delay always stays within
    /// `[MIN_INITIAL, MAX_CEILING]`. Use [`BackoffConfig::validate`] to
    /// reject them up front instead.
    pub fn new(config: BackoffConfig) -> Self {
        let config = match config.validate() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "clamping backoff config");
                let initial = config
                    .initial
                    .clamp(BackoffConfig::MIN_INITIAL, BackoffConfig::MAX_CEILING);
                BackoffConfig {
                    initial,
                    max: config.max.clamp(initial, BackoffConfig::MAX_CEILING),
                }
            }
        };
        Self {
            config,
            current: config.initial,
        }
    }

    /// Returns the delay to wait before the next attempt, then doubles
    /// the stored interval up to the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.config.max);
        delay
    }

    /// Restores the initial interval. Called on every successful connect.
    pub fn reset(&mut self) {
        self.current = self.config.initial;
    }

    /// The delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// The config this backoff was built from (after clamping).
    pub fn config(&self) -> BackoffConfig {
        self.config
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
