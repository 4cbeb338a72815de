use crate::error::{Result, StaggerError};
use std::time::Duration;

/// Upper bound accepted for `max_interval_factor`.
const FACTOR_LIMIT: u32 = 20;

/// Tuning knobs of the adaptive window.
///
/// The defaults give a 100ms finest window, doubling up to 25.6s, and shed
/// one doubling per full second of silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggerOptions {
    pub base_interval: Duration,
    pub max_interval_factor: u32,
    pub cooldown: Duration,
}

impl Default for StaggerOptions {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            max_interval_factor: 9,
            cooldown: Duration::from_millis(1000),
        }
    }
}

impl StaggerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.base_interval.is_zero() {
            return Err(StaggerError::InvalidOptions("base_interval must be non-zero"));
        }
        if self.cooldown.is_zero() {
            return Err(StaggerError::InvalidOptions("cooldown must be non-zero"));
        }
        if !(1..=FACTOR_LIMIT).contains(&self.max_interval_factor) {
            return Err(StaggerError::InvalidOptions(
                "max_interval_factor must be within 1..=20",
            ));
        }
        Ok(())
    }

    /// Clamps a factor into `[1, max_interval_factor]`.
    #[inline]
    pub fn clamp_factor(&self, factor: u32) -> u32 {
        factor.clamp(1, self.max_interval_factor.clamp(1, FACTOR_LIMIT))
    }

    /// Window length for `factor`: `base_interval * 2^(factor - 1)`.
    pub fn interval_for(&self, factor: u32) -> Duration {
        let factor = self.clamp_factor(factor);
        self.base_interval.saturating_mul(1u32 << (factor - 1))
    }
}
