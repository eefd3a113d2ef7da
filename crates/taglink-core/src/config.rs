//! Tag configuration.
//!
//! Every tuning constant of the control loop lives here, resolved once at
//! construction rather than baked into the build. Defaults match the
//! reference hardware build.

use crate::quality::QualityPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Hard ceiling on the useful bytes one protocol message can carry.
pub const MAX_BYTES_PER_MESSAGE: u16 = 12;

/// Upper bound on any timer period, set by the hardware counter wraparound.
pub const MAX_TIMER_PERIOD_MS: u64 = 2_000;

/// Control-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Number of slots in the sliding success window. 1 degenerates to a
    /// plain read-then-clear accumulator.
    pub window_slots: usize,
    /// Base timer period in milliseconds. Decision work runs every
    /// `report_period_ms / interval_ms` firings (rounded up).
    pub interval_ms: u64,
    /// Reporting period in milliseconds. Must be at least `interval_ms`.
    pub report_period_ms: u64,
    /// Window slot-advance period in milliseconds.
    pub window_ms: u64,
    /// Useful payload bytes per protocol message, at most
    /// [`MAX_BYTES_PER_MESSAGE`].
    pub bytes_per_message: u16,
    /// Payload bytes that make up one full transmission burst.
    pub bytes_per_transmission: u16,
    /// Maximum backoff, in reporting intervals. Seeded skip counts are
    /// strictly below this value.
    pub backoff_max_ticks: u16,
    /// Optional ratio confidence factor `k`: a verdict is only good when
    /// `acks * k >= preambles` as well. `None` disables the ratio check.
    pub quality_ratio: Option<u16>,
    /// After this many consecutive poor reporting intervals, force one probe
    /// session regardless of the backoff countdown. `None` disables forcing.
    pub force_probe_period: Option<u16>,
    /// Whether a status datagram is emitted each reporting interval.
    pub report_status: bool,
    /// Whether the status datagram carries the tick-sensor word.
    pub report_sensor: bool,
    /// Whether the status datagram carries the temperature word.
    pub report_temperature: bool,
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            window_slots: 1,
            interval_ms: 1_000,
            report_period_ms: 1_000,
            window_ms: 1_000,
            bytes_per_message: 12,
            bytes_per_transmission: 120,
            backoff_max_ticks: 10,
            quality_ratio: None,
            force_probe_period: Some(5),
            report_status: true,
            report_sensor: true,
            report_temperature: true,
        }
    }
}

impl TagConfig {
    /// Full-message acknowledgments that complete one transmission burst.
    /// A partial trailing message still needs its own acknowledgment, so
    /// the division rounds up.
    pub fn messages_per_transmission(&self) -> u16 {
        self.bytes_per_transmission.div_ceil(self.bytes_per_message)
    }

    /// Base timer firings per reporting interval.
    pub fn interval_multiplier(&self) -> u16 {
        let m = self.report_period_ms.div_ceil(self.interval_ms);
        u16::try_from(m).unwrap_or(u16::MAX)
    }

    /// Base timer period.
    pub fn interval_period(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Window slot-advance period.
    pub fn window_period(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Quality policy derived from the message budget and ratio factor.
    pub fn quality_policy(&self) -> QualityPolicy {
        QualityPolicy {
            burst_threshold: self.messages_per_transmission(),
            ratio: self.quality_ratio,
        }
    }

    /// Validate field ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_slots == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        for (name, period) in [
            ("interval", self.interval_ms),
            ("window", self.window_ms),
        ] {
            if period == 0 || period > MAX_TIMER_PERIOD_MS {
                return Err(ConfigError::PeriodOutOfRange {
                    name,
                    got_ms: period,
                });
            }
        }
        if self.report_period_ms < self.interval_ms {
            return Err(ConfigError::ReportPeriodTooShort {
                report_ms: self.report_period_ms,
                interval_ms: self.interval_ms,
            });
        }
        if self.bytes_per_message == 0 || self.bytes_per_message > MAX_BYTES_PER_MESSAGE {
            return Err(ConfigError::BadMessageSize(self.bytes_per_message));
        }
        if self.bytes_per_transmission == 0 {
            return Err(ConfigError::EmptyTransmission);
        }
        if self.backoff_max_ticks == 0 {
            return Err(ConfigError::ZeroBackoff);
        }
        if self.quality_ratio == Some(0) {
            return Err(ConfigError::ZeroRatio);
        }
        if self.force_probe_period == Some(0) {
            return Err(ConfigError::ZeroForcePeriod);
        }
        Ok(())
    }
}

/// Rejected configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window must have at least one slot")]
    EmptyWindow,

    #[error("{name} period of {got_ms} ms is outside 1..={max} ms", max = MAX_TIMER_PERIOD_MS)]
    PeriodOutOfRange { name: &'static str, got_ms: u64 },

    #[error("report period {report_ms} ms is shorter than the base interval {interval_ms} ms")]
    ReportPeriodTooShort { report_ms: u64, interval_ms: u64 },

    #[error("bytes per message must be 1..={max}, got {0}", max = MAX_BYTES_PER_MESSAGE)]
    BadMessageSize(u16),

    #[error("bytes per transmission must be nonzero")]
    EmptyTransmission,

    #[error("backoff maximum must be nonzero")]
    ZeroBackoff,

    #[error("quality ratio factor must be nonzero when set")]
    ZeroRatio,

    #[error("force-probe period must be nonzero when set")]
    ZeroForcePeriod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TagConfig::default().validate().unwrap();
    }

    #[test]
    fn message_budget_rounds_up() {
        let config = TagConfig {
            bytes_per_message: 12,
            bytes_per_transmission: 120,
            ..TagConfig::default()
        };
        assert_eq!(config.messages_per_transmission(), 10);

        let uneven = TagConfig {
            bytes_per_message: 12,
            bytes_per_transmission: 121,
            ..TagConfig::default()
        };
        assert_eq!(uneven.messages_per_transmission(), 11);
    }

    #[test]
    fn multiplier_rounds_up() {
        let config = TagConfig {
            interval_ms: 400,
            report_period_ms: 1_000,
            ..TagConfig::default()
        };
        assert_eq!(config.interval_multiplier(), 3);
    }

    #[test]
    fn rejects_oversized_message() {
        let config = TagConfig {
            bytes_per_message: 13,
            ..TagConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadMessageSize(13))
        ));
    }

    #[test]
    fn rejects_period_past_counter_wrap() {
        let config = TagConfig {
            interval_ms: 2_001,
            report_period_ms: 2_001,
            ..TagConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PeriodOutOfRange { name: "interval", .. })
        ));
    }

    #[test]
    fn rejects_report_period_below_interval() {
        let config = TagConfig {
            interval_ms: 1_000,
            report_period_ms: 500,
            ..TagConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ReportPeriodTooShort { .. })
        ));
    }

    #[test]
    fn rejects_zero_backoff_bound() {
        let config = TagConfig {
            backoff_max_ticks: 0,
            ..TagConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBackoff)));
    }

    #[test]
    fn toml_round_trip_keeps_overrides() {
        let text = r#"
            window_slots = 10
            window_ms = 100
            quality_ratio = 3
        "#;
        let config: TagConfig = toml::from_str(text).unwrap();
        assert_eq!(config.window_slots, 10);
        assert_eq!(config.window_ms, 100);
        assert_eq!(config.quality_ratio, Some(3));
        // Unlisted fields fall back to defaults.
        assert_eq!(config.interval_ms, 1_000);
        config.validate().unwrap();
    }
}
