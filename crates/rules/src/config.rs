//! Detection thresholds, validated at construction time.

use serde::{Deserialize, Serialize};
use streamwatch_core::config::ThresholdSettings;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },
}

/// Thresholds read by every rule evaluation.
///
/// Fields are private so an out-of-range value can never reach a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdSettings", into = "ThresholdSettings")]
pub struct DetectorConfig {
    dma_concentration_threshold: f64,
    free_ratio_min: f64,
    free_ratio_max: f64,
}

impl DetectorConfig {
    pub const DEFAULT_DMA_THRESHOLD: f64 = 0.80;
    pub const DEFAULT_FREE_RATIO_MIN: f64 = 0.03;
    pub const DEFAULT_FREE_RATIO_MAX: f64 = 1.0;

    /// Validate and build. `dma` must be in `(0, 1]`, both free ratios in `[0, 1]`.
    ///
    /// `free_ratio_min >= free_ratio_max` is accepted; the all-free check wins
    /// when both would fire.
    pub fn new(
        dma_concentration_threshold: f64,
        free_ratio_min: f64,
        free_ratio_max: f64,
    ) -> Result<Self, ConfigError> {
        check(
            "dma_concentration_threshold",
            dma_concentration_threshold,
            "(0, 1]",
            |v| v > 0.0 && v <= 1.0,
        )?;
        check("free_ratio_min", free_ratio_min, "[0, 1]", |v| {
            (0.0..=1.0).contains(&v)
        })?;
        check("free_ratio_max", free_ratio_max, "[0, 1]", |v| {
            (0.0..=1.0).contains(&v)
        })?;

        if free_ratio_min >= free_ratio_max {
            tracing::warn!(
                free_ratio_min,
                free_ratio_max,
                "free ratio thresholds overlap; all-free check takes priority"
            );
        }

        Ok(Self {
            dma_concentration_threshold,
            free_ratio_min,
            free_ratio_max,
        })
    }

    pub fn dma_concentration_threshold(&self) -> f64 {
        self.dma_concentration_threshold
    }

    pub fn free_ratio_min(&self) -> f64 {
        self.free_ratio_min
    }

    pub fn free_ratio_max(&self) -> f64 {
        self.free_ratio_max
    }

    pub fn with_dma_concentration_threshold(self, value: f64) -> Result<Self, ConfigError> {
        Self::new(value, self.free_ratio_min, self.free_ratio_max)
    }

    pub fn with_free_ratio_min(self, value: f64) -> Result<Self, ConfigError> {
        Self::new(self.dma_concentration_threshold, value, self.free_ratio_max)
    }

    pub fn with_free_ratio_max(self, value: f64) -> Result<Self, ConfigError> {
        Self::new(self.dma_concentration_threshold, self.free_ratio_min, value)
    }
}

fn check(
    field: &'static str,
    value: f64,
    range: &'static str,
    in_range: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if !in_range(value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            range,
        });
    }
    Ok(())
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            dma_concentration_threshold: Self::DEFAULT_DMA_THRESHOLD,
            free_ratio_min: Self::DEFAULT_FREE_RATIO_MIN,
            free_ratio_max: Self::DEFAULT_FREE_RATIO_MAX,
        }
    }
}

impl TryFrom<ThresholdSettings> for DetectorConfig {
    type Error = ConfigError;

    fn try_from(s: ThresholdSettings) -> Result<Self, Self::Error> {
        Self::new(s.dma_concentration_threshold, s.free_ratio_min, s.free_ratio_max)
    }
}

impl From<DetectorConfig> for ThresholdSettings {
    fn from(c: DetectorConfig) -> Self {
        ThresholdSettings {
            dma_concentration_threshold: c.dma_concentration_threshold,
            free_ratio_min: c.free_ratio_min,
            free_ratio_max: c.free_ratio_max,
        }
    }
}
