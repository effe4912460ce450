use anyhow::{Context, Result};
use streamwatch_core::config::ThresholdSettings;
use streamwatch_rules::DetectorConfig;
use tracing::debug;

use crate::cli::ThresholdArgs;

/// Apply command-line overrides on top of the environment values.
pub fn merge_thresholds(env: ThresholdSettings, overrides: &ThresholdArgs) -> ThresholdSettings {
    ThresholdSettings {
        dma_concentration_threshold: overrides
            .dma_threshold
            .unwrap_or(env.dma_concentration_threshold),
        free_ratio_min: overrides.free_min.unwrap_or(env.free_ratio_min),
        free_ratio_max: overrides.free_max.unwrap_or(env.free_ratio_max),
    }
}

/// Validated detector configuration from env plus overrides.
pub fn resolve_detector_config(
    env: ThresholdSettings,
    overrides: &ThresholdArgs,
) -> Result<DetectorConfig> {
    let merged = merge_thresholds(env, overrides);
    debug!(?merged, "resolved detection thresholds");
    DetectorConfig::try_from(merged).context("invalid detection thresholds")
}
