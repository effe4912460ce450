use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    match profiled_env_opt(profile, key) {
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, default, "unparseable float, using default");
                default
            }
        },
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub luminate: LuminateConfig,
    pub thresholds: ThresholdSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STREAMWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STREAMWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            luminate: LuminateConfig::from_env_profiled(p),
            thresholds: ThresholdSettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  luminate:    base_url={}, configured={}",
            self.luminate.base_url,
            self.luminate.is_configured()
        );
        tracing::info!(
            "  thresholds:  dma={}, free_min={}, free_max={}",
            self.thresholds.dma_concentration_threshold,
            self.thresholds.free_ratio_min,
            self.thresholds.free_ratio_max
        );
    }

    /// Return a redacted view safe for display (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "luminate": {
                "base_url": self.luminate.base_url,
                "api_key_set": self.luminate.api_key.is_some(),
                "username": self.luminate.username,
                "auth_token_set": self.luminate.auth_token.is_some(),
                "timeout_secs": self.luminate.timeout_secs,
                "request_delay_ms": self.luminate.request_delay_ms,
                "configured": self.luminate.is_configured(),
            },
            "thresholds": {
                "dma_concentration_threshold": self.thresholds.dma_concentration_threshold,
                "free_ratio_min": self.thresholds.free_ratio_min,
                "free_ratio_max": self.thresholds.free_ratio_max,
            },
        })
    }
}

// ── Luminate API ──────────────────────────────────────────────

pub const DEFAULT_LUMINATE_URL: &str = "https://api.luminatedata.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuminateConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Pre-issued token; skips the `/auth` exchange when present.
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
    /// Pause between consecutive requests in a batch.
    pub request_delay_ms: u64,
}

impl LuminateConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            base_url: profiled_env_or(p, "LUM_API_BASE_URL", DEFAULT_LUMINATE_URL),
            api_key: profiled_env_opt(p, "LUM_API_KEY"),
            username: profiled_env_opt(p, "LUM_USERNAME"),
            password: profiled_env_opt(p, "LUM_PASSWORD"),
            auth_token: profiled_env_opt(p, "LUM_AUTH_TOKEN"),
            timeout_secs: profiled_env_u64(p, "LUM_TIMEOUT_SECS", 30),
            request_delay_ms: profiled_env_u64(p, "LUM_REQUEST_DELAY_MS", 100),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
            && (self.auth_token.is_some() || (self.username.is_some() && self.password.is_some()))
    }
}

impl Default for LuminateConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LUMINATE_URL.to_string(),
            api_key: None,
            username: None,
            password: None,
            auth_token: None,
            timeout_secs: 30,
            request_delay_ms: 100,
        }
    }
}

// ── Detection thresholds ──────────────────────────────────────

/// Raw threshold values as read from the environment.
///
/// These are not range-checked here; the rules crate validates them when
/// building its detector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSettings {
    pub dma_concentration_threshold: f64,
    pub free_ratio_min: f64,
    pub free_ratio_max: f64,
}

impl ThresholdSettings {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            dma_concentration_threshold: profiled_env_f64(
                p,
                "DMA_CONCENTRATION_THRESHOLD",
                d.dma_concentration_threshold,
            ),
            free_ratio_min: profiled_env_f64(p, "FREE_RATIO_MIN", d.free_ratio_min),
            free_ratio_max: profiled_env_f64(p, "FREE_RATIO_MAX", d.free_ratio_max),
        }
    }
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            dma_concentration_threshold: 0.80,
            free_ratio_min: 0.03,
            free_ratio_max: 1.0,
        }
    }
}
