use config::{Config, Environment, File};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use crate::error::AssistantError;
use crate::theme::ThemeMode;

const ENV_PREFIX: &str = "FPL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AssistantConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/fpl-assistant.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Socket path with `~` and `$VAR` expanded.
    pub fn resolved_socket_path(&self) -> PathBuf {
        match shellexpand::full(&self.socket_path) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                tracing::warn!(path = %self.socket_path, error = %e, "Socket path expansion failed");
                PathBuf::from(&self.socket_path)
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// Reject sends while a reply is still pending.
    pub single_flight: bool,
    pub reply_delay_min_ms: u64,
    pub reply_delay_max_ms: u64,
    pub analysis_delay_min_ms: u64,
    pub analysis_delay_max_ms: u64,
    /// Probability in [0, 1] that the template analyzer reports a failure.
    pub analysis_failure_rate: f64,
    /// Pins every random choice (reply pick, delay) when set.
    pub rng_seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            single_flight: false,
            reply_delay_min_ms: 1000,
            reply_delay_max_ms: 2500,
            analysis_delay_min_ms: 2000,
            analysis_delay_max_ms: 4000,
            analysis_failure_rate: 0.0,
            rng_seed: None,
        }
    }
}

impl ChatConfig {
    pub fn reply_delay_ms(&self) -> RangeInclusive<u64> {
        ordered(self.reply_delay_min_ms, self.reply_delay_max_ms)
    }

    pub fn analysis_delay_ms(&self) -> RangeInclusive<u64> {
        ordered(self.analysis_delay_min_ms, self.analysis_delay_max_ms)
    }

    pub fn failure_rate(&self) -> f64 {
        if self.analysis_failure_rate.is_nan() {
            return 0.0;
        }
        self.analysis_failure_rate.clamp(0.0, 1.0)
    }

    /// Zero-delay settings, handy for tests and scripted demos.
    pub fn instant() -> Self {
        Self {
            reply_delay_min_ms: 0,
            reply_delay_max_ms: 0,
            analysis_delay_min_ms: 0,
            analysis_delay_max_ms: 0,
            ..Self::default()
        }
    }
}

fn ordered(a: u64, b: u64) -> RangeInclusive<u64> {
    if a <= b {
        a..=b
    } else {
        b..=a
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub mode: ThemeMode,
    /// Host appearance used when `mode = "system"`.
    pub system_dark: bool,
}

impl AssistantConfig {
    /// Load from a TOML file (optional) overlaid with `FPL__SECTION__KEY` env vars.
    pub fn load(path: &str) -> Result<Self, AssistantError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: &str, prefix: &str) -> Result<Self, AssistantError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(s.try_deserialize()?)
    }
}
