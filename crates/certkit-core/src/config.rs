//! Runner configuration.
//!
//! Values come from [`RunnerConfig::default`], can be overridden from the
//! environment with [`RunnerConfig::from_env`], and are finally overridden by
//! whatever the caller sets explicitly (e.g. CLI flags).

use serde::{Deserialize, Serialize};

use crate::error::{CertifyError, Result};

pub const ENV_IMPLEMENTATION_NAME: &str = "CERTKIT_IMPLEMENTATION_NAME";
pub const ENV_CHECK_TIMEOUT_MS: &str = "CERTKIT_CHECK_TIMEOUT_MS";
pub const ENV_RUN_TIMEOUT_MS: &str = "CERTKIT_RUN_TIMEOUT_MS";

/// Per-run settings for the conformance runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Display name recorded in the run result.
    pub implementation_name: String,
    /// Timeout for a single adapter invocation. `None` waits indefinitely.
    pub per_check_timeout_ms: Option<u64>,
    /// Timeout for the whole run. Checks not started before it expires are
    /// recorded as errors.
    pub run_timeout_ms: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            implementation_name: "unnamed-implementation".to_string(),
            per_check_timeout_ms: Some(5_000),
            run_timeout_ms: None,
        }
    }
}

impl RunnerConfig {
    pub fn new(implementation_name: impl Into<String>) -> Self {
        Self {
            implementation_name: implementation_name.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `CERTKIT_*` environment variables.
    ///
    /// A timeout of `0` disables that timeout.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `CERTKIT_*` variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(name) = lookup(ENV_IMPLEMENTATION_NAME) {
            config.implementation_name = name;
        }
        if let Some(ms) = parse_ms(ENV_CHECK_TIMEOUT_MS, lookup(ENV_CHECK_TIMEOUT_MS))? {
            config.per_check_timeout_ms = non_zero(ms);
        }
        if let Some(ms) = parse_ms(ENV_RUN_TIMEOUT_MS, lookup(ENV_RUN_TIMEOUT_MS))? {
            config.run_timeout_ms = non_zero(ms);
        }
        Ok(config)
    }

    pub fn with_check_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.per_check_timeout_ms = ms.and_then(non_zero);
        self
    }

    pub fn with_run_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.run_timeout_ms = ms.and_then(non_zero);
        self
    }
}

fn parse_ms(var: &str, raw: Option<String>) -> Result<Option<u64>> {
    raw.map(|raw| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| CertifyError::InvalidConfig(format!("{var}={raw}: {e}")))
    })
    .transpose()
}

fn non_zero(ms: u64) -> Option<u64> {
    (ms > 0).then_some(ms)
}
