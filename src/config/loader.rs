// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::consts::{
    DEFAULT_CHARS_PER_TOKEN, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_NESTING_DEPTH, DEFAULT_POLL_INTERVAL_MS, DEFAULT_UNTIL_TIMEOUT_MS,
    MAX_CHARS_PER_TOKEN, MAX_HTTP_TIMEOUT_MS, MAX_ITERATIONS_LIMIT, MAX_NESTING_DEPTH_LIMIT,
    MIN_HTTP_TIMEOUT_MS, MIN_POLL_INTERVAL_MS,
};
use crate::errors::ConfigError;

/// Engine configuration.
///
/// Every section and field is optional; accessors fall back to the
/// constants in `config::consts`.
///
/// # Example
/// ```yaml
/// http:
///   timeout_ms: 10000
///   max_timeout_ms: 60000
///   default_headers:
///     User-Agent: ucp-runner/0.1
/// wait:
///   until_timeout_ms: 30000
///   poll_interval_ms: 500
/// llm:
///   chars_per_token: 4
/// limits:
///   max_nesting_depth: 16
///   max_iterations: 10000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Settings for the `http` driver.
///
/// # Fields
/// * `timeout_ms` - Timeout applied when a call gives none (defaults to 15s)
/// * `max_timeout_ms` - Ceiling for per-call timeouts (defaults to 120s)
/// * `default_headers` - Sent with every request; per-call headers win
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HttpConfig {
    pub timeout_ms: Option<u64>,
    pub max_timeout_ms: Option<u64>,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl HttpConfig {
    pub fn get_timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)
    }

    pub fn get_max_timeout_ms(&self) -> u64 {
        self.max_timeout_ms.unwrap_or(MAX_HTTP_TIMEOUT_MS)
    }

    /// Clamp a per-call timeout to `[MIN_HTTP_TIMEOUT_MS, max_timeout_ms]`.
    ///
    /// # Example
    /// ```
    /// use ucp_runner::config::HttpConfig;
    ///
    /// let config = HttpConfig::default();
    /// assert_eq!(config.validate_and_clamp(Some(1_000_000)).as_millis(), 120_000);
    /// assert_eq!(config.validate_and_clamp(None).as_millis(), 15_000);
    /// ```
    pub fn validate_and_clamp(&self, requested_ms: Option<u64>) -> Duration {
        let max = self.get_max_timeout_ms().max(MIN_HTTP_TIMEOUT_MS);
        let requested = requested_ms.unwrap_or_else(|| self.get_timeout_ms());
        Duration::from_millis(requested.clamp(MIN_HTTP_TIMEOUT_MS, max))
    }
}

/// Settings for the `wait` driver.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WaitConfig {
    pub until_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

impl WaitConfig {
    pub fn get_until_timeout_ms(&self) -> u64 {
        self.until_timeout_ms.unwrap_or(DEFAULT_UNTIL_TIMEOUT_MS)
    }

    pub fn get_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
            .max(MIN_POLL_INTERVAL_MS)
    }
}

/// Settings for the `llm` driver's token estimates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LlmConfig {
    pub chars_per_token: Option<u64>,
}

impl LlmConfig {
    pub fn get_chars_per_token(&self) -> u64 {
        self.chars_per_token
            .unwrap_or(DEFAULT_CHARS_PER_TOKEN)
            .clamp(1, MAX_CHARS_PER_TOKEN)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LimitsConfig {
    pub max_nesting_depth: Option<usize>,
    pub max_iterations: Option<usize>,
}

impl LimitsConfig {
    pub fn get_max_nesting_depth(&self) -> usize {
        self.max_nesting_depth.unwrap_or(DEFAULT_MAX_NESTING_DEPTH)
    }

    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }
}

/// Load a config from a YAML (`.yaml`/`.yml`) or TOML (`.toml`) file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let content = fs::read_to_string(path)?;
    match extension.as_str() {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        "toml" => Ok(toml::from_str(&content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a config and reject values outside their accepted ranges.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    validate_engine_config(&cfg)?;
    Ok(cfg)
}

pub fn validate_engine_config(cfg: &EngineConfig) -> Result<(), ConfigError> {
    let max_timeout = cfg.http.get_max_timeout_ms();
    check_range("http.max_timeout_ms", max_timeout, MIN_HTTP_TIMEOUT_MS, u64::MAX)?;
    check_range(
        "http.timeout_ms",
        cfg.http.get_timeout_ms(),
        MIN_HTTP_TIMEOUT_MS,
        max_timeout,
    )?;
    if let Some(interval) = cfg.wait.poll_interval_ms {
        check_range(
            "wait.poll_interval_ms",
            interval,
            MIN_POLL_INTERVAL_MS,
            cfg.wait.get_until_timeout_ms().max(MIN_POLL_INTERVAL_MS),
        )?;
    }
    if let Some(chars) = cfg.llm.chars_per_token {
        check_range("llm.chars_per_token", chars, 1, MAX_CHARS_PER_TOKEN)?;
    }
    if let Some(depth) = cfg.limits.max_nesting_depth {
        check_range(
            "limits.max_nesting_depth",
            depth as u64,
            1,
            MAX_NESTING_DEPTH_LIMIT as u64,
        )?;
    }
    if let Some(iterations) = cfg.limits.max_iterations {
        check_range(
            "limits.max_iterations",
            iterations as u64,
            1,
            MAX_ITERATIONS_LIMIT as u64,
        )?;
    }
    Ok(())
}

fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let cfg: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.http.get_timeout_ms(), 15_000);
        assert_eq!(cfg.http.get_max_timeout_ms(), 120_000);
        assert_eq!(cfg.wait.get_until_timeout_ms(), 30_000);
        assert_eq!(cfg.wait.get_poll_interval_ms(), 1_000);
        assert_eq!(cfg.llm.get_chars_per_token(), 4);
        assert_eq!(cfg.limits.get_max_nesting_depth(), 32);
        assert_eq!(cfg.limits.get_max_iterations(), 100_000);
    }

    #[test]
    fn test_load_yaml_config() {
        let file = write_temp(
            ".yaml",
            r#"
http:
  timeout_ms: 5000
  default_headers:
    User-Agent: ucp-runner/test
wait:
  poll_interval_ms: 50
llm:
  chars_per_token: 3
"#,
        );
        let cfg = load_and_validate_config(file.path()).unwrap();
        assert_eq!(cfg.http.get_timeout_ms(), 5000);
        assert_eq!(
            cfg.http.default_headers.get("User-Agent").map(String::as_str),
            Some("ucp-runner/test")
        );
        assert_eq!(cfg.wait.get_poll_interval_ms(), 50);
        assert_eq!(cfg.llm.get_chars_per_token(), 3);
    }

    #[test]
    fn test_load_toml_config() {
        let file = write_temp(
            ".toml",
            r#"
[http]
max_timeout_ms = 60000

[limits]
max_nesting_depth = 8
"#,
        );
        let cfg = load_and_validate_config(file.path()).unwrap();
        assert_eq!(cfg.http.get_max_timeout_ms(), 60_000);
        assert_eq!(cfg.limits.get_max_nesting_depth(), 8);
        assert_eq!(cfg.limits.get_max_iterations(), 500);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".ini", "http = 1");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let file = write_temp(".yml", "http:\n  timeout_ms: 500000\n");
        match load_and_validate_config(file.path()) {
            Err(ConfigError::OutOfRange { field, max, .. }) => {
                assert_eq!(field, "http.timeout_ms");
                assert_eq!(max, 120_000);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }

        let file = write_temp(".yml", "limits:\n  max_nesting_depth: 0\n");
        assert!(matches!(
            load_and_validate_config(file.path()),
            Err(ConfigError::OutOfRange { .. })
        ));

        let file = write_temp(".yml", "limits:\n  max_iterations: 0\n");
        assert!(matches!(
            load_and_validate_config(file.path()),
            Err(ConfigError::OutOfRange { field, .. }) if field == "limits.max_iterations"
        ));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let file = write_temp(".yaml", "http: [unclosed");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_http_timeout_clamp() {
        let cfg = HttpConfig {
            timeout_ms: Some(2_000),
            max_timeout_ms: Some(10_000),
            default_headers: BTreeMap::new(),
        };
        assert_eq!(cfg.validate_and_clamp(None), Duration::from_millis(2_000));
        assert_eq!(cfg.validate_and_clamp(Some(1)), Duration::from_millis(MIN_HTTP_TIMEOUT_MS));
        assert_eq!(cfg.validate_and_clamp(Some(50_000)), Duration::from_millis(10_000));
    }

    #[test]
    fn test_demo_config_is_valid() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/engine.yaml");
        let cfg = load_and_validate_config(path).unwrap();
        assert!(cfg.http.get_timeout_ms() >= MIN_HTTP_TIMEOUT_MS);
    }
}
