// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures loading or validating the engine configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Config value '{field}' = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },
}
