// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod consts;
pub mod loader;
pub mod runtime;
pub mod validation;

pub use loader::{
    load_and_validate_config, load_config, validate_engine_config, EngineConfig, HttpConfig,
    LimitsConfig, LlmConfig, WaitConfig,
};
pub use runtime::{Collaborators, Runtime, RuntimeBuilder};
pub use validation::{validate_packet, validate_packet_with_limit};
