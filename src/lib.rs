// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod archive;    // packet/receipt archives
pub mod config;     // engine config + runtime wiring
pub mod drivers;    // namespace drivers + collaborator clients
pub mod engine;     // packet execution
pub mod errors;     // error handling
pub mod observability;
pub mod packet;     // packet model + canonical hashing
pub mod traits;     // unified abstractions
