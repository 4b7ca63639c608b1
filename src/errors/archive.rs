// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchiveError {
    #[error("Packet not found: {0}")]
    PacketNotFound(String),

    #[error("Archive storage error: {0}")]
    Storage(String),
}
