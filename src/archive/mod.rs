// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Packet and receipt archives.
//!
//! The engine hands finished packets and receipts to a [`PacketArchive`]
//! after a run; nothing is read back mid-execution. [`MemoryArchive`] is the
//! in-process implementation used by the binary and the tests.
//!
//! [`PacketArchive`]: crate::traits::PacketArchive

pub mod memory;

pub use memory::MemoryArchive;
