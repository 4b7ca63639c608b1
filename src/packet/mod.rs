// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod canonical; // Canonical JSON, digests and scalar coercions
pub mod model; // Packet and operation tree

pub use canonical::{canonicalize, canonicalize_serialize, digest};
pub use model::{
    count_ops, Condition, ConditionalForm, ConditionalOp, LoopForm, LoopOp, OpKind, Operation,
    Packet, ParallelOp, StandardOp, StructuredCondition, TryOp,
};
