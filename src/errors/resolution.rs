// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A `{{kind.path}}` token that could not be resolved.
///
/// Resolution failures are scoped to the operation that needed the value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// No result entry was recorded under this step id.
    #[error("Unresolved template: no result for opId '{id}'")]
    UnknownOpId { id: String },

    /// No result entry was recorded at this execution index.
    #[error("Unresolved template: no result at op index {index}")]
    UnknownIndex { index: String },

    /// The entry exists but the path does not lead anywhere.
    #[error("Unresolved template: path '{path}' not found in {{{{{token}}}}}")]
    MissingPath { token: String, path: String },

    /// The name is not bound in any enclosing loop context.
    #[error("Unresolved template: variable '{name}' is not defined")]
    UnknownVariable { name: String },
}
