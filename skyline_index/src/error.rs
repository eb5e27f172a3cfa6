// Copyright 2026 the Skyline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy shared by all containers.

use thiserror::Error;

/// Result alias for container operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by container operations.
///
/// Mutating operations that fail leave the container in its pre-operation
/// state. Iterator invalidation has no error variant: iterators borrow their
/// container, so the borrow checker rejects mutation while one is live.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A point or direction did not match the container's dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the container was constructed with.
        expected: usize,
        /// Dimension of the offending argument.
        actual: usize,
    },

    /// A parameter was outside its domain (`k = 0` nearest, zero capacity).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The operation needs at least one element.
    #[error("operation requires a non-empty container")]
    EmptyContainer,
}
