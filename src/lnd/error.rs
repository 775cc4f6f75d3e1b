// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors surfaced by the Lightning node boundary.

/// Errors that can occur while talking to the Lightning node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// The node has no record of the requested object.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path finding could not produce a route to the destination.
    #[error("No route found: {0}")]
    NoRoute(String),

    /// The node understood the call and refused it.
    #[error("Request rejected by node: {0}")]
    Rejected(String),

    /// An outbound payment reached a terminal failure.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Connection, TLS or stream failure.
    #[error("Node transport error: {0}")]
    Transport(String),

    /// The node answered with something we could not interpret.
    #[error("Invalid node response: {0}")]
    InvalidResponse(String),
}

impl NodeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NodeError::NotFound(_))
    }
}
