// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay errors.

use crate::lnd::{NodeError, PaymentHash};

use super::validator::ValidationFailure;

/// Coarse classification of relay failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    /// Malformed or ineligible request. Not retryable.
    Validation,
    /// An invoice already uses the payment hash.
    Conflict,
    /// No path to the destination right now. The caller may retry later.
    RouteUnavailable,
    InvoiceCreation,
    Settlement,
    /// A hold invoice could not be canceled: stuck funds.
    Cancellation,
    /// The node failed outside of a classified step.
    Upstream,
}

/// Errors that abort a relay attempt.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Expected BOLT11 payment request to relay")]
    MissingInput,

    #[error("Invalid payment request: {0}")]
    InvalidPaymentRequest(#[from] ValidationFailure),

    #[error("Invoice with payment hash {0} already exists")]
    DuplicateInvoice(PaymentHash),

    #[error("Failed to find route to pay request")]
    NoRouteFound,

    #[error("Failed to create hold invoice: {0}")]
    InvoiceCreationFailed(#[source] NodeError),

    #[error("Failed to settle hold invoice {id}: {source}")]
    SettlementFailed { id: PaymentHash, source: NodeError },

    #[error("Failed to cancel hold invoice {id}: {source}")]
    CancellationFailed { id: PaymentHash, source: NodeError },

    #[error("Lightning node request failed: {0}")]
    Node(#[source] NodeError),
}

impl RelayError {
    pub fn kind(&self) -> RelayErrorKind {
        match self {
            RelayError::MissingInput | RelayError::InvalidPaymentRequest(_) => {
                RelayErrorKind::Validation
            }
            RelayError::DuplicateInvoice(_) => RelayErrorKind::Conflict,
            RelayError::NoRouteFound => RelayErrorKind::RouteUnavailable,
            RelayError::InvoiceCreationFailed(_) => RelayErrorKind::InvoiceCreation,
            RelayError::SettlementFailed { .. } => RelayErrorKind::Settlement,
            RelayError::CancellationFailed { .. } => RelayErrorKind::Cancellation,
            RelayError::Node(_) => RelayErrorKind::Upstream,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::MissingInput => "ExpectedBolt11PaymentRequestToCreateHodlInvoice",
            RelayError::InvalidPaymentRequest(failure) => failure.code(),
            RelayError::DuplicateInvoice(_) => "InvoiceWithPaymentHashAlreadyExists",
            RelayError::NoRouteFound => "FailedToFindRouteToPayRequest",
            RelayError::InvoiceCreationFailed(_) => "FailedToCreateHodlInvoice",
            RelayError::SettlementFailed { .. } => "FailedToSettleHodlInvoice",
            RelayError::CancellationFailed { .. } => "FailedToCancelHodlInvoice",
            RelayError::Node(_) => "UnexpectedLightningNodeError",
        }
    }
}
