// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-attempt relay state.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::lnd::{DecodedPaymentRequest, NodeError, PaymentHash};

use super::fees::FeeQuote;
use super::invoice::HoldInvoice;

/// Everything one relay attempt needs once its hold invoice exists.
///
/// Owned by the coordinator and dropped with it; nothing is persisted.
#[derive(Debug, Clone)]
pub struct RelaySession {
    /// The original BOLT11 request, paid as-is on forward.
    pub request: String,
    pub decoded: DecodedPaymentRequest,
    pub quote: FeeQuote,
    pub invoice: HoldInvoice,
    /// Wall-clock instant after which no HTLC is awaited.
    pub deadline: DateTime<Utc>,
    pub max_fee_mtokens: u64,
}

impl RelaySession {
    pub fn new(
        request: String,
        decoded: DecodedPaymentRequest,
        quote: FeeQuote,
        invoice: HoldInvoice,
    ) -> Self {
        Self {
            deadline: invoice.expires_at,
            max_fee_mtokens: quote.fee_mtokens,
            request,
            decoded,
            quote,
            invoice,
        }
    }

    pub fn id(&self) -> PaymentHash {
        self.invoice.id
    }

    /// Time remaining before the deadline, zero once passed.
    pub fn time_left(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.deadline - now).to_std().unwrap_or_default()
    }
}

/// Coordinator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    AwaitingHtlc,
    Forwarding,
    Settled,
    Canceled,
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Settled | RelayState::Canceled)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::AwaitingHtlc => "awaiting_htlc",
            RelayState::Forwarding => "forwarding",
            RelayState::Settled => "settled",
            RelayState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Why a hold invoice was canceled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// No HTLC arrived before the deadline.
    TimedOut,
    /// The invoice subscription failed or ended.
    SubscriptionError(NodeError),
    /// The downstream payment failed. A failed forward never surfaces as a
    /// `RelayError`: it ends the attempt here, with the hold invoice canceled.
    ForwardFailed(NodeError),
    /// The forward returned without a preimage matching the payment hash.
    MissingSecret,
    /// The service stopped while still waiting for an HTLC.
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::TimedOut => f.write_str("timed out waiting for HTLC"),
            CancelReason::SubscriptionError(e) => write!(f, "subscription error: {e}"),
            CancelReason::ForwardFailed(e) => write!(f, "forward failed: {e}"),
            CancelReason::MissingSecret => f.write_str("forward returned no usable secret"),
            CancelReason::Shutdown => f.write_str("service shutting down"),
        }
    }
}

/// Terminal result of a relay attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Settled,
    Canceled(CancelReason),
}

impl RelayOutcome {
    pub fn state(&self) -> RelayState {
        match self {
            RelayOutcome::Settled => RelayState::Settled,
            RelayOutcome::Canceled(_) => RelayState::Canceled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lnd::mock::decoded_request;
    use crate::relay::fees::FeeStrategy;
    use chrono::Duration;

    fn session(now: DateTime<Utc>) -> RelaySession {
        let decoded = decoded_request(now);
        let quote = FeeQuote {
            strategy: FeeStrategy::Dynamic,
            fee_mtokens: 5_000,
            premium_mtokens: 2_000,
            cltv_delta: Some(120),
        };
        let invoice = HoldInvoice {
            id: decoded.id,
            request: "lnbcrt1hold".into(),
            tokens: 100_007,
            mtokens: 100_007_000,
            fee_mtokens: 5_000,
            cltv_delta: 120,
            expires_at: now + Duration::minutes(30),
        };
        RelaySession::new("lnbc1original".into(), decoded, quote, invoice)
    }

    #[test]
    fn deadline_and_fee_bound_come_from_invoice_and_quote() {
        let now = Utc::now();
        let session = session(now);
        assert_eq!(session.deadline, now + Duration::minutes(30));
        assert_eq!(session.max_fee_mtokens, 5_000);
        assert_eq!(session.id(), session.decoded.id);
    }

    #[test]
    fn time_left_saturates_at_zero() {
        let now = Utc::now();
        let session = session(now);
        assert_eq!(session.time_left(now).as_secs(), 30 * 60);
        assert!(session.time_left(now + Duration::hours(1)).is_zero());
    }

    #[test]
    fn outcome_maps_to_terminal_state() {
        assert_eq!(RelayOutcome::Settled.state(), RelayState::Settled);
        assert_eq!(
            RelayOutcome::Canceled(CancelReason::TimedOut).state(),
            RelayState::Canceled
        );
        assert!(RelayState::Canceled.is_terminal());
        assert!(!RelayState::Forwarding.is_terminal());
    }
}
