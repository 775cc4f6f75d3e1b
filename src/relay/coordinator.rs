// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTLC relay coordinator
//!
//! Drives one hold invoice from creation to resolution:
//!
//! ```text
//! AwaitingHtlc ──held──▶ Forwarding ──secret──▶ Settled
//!      │                     │
//!      │ deadline            │ failure / no secret
//!      │ subscription error  │
//!      │ shutdown            ▼
//!      └──────────────────▶ Canceled
//! ```
//!
//! While awaiting, the coordinator waits on whichever comes first of the
//! deadline, the shutdown token and the invoice subscription. The wait
//! resolves exactly once: the timer and subscription are dropped before any
//! further node call is made. Once forwarding has started it runs to
//! completion, shutdown or not.
//!
//! The hold invoice is settled only with a preimage that hashes to its
//! payment hash, returned by a successful forward. Every other path cancels.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lnd::{Invoice, InvoiceState, LightningNode, NodeError, PaymentResult, Preimage};

use super::error::RelayError;
use super::session::{CancelReason, RelayOutcome, RelaySession, RelayState};

pub struct HtlcRelayCoordinator {
    node: Arc<dyn LightningNode>,
    session: RelaySession,
    state: RelayState,
}

impl HtlcRelayCoordinator {
    pub fn new(node: Arc<dyn LightningNode>, session: RelaySession) -> Self {
        Self {
            node,
            session,
            state: RelayState::AwaitingHtlc,
        }
    }

    /// Run the attempt to a terminal outcome.
    ///
    /// `Err` means the hold invoice could not be resolved cleanly: either
    /// settling after a successful forward failed, or canceling failed.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<RelayOutcome, RelayError> {
        info!(
            payment_hash = %self.session.id(),
            deadline = %self.session.deadline,
            max_fee_mtokens = self.session.max_fee_mtokens,
            "Awaiting HTLC for hold invoice"
        );

        match self.await_htlc(&shutdown).await {
            Ok(invoice) => {
                info!(
                    payment_hash = %self.session.id(),
                    received_mtokens = invoice.received_mtokens,
                    htlcs = invoice.payments.len(),
                    "HTLC held, forwarding payment"
                );
                self.forward().await
            }
            Err(reason) => self.cancel(reason).await,
        }
    }

    async fn await_htlc(&self, shutdown: &CancellationToken) -> Result<Invoice, CancelReason> {
        let id = self.session.id();
        let time_left = self.session.time_left(Utc::now());
        if time_left.is_zero() {
            return Err(CancelReason::TimedOut);
        }
        let deadline = tokio::time::sleep(time_left);
        tokio::pin!(deadline);

        let mut subscription = tokio::select! {
            biased;

            _ = &mut deadline => return Err(CancelReason::TimedOut),
            _ = shutdown.cancelled() => return Err(CancelReason::Shutdown),
            subscribed = self.node.subscribe_to_invoice(&id) => {
                subscribed.map_err(CancelReason::SubscriptionError)?
            }
        };

        loop {
            tokio::select! {
                biased;

                _ = &mut deadline => return Err(CancelReason::TimedOut),
                _ = shutdown.cancelled() => return Err(CancelReason::Shutdown),
                event = subscription.next() => match event {
                    Some(Ok(invoice)) if invoice.is_held() => return Ok(invoice),
                    Some(Ok(invoice)) if invoice.state == InvoiceState::Canceled => {
                        return Err(CancelReason::SubscriptionError(NodeError::Rejected(
                            "hold invoice canceled by node".into(),
                        )));
                    }
                    Some(Ok(invoice)) => {
                        debug!(
                            payment_hash = %id,
                            state = ?invoice.state,
                            received_mtokens = invoice.received_mtokens,
                            "Invoice updated, still waiting"
                        );
                    }
                    Some(Err(e)) => return Err(CancelReason::SubscriptionError(e)),
                    None => {
                        return Err(CancelReason::SubscriptionError(NodeError::Transport(
                            "invoice subscription closed".into(),
                        )));
                    }
                },
            }
        }
    }

    async fn forward(&mut self) -> Result<RelayOutcome, RelayError> {
        self.transition(RelayState::Forwarding);
        let id = self.session.id();

        let result = self
            .node
            .pay_via_payment_request(&self.session.request, self.session.max_fee_mtokens)
            .await;

        match result {
            Ok(PaymentResult {
                secret: Some(secret),
                fee_mtokens,
                mtokens,
            }) if secret.unlocks(&id) => {
                info!(payment_hash = %id, mtokens, fee_mtokens, "Forward succeeded");
                self.settle(secret).await
            }
            Ok(_) => {
                warn!(payment_hash = %id, "Forward returned no usable secret");
                self.cancel(CancelReason::MissingSecret).await
            }
            Err(e) => {
                warn!(payment_hash = %id, error = %e, "Forward failed");
                self.cancel(CancelReason::ForwardFailed(e)).await
            }
        }
    }

    async fn settle(&mut self, secret: Preimage) -> Result<RelayOutcome, RelayError> {
        let id = self.session.id();
        if let Err(source) = self.node.settle_hodl_invoice(&secret).await {
            error!(
                payment_hash = %id,
                error = %source,
                "Failed to settle hold invoice after successful forward"
            );
            return Err(RelayError::SettlementFailed { id, source });
        }

        self.transition(RelayState::Settled);
        info!(
            payment_hash = %id,
            mtokens = self.session.invoice.mtokens,
            earned_mtokens = self.session.quote.total_mtokens(),
            "Hold invoice settled"
        );
        Ok(RelayOutcome::Settled)
    }

    async fn cancel(&mut self, reason: CancelReason) -> Result<RelayOutcome, RelayError> {
        let id = self.session.id();
        match &reason {
            CancelReason::TimedOut => warn!(payment_hash = %id, "No HTLC before deadline"),
            CancelReason::SubscriptionError(e) => {
                warn!(payment_hash = %id, error = %e, "Invoice subscription failed")
            }
            CancelReason::Shutdown => info!(payment_hash = %id, "Abandoning relay on shutdown"),
            CancelReason::ForwardFailed(_) | CancelReason::MissingSecret => {}
        }

        if let Err(source) = self.node.cancel_hodl_invoice(&id).await {
            error!(
                payment_hash = %id,
                error = %source,
                reason = %reason,
                "Failed to cancel hold invoice, funds may be stuck"
            );
            return Err(RelayError::CancellationFailed { id, source });
        }

        self.transition(RelayState::Canceled);
        info!(payment_hash = %id, reason = %reason, "Hold invoice canceled");
        Ok(RelayOutcome::Canceled(reason))
    }

    fn transition(&mut self, next: RelayState) {
        debug_assert!(!self.state.is_terminal(), "transition out of {}", self.state);
        debug!(
            payment_hash = %self.session.id(),
            from = %self.state,
            to = %next,
            "Relay state transition"
        );
        self.state = next;
    }
}
