// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay engine
//!
//! Turns a BOLT11 request into a hold invoice for a marked-up amount and
//! forwards the original payment once the hold invoice is paid.
//!
//! Each attempt runs a sequential pipeline:
//!
//! 1. [`validator`]: decode and check the request
//! 2. [`duplicate`]: make sure no invoice uses the payment hash
//! 3. [`fees`]: quote the relay fee (probing a route unless a rate is given)
//! 4. [`invoice`]: create the hold invoice
//!
//! then hands the [`session::RelaySession`] to a
//! [`coordinator::HtlcRelayCoordinator`] task that resolves the hold invoice.
//! Attempts share nothing but the node handle.

pub mod coordinator;
pub mod duplicate;
pub mod error;
pub mod fees;
pub mod invoice;
pub mod policy;
pub mod session;
pub mod validator;

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::lnd::LightningNode;

pub use coordinator::HtlcRelayCoordinator;
pub use error::{RelayError, RelayErrorKind};
pub use fees::{FeeQuote, FeeStrategy};
pub use invoice::HoldInvoice;
pub use policy::RelayPolicy;
pub use session::{CancelReason, RelayOutcome, RelaySession, RelayState};

/// A started relay attempt.
#[derive(Debug)]
pub struct RelayHandle {
    /// The hold invoice to hand to the payer.
    pub invoice: HoldInvoice,
    /// Resolves when the coordinator reaches a terminal outcome.
    pub outcome: JoinHandle<Result<RelayOutcome, RelayError>>,
}

/// Entry point for relay attempts, shared by every request.
pub struct RelayEngine {
    node: Arc<dyn LightningNode>,
    policy: RelayPolicy,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl RelayEngine {
    pub fn new(node: Arc<dyn LightningNode>, policy: RelayPolicy, shutdown: CancellationToken) -> Self {
        Self {
            node,
            policy,
            shutdown,
            tasks: TaskTracker::new(),
        }
    }

    /// Relay `request`, returning the hold invoice the payer should pay.
    ///
    /// `max_fee_rate` (ppm) selects the flat fee strategy; without it the fee
    /// is derived from a probed route.
    pub async fn relay(
        &self,
        request: &str,
        max_fee_rate: Option<u64>,
    ) -> Result<HoldInvoice, RelayError> {
        self.start(request, max_fee_rate).await.map(|handle| handle.invoice)
    }

    /// Like [`relay`](Self::relay), also returning the coordinator task.
    pub async fn start(
        &self,
        request: &str,
        max_fee_rate: Option<u64>,
    ) -> Result<RelayHandle, RelayError> {
        let session = self.prepare(request, max_fee_rate).await?;
        let invoice = session.invoice.clone();
        let id = session.id();

        let coordinator = HtlcRelayCoordinator::new(self.node.clone(), session);
        let shutdown = self.shutdown.clone();
        let outcome = self.tasks.spawn(async move {
            let result = coordinator.run(shutdown).await;
            match &result {
                Ok(outcome) => debug!(payment_hash = %id, state = %outcome.state(), "Relay attempt finished"),
                Err(e) => error!(
                    payment_hash = %id,
                    error = %e,
                    error_code = e.code(),
                    "Relay attempt ended with an unresolved hold invoice"
                ),
            }
            result
        });

        Ok(RelayHandle { invoice, outcome })
    }

    /// Run the one-shot pipeline up to and including hold invoice creation.
    pub async fn prepare(
        &self,
        request: &str,
        max_fee_rate: Option<u64>,
    ) -> Result<RelaySession, RelayError> {
        let node = self.node.as_ref();
        let strategy = FeeStrategy::select(max_fee_rate);

        let decoded = validator::decode_and_validate(node, request, &self.policy, Utc::now()).await?;
        info!(
            payment_hash = %decoded.id,
            tokens = decoded.tokens,
            strategy = strategy.name(),
            "Relaying payment request"
        );

        duplicate::ensure_unused(node, &decoded.id).await?;
        let quote = fees::estimate(node, &decoded, strategy, &self.policy).await?;
        let invoice = invoice::issue(node, &decoded, &quote, &self.policy).await?;

        Ok(RelaySession::new(request.to_string(), decoded, quote, invoice))
    }

    /// Coordinators still running.
    pub fn active_relays(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting work and wait for every coordinator to finish.
    ///
    /// Coordinators still waiting for an HTLC cancel their hold invoice;
    /// those already forwarding run to completion.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        info!(active = self.tasks.len(), "Waiting for relay coordinators");
        self.tasks.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lnd::mock::{
        decoded_request, fixture_hash, fixture_secret, held_invoice, route, successful_payment,
        MockNode, NodeCall,
    };
    use crate::lnd::NodeError;

    fn engine(node: &Arc<MockNode>) -> RelayEngine {
        RelayEngine::new(node.clone(), RelayPolicy::default(), CancellationToken::new())
    }

    #[tokio::test]
    async fn flat_relay_settles_after_forward() {
        let node = Arc::new(
            MockNode::new()
                .with_decoded(decoded_request(Utc::now()))
                .with_payment(Ok(successful_payment(fixture_secret()))),
        );
        let engine = engine(&node);

        let handle = engine.start("lnbc1original", Some(2_500)).await.unwrap();
        assert_eq!(handle.invoice.id, fixture_hash());
        assert_eq!(handle.invoice.mtokens, 100_000_000 + 253_000);

        node.invoice_events()
            .send(Ok(held_invoice(fixture_hash(), handle.invoice.mtokens)))
            .await
            .unwrap();

        let outcome = handle.outcome.await.unwrap().unwrap();
        assert_eq!(outcome, RelayOutcome::Settled);
        assert_eq!(node.settled(), vec![fixture_hash()]);
        assert!(!node.calls().contains(&NodeCall::GetFeeRates));
    }

    #[tokio::test]
    async fn dynamic_relay_probes_before_issuing() {
        let node = Arc::new(
            MockNode::new()
                .with_decoded(decoded_request(Utc::now()))
                .with_route(Some(route(5, 100_001_000, 800_100)))
                .with_height(800_000),
        );
        let engine = engine(&node);

        let invoice = engine.relay("lnbc1original", None).await.unwrap();

        let calls = node.calls();
        let probe_at = calls
            .iter()
            .position(|c| matches!(c, NodeCall::ProbeForRoute(_)))
            .unwrap();
        let create_at = calls
            .iter()
            .position(|c| matches!(c, NodeCall::CreateHodlInvoice(_)))
            .unwrap();
        assert!(probe_at < create_at);
        assert_eq!(invoice.cltv_delta, 100 + 80);
        assert_eq!(invoice.fee_mtokens, 1_000 + 250_002);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_fee_estimation() {
        let mut decoded = decoded_request(Utc::now());
        decoded.cltv_delta = Some(9);
        let node = Arc::new(MockNode::new().with_decoded(decoded));

        let result = engine(&node).relay("lnbc1original", None).await;

        assert!(matches!(result, Err(RelayError::InvalidPaymentRequest(_))));
        assert_eq!(
            node.calls(),
            vec![NodeCall::DecodePaymentRequest("lnbc1original".into())]
        );
    }

    #[tokio::test]
    async fn no_route_creates_no_invoice() {
        let node = Arc::new(MockNode::new().with_decoded(decoded_request(Utc::now())));

        let result = engine(&node).relay("lnbc1original", None).await;

        assert_eq!(result.unwrap_err().kind(), RelayErrorKind::RouteUnavailable);
        assert!(node.created_invoices().is_empty());
    }

    #[tokio::test]
    async fn second_attempt_for_same_hash_conflicts() {
        let node = Arc::new(MockNode::new().with_decoded(decoded_request(Utc::now())));
        let engine = engine(&node);

        engine.relay("lnbc1original", Some(1_000)).await.unwrap();
        let second = engine.relay("lnbc1original", Some(1_000)).await;

        assert!(matches!(second, Err(RelayError::DuplicateInvoice(_))));
        assert_eq!(node.created_invoices().len(), 1);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn creation_failure_starts_no_coordinator() {
        let node = Arc::new(
            MockNode::new()
                .with_decoded(decoded_request(Utc::now()))
                .with_create_error(NodeError::Rejected("hodl disabled".into())),
        );
        let engine = engine(&node);

        let result = engine.relay("lnbc1original", Some(1_000)).await;

        assert_eq!(result.unwrap_err().kind(), RelayErrorKind::InvoiceCreation);
        assert_eq!(engine.active_relays(), 0);
    }

    #[tokio::test]
    async fn shutdown_cancels_waiting_relays() {
        let node = Arc::new(MockNode::new().with_decoded(decoded_request(Utc::now())));
        let engine = engine(&node);

        let handle = engine.start("lnbc1original", Some(1_000)).await.unwrap();
        engine.shutdown().await;

        assert_eq!(engine.active_relays(), 0);
        assert_eq!(
            handle.outcome.await.unwrap().unwrap(),
            RelayOutcome::Canceled(CancelReason::Shutdown)
        );
        assert_eq!(node.canceled(), vec![fixture_hash()]);
        assert!(node.payments().is_empty());
    }
}
