// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lightning node integration.
//!
//! This module provides:
//! - The [`LightningNode`] trait, the RPC contract the relay drives
//! - An LND REST gateway implementation ([`LndClient`])
//! - Invoice lifecycle subscriptions

pub mod client;
pub mod error;
pub mod types;
pub mod wire;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use client::{LndClient, LndConfig};
pub use error::NodeError;
pub use types::*;

/// Result alias for node calls.
pub type NodeResult<T> = Result<T, NodeError>;

/// Operations the relay needs from an authenticated Lightning node.
///
/// The handle is constructed once at startup and shared by every relay
/// attempt, so implementations must be safe to call concurrently.
#[async_trait]
pub trait LightningNode: Send + Sync {
    /// Identity and sync status of the node.
    async fn get_wallet_info(&self) -> NodeResult<WalletInfo>;

    /// Parse a BOLT11 request.
    async fn decode_payment_request(&self, request: &str) -> NodeResult<DecodedPaymentRequest>;

    /// Look up an invoice by payment hash. Fails with [`NodeError::NotFound`]
    /// when the node has no such invoice.
    async fn get_invoice(&self, id: &PaymentHash) -> NodeResult<Invoice>;

    /// Forwarding policies of the node's own channels.
    async fn get_fee_rates(&self) -> NodeResult<Vec<ChannelFeePolicy>>;

    /// Find a route honoring the probe constraints; `Ok(None)` when no path exists.
    async fn probe_for_route(&self, probe: &RouteProbe) -> NodeResult<Option<Route>>;

    /// Current best block height.
    async fn get_height(&self) -> NodeResult<u32>;

    async fn create_hodl_invoice(&self, params: &HodlInvoiceParams)
        -> NodeResult<CreatedHodlInvoice>;

    /// Stream lifecycle updates for one invoice.
    async fn subscribe_to_invoice(&self, id: &PaymentHash) -> NodeResult<InvoiceSubscription>;

    /// Pay a BOLT11 request, spending at most `max_fee_mtokens` on routing.
    /// Resolves once the payment reaches a terminal state; while its outcome
    /// is unknown the call keeps waiting rather than failing.
    async fn pay_via_payment_request(
        &self,
        request: &str,
        max_fee_mtokens: u64,
    ) -> NodeResult<PaymentResult>;

    async fn settle_hodl_invoice(&self, secret: &Preimage) -> NodeResult<()>;

    async fn cancel_hodl_invoice(&self, id: &PaymentHash) -> NodeResult<()>;
}

/// Live feed of updates for a single invoice.
///
/// Transport failures arrive in-band as `Err` items. Dropping the
/// subscription closes the channel, which tears down the producer.
#[derive(Debug)]
pub struct InvoiceSubscription {
    events: mpsc::Receiver<NodeResult<Invoice>>,
}

impl InvoiceSubscription {
    /// Create a subscription and the sender that feeds it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<NodeResult<Invoice>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { events: rx })
    }

    /// Next update. `None` once the producer has gone away.
    pub async fn next(&mut self) -> Option<NodeResult<Invoice>> {
        self.events.recv().await
    }
}
