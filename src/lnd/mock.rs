// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scriptable in-memory node for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use super::*;

/// Every RPC the mock has served, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCall {
    GetWalletInfo,
    DecodePaymentRequest(String),
    GetInvoice(PaymentHash),
    GetFeeRates,
    ProbeForRoute(RouteProbe),
    GetHeight,
    CreateHodlInvoice(HodlInvoiceParams),
    SubscribeToInvoice(PaymentHash),
    Pay {
        request: String,
        max_fee_mtokens: u64,
        /// Whether the invoice subscription was still alive when paying.
        subscription_open: bool,
    },
    Settle(PaymentHash),
    Cancel(PaymentHash),
}

struct MockState {
    decoded: NodeResult<DecodedPaymentRequest>,
    invoices: HashMap<PaymentHash, Invoice>,
    lookup_error: Option<NodeError>,
    fee_rates: Vec<ChannelFeePolicy>,
    route: NodeResult<Option<Route>>,
    height: u32,
    create_error: Option<NodeError>,
    subscribe_error: Option<NodeError>,
    subscription: Option<InvoiceSubscription>,
    payment: NodeResult<PaymentResult>,
    settle_error: Option<NodeError>,
    cancel_error: Option<NodeError>,
    calls: Vec<NodeCall>,
}

pub struct MockNode {
    state: Mutex<MockState>,
    events: mpsc::Sender<NodeResult<Invoice>>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNode {
    pub fn new() -> Self {
        let (events, subscription) = InvoiceSubscription::channel(16);
        Self {
            state: Mutex::new(MockState {
                decoded: Err(NodeError::Rejected("no payment request scripted".into())),
                invoices: HashMap::new(),
                lookup_error: None,
                fee_rates: Vec::new(),
                route: Ok(None),
                height: 800_000,
                create_error: None,
                subscribe_error: None,
                subscription: Some(subscription),
                payment: Err(NodeError::PaymentFailed("no payment scripted".into())),
                settle_error: None,
                cancel_error: None,
                calls: Vec::new(),
            }),
            events,
        }
    }

    fn with(self, apply: impl FnOnce(&mut MockState)) -> Self {
        apply(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_decoded(self, decoded: DecodedPaymentRequest) -> Self {
        self.with(|s| s.decoded = Ok(decoded))
    }

    pub fn with_decode_error(self, error: NodeError) -> Self {
        self.with(|s| s.decoded = Err(error))
    }

    pub fn with_existing_invoice(self, invoice: Invoice) -> Self {
        self.with(|s| {
            s.invoices.insert(invoice.id, invoice);
        })
    }

    pub fn with_lookup_error(self, error: NodeError) -> Self {
        self.with(|s| s.lookup_error = Some(error))
    }

    pub fn with_fee_rates(self, fee_rates: Vec<ChannelFeePolicy>) -> Self {
        self.with(|s| s.fee_rates = fee_rates)
    }

    pub fn with_route(self, route: Option<Route>) -> Self {
        self.with(|s| s.route = Ok(route))
    }

    pub fn with_height(self, height: u32) -> Self {
        self.with(|s| s.height = height)
    }

    pub fn with_create_error(self, error: NodeError) -> Self {
        self.with(|s| s.create_error = Some(error))
    }

    pub fn with_subscribe_error(self, error: NodeError) -> Self {
        self.with(|s| s.subscribe_error = Some(error))
    }

    pub fn with_payment(self, payment: NodeResult<PaymentResult>) -> Self {
        self.with(|s| s.payment = payment)
    }

    pub fn with_settle_error(self, error: NodeError) -> Self {
        self.with(|s| s.settle_error = Some(error))
    }

    pub fn with_cancel_error(self, error: NodeError) -> Self {
        self.with(|s| s.cancel_error = Some(error))
    }

    /// Feed for the (single) invoice subscription.
    pub fn invoice_events(&self) -> mpsc::Sender<NodeResult<Invoice>> {
        self.events.clone()
    }

    pub fn calls(&self) -> Vec<NodeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn settled(&self) -> Vec<PaymentHash> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NodeCall::Settle(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn canceled(&self) -> Vec<PaymentHash> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NodeCall::Cancel(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn payments(&self) -> Vec<NodeCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, NodeCall::Pay { .. }))
            .collect()
    }

    pub fn created_invoices(&self) -> Vec<HodlInvoiceParams> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                NodeCall::CreateHodlInvoice(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: NodeCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl LightningNode for MockNode {
    async fn get_wallet_info(&self) -> NodeResult<WalletInfo> {
        self.record(NodeCall::GetWalletInfo);
        let height = self.state.lock().unwrap().height;
        Ok(WalletInfo {
            public_key: "02relay".into(),
            alias: "mock-relay".into(),
            current_block_height: height,
            is_synced_to_chain: true,
        })
    }

    async fn decode_payment_request(&self, request: &str) -> NodeResult<DecodedPaymentRequest> {
        self.record(NodeCall::DecodePaymentRequest(request.to_string()));
        self.state.lock().unwrap().decoded.clone()
    }

    async fn get_invoice(&self, id: &PaymentHash) -> NodeResult<Invoice> {
        self.record(NodeCall::GetInvoice(*id));
        let state = self.state.lock().unwrap();
        if let Some(error) = &state.lookup_error {
            return Err(error.clone());
        }
        state
            .invoices
            .get(id)
            .cloned()
            .ok_or_else(|| NodeError::NotFound("unable to locate invoice".into()))
    }

    async fn get_fee_rates(&self) -> NodeResult<Vec<ChannelFeePolicy>> {
        self.record(NodeCall::GetFeeRates);
        Ok(self.state.lock().unwrap().fee_rates.clone())
    }

    async fn probe_for_route(&self, probe: &RouteProbe) -> NodeResult<Option<Route>> {
        self.record(NodeCall::ProbeForRoute(probe.clone()));
        self.state.lock().unwrap().route.clone()
    }

    async fn get_height(&self) -> NodeResult<u32> {
        self.record(NodeCall::GetHeight);
        Ok(self.state.lock().unwrap().height)
    }

    async fn create_hodl_invoice(
        &self,
        params: &HodlInvoiceParams,
    ) -> NodeResult<CreatedHodlInvoice> {
        self.record(NodeCall::CreateHodlInvoice(params.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(error) = &state.create_error {
            return Err(error.clone());
        }
        if state.invoices.contains_key(&params.id) {
            return Err(NodeError::Rejected(
                "invoice with payment hash already exists".into(),
            ));
        }
        state.invoices.insert(
            params.id,
            Invoice {
                id: params.id,
                state: InvoiceState::Open,
                mtokens: params.mtokens,
                received_mtokens: 0,
                payments: vec![],
            },
        );
        Ok(CreatedHodlInvoice {
            id: params.id,
            request: format!("lnbcrt{}n1hold", params.mtokens / 100),
        })
    }

    async fn subscribe_to_invoice(&self, id: &PaymentHash) -> NodeResult<InvoiceSubscription> {
        self.record(NodeCall::SubscribeToInvoice(*id));
        let mut state = self.state.lock().unwrap();
        if let Some(error) = &state.subscribe_error {
            return Err(error.clone());
        }
        state
            .subscription
            .take()
            .ok_or_else(|| NodeError::Transport("mock supports a single subscription".into()))
    }

    async fn pay_via_payment_request(
        &self,
        request: &str,
        max_fee_mtokens: u64,
    ) -> NodeResult<PaymentResult> {
        self.record(NodeCall::Pay {
            request: request.to_string(),
            max_fee_mtokens,
            subscription_open: !self.events.is_closed(),
        });
        self.state.lock().unwrap().payment.clone()
    }

    async fn settle_hodl_invoice(&self, secret: &Preimage) -> NodeResult<()> {
        self.record(NodeCall::Settle(secret.payment_hash()));
        match &self.state.lock().unwrap().settle_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn cancel_hodl_invoice(&self, id: &PaymentHash) -> NodeResult<()> {
        self.record(NodeCall::Cancel(*id));
        match &self.state.lock().unwrap().cancel_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Preimage used by the fixtures; its hash is [`fixture_hash`].
pub fn fixture_secret() -> Preimage {
    Preimage([42u8; 32])
}

pub fn fixture_hash() -> PaymentHash {
    fixture_secret().payment_hash()
}

pub fn feature(bit: u32) -> FeatureBit {
    FeatureBit {
        bit,
        name: format!("bit-{bit}"),
        is_known: true,
        is_required: bit % 2 == 0,
    }
}

/// A 100,000 token request that passes every validation rule at `now`.
pub fn decoded_request(now: DateTime<Utc>) -> DecodedPaymentRequest {
    DecodedPaymentRequest {
        id: fixture_hash(),
        destination: "03destination".into(),
        tokens: 100_000,
        mtokens: 100_000_000,
        cltv_delta: Some(40),
        created_at: now,
        expires_at: now + Duration::hours(24),
        features: vec![feature(9), feature(14), feature(16)],
        routes: vec![],
        description: Some("coffee".into()),
        description_hash: None,
    }
}

pub fn route(first_channel: u64, mtokens: u64, timeout: u32) -> Route {
    Route {
        hops: vec![RouteHop {
            channel_id: first_channel,
        }],
        mtokens,
        fee_mtokens: 0,
        timeout,
    }
}

/// Invoice update with the full HTLC set held.
pub fn held_invoice(id: PaymentHash, mtokens: u64) -> Invoice {
    Invoice {
        id,
        state: InvoiceState::Accepted,
        mtokens,
        received_mtokens: mtokens,
        payments: vec![InvoicePayment {
            channel_id: 7,
            mtokens,
            state: HtlcState::Accepted,
        }],
    }
}

pub fn successful_payment(secret: Preimage) -> PaymentResult {
    PaymentResult {
        secret: Some(secret),
        fee_mtokens: 1_000,
        mtokens: 100_000_000,
    }
}
