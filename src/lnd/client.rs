// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LND client speaking the REST gateway.

use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Base64Url, Encoding};
use chrono::Utc;
use reqwest::{Certificate, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use super::error::NodeError;
use super::types::*;
use super::wire::*;
use super::{InvoiceSubscription, LightningNode, NodeResult};

const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";

/// Default timeout for unary calls.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time LND may spend on a downstream payment.
const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Detects a dead node under long-lived streams, which carry no timeout.
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Default pause between attempts to re-attach to an outbound payment.
const DEFAULT_TRACK_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Consecutive lookups the node may deny knowing a payment before it counts
/// as never started.
const TRACK_NOT_FOUND_ATTEMPTS: u32 = 3;

/// Updates buffered per invoice subscription.
const SUBSCRIPTION_BUFFER: usize = 16;

/// Connection details for an LND node.
#[derive(Clone)]
pub struct LndConfig {
    /// REST `host:port`.
    pub socket: String,
    /// PEM encoded TLS certificate of the node.
    pub cert_pem: Vec<u8>,
    /// Raw macaroon bytes.
    pub macaroon: Vec<u8>,
    pub request_timeout: Duration,
    /// Passed to LND as the payment's own timeout. The client never gives up
    /// on a payment stream by itself.
    pub payment_timeout: Duration,
    pub track_retry_delay: Duration,
}

impl LndConfig {
    pub fn new(socket: impl Into<String>, cert_pem: Vec<u8>, macaroon: Vec<u8>) -> Self {
        Self {
            socket: socket.into(),
            cert_pem,
            macaroon,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            track_retry_delay: DEFAULT_TRACK_RETRY_DELAY,
        }
    }

    /// Base URL of the REST gateway.
    pub fn base_url(&self) -> Result<Url, NodeError> {
        let socket = self.socket.trim();
        let raw = if socket.starts_with("https://") || socket.starts_with("http://") {
            socket.to_string()
        } else {
            format!("https://{socket}")
        };
        raw.parse()
            .map_err(|e: url::ParseError| NodeError::Transport(format!("invalid socket {socket}: {e}")))
    }
}

// Keep credentials out of logs.
impl std::fmt::Debug for LndConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LndConfig")
            .field("socket", &self.socket)
            .field("cert_pem", &format_args!("<{} bytes>", self.cert_pem.len()))
            .field("macaroon", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("payment_timeout", &self.payment_timeout)
            .field("track_retry_delay", &self.track_retry_delay)
            .finish()
    }
}

/// Authenticated LND REST client.
#[derive(Debug, Clone)]
pub struct LndClient {
    base_url: Url,
    macaroon_hex: String,
    request_timeout: Duration,
    payment_timeout: Duration,
    track_retry_delay: Duration,
    http: Client,
}

impl LndClient {
    /// Build a client pinned to the node's certificate. An empty certificate
    /// is only usable with a plain `http://` socket.
    pub fn new(config: LndConfig) -> Result<Self, NodeError> {
        let base_url = config.base_url()?;

        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE);
        if !config.cert_pem.is_empty() {
            let certificate = Certificate::from_pem(&config.cert_pem)
                .map_err(|e| NodeError::Transport(format!("invalid TLS certificate: {e}")))?;
            builder = builder.add_root_certificate(certificate);
        }
        let http = builder
            .build()
            .map_err(|e| NodeError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            macaroon_hex: hex::encode(&config.macaroon),
            request_timeout: config.request_timeout,
            payment_timeout: config.payment_timeout,
            track_retry_delay: config.track_retry_delay,
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, NodeError> {
        self.base_url
            .join(path)
            .map_err(|e| NodeError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, NodeError> {
        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .header(MACAROON_HEADER, &self.macaroon_hex))
    }

    async fn send(&self, request: RequestBuilder) -> NodeResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(RestError::classify(status, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> NodeResult<T> {
        let request = self.request(Method::GET, path)?.timeout(self.request_timeout);
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> NodeResult<T> {
        let request = self.request(Method::POST, path)?.json(body).timeout(timeout);
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    /// Follow an outbound payment whose send stream was lost until LND
    /// reports a terminal status.
    ///
    /// Transport trouble is retried indefinitely. Only a node-reported
    /// failure, or a node that keeps denying any record of the payment,
    /// ends in `Err`.
    async fn track_payment(&self, request: &str) -> NodeResult<PaymentResult> {
        let mut id = None;
        let mut not_found = 0;

        loop {
            let payment_hash = match id {
                Some(payment_hash) => payment_hash,
                None => match self.decode_payment_request(request).await {
                    Ok(decoded) => *id.insert(decoded.id),
                    Err(e) => {
                        warn!(error = %e, "Failed to decode payment request for tracking");
                        tokio::time::sleep(self.track_retry_delay).await;
                        continue;
                    }
                },
            };

            match self.track_once(&payment_hash).await {
                Ok(result) => return Ok(result),
                Err(e @ NodeError::PaymentFailed(_)) => return Err(e),
                Err(e) if e.is_not_found() => {
                    not_found += 1;
                    if not_found >= TRACK_NOT_FOUND_ATTEMPTS {
                        warn!(payment_hash = %payment_hash, error = %e, "Node has no record of the payment");
                        return Err(e);
                    }
                }
                Err(e) => {
                    not_found = 0;
                    warn!(payment_hash = %payment_hash, error = %e, "Payment still unresolved, retrying");
                }
            }
            tokio::time::sleep(self.track_retry_delay).await;
        }
    }

    async fn track_once(&self, id: &PaymentHash) -> NodeResult<PaymentResult> {
        let path = format!(
            "/v2/router/track/{}?no_inflight_updates=true",
            Base64Url::encode_string(id.as_bytes())
        );
        let response = self.send(self.request(Method::GET, &path)?).await?;
        read_payment_stream(response).await
    }
}

#[async_trait]
impl LightningNode for LndClient {
    async fn get_wallet_info(&self) -> NodeResult<WalletInfo> {
        let info: GetInfoResponse = self.get_json("/v1/getinfo").await?;
        Ok(info.into())
    }

    async fn decode_payment_request(&self, request: &str) -> NodeResult<DecodedPaymentRequest> {
        let encoded: String = url::form_urlencoded::byte_serialize(request.trim().as_bytes()).collect();
        let payreq: PayReq = self.get_json(&format!("/v1/payreq/{encoded}")).await?;
        payreq.try_into()
    }

    async fn get_invoice(&self, id: &PaymentHash) -> NodeResult<Invoice> {
        let invoice: InvoiceResponse = self.get_json(&format!("/v1/invoice/{}", id.to_hex())).await?;
        invoice.try_into()
    }

    async fn get_fee_rates(&self) -> NodeResult<Vec<ChannelFeePolicy>> {
        let report: FeeReportResponse = self.get_json("/v1/fees").await?;
        Ok(report.into())
    }

    async fn probe_for_route(&self, probe: &RouteProbe) -> NodeResult<Option<Route>> {
        let body = QueryRoutesRequest::from(probe);

        match self
            .post_json::<_, QueryRoutesResponse>("/v1/graph/routes", &body, probe.timeout)
            .await
        {
            Ok(response) => Ok(response.best_route()),
            Err(NodeError::NoRoute(reason)) => {
                debug!(destination = %probe.destination, %reason, "No route to destination");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_height(&self) -> NodeResult<u32> {
        Ok(self.get_wallet_info().await?.current_block_height)
    }

    async fn create_hodl_invoice(
        &self,
        params: &HodlInvoiceParams,
    ) -> NodeResult<CreatedHodlInvoice> {
        let body = AddHoldInvoiceRequest::new(params, Utc::now())?;
        let created: AddHoldInvoiceResponse = self
            .post_json("/v2/invoices/hodl", &body, self.request_timeout)
            .await?;

        if created.payment_request.is_empty() {
            return Err(NodeError::InvalidResponse(
                "hold invoice created without payment request".to_string(),
            ));
        }
        Ok(CreatedHodlInvoice {
            id: params.id,
            request: created.payment_request,
        })
    }

    async fn subscribe_to_invoice(&self, id: &PaymentHash) -> NodeResult<InvoiceSubscription> {
        let path = format!(
            "/v2/invoices/subscribe/{}",
            Base64Url::encode_string(id.as_bytes())
        );
        // Streaming call: no overall timeout, the caller owns the deadline.
        let response = self.send(self.request(Method::GET, &path)?).await?;

        let (tx, subscription) = InvoiceSubscription::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(pump_invoice_updates(*id, response, tx));
        Ok(subscription)
    }

    async fn pay_via_payment_request(
        &self,
        request: &str,
        max_fee_mtokens: u64,
    ) -> NodeResult<PaymentResult> {
        let body = SendPaymentRequest {
            payment_request: request.to_string(),
            fee_limit_msat: max_fee_mtokens.to_string(),
            timeout_seconds: i32::try_from(self.payment_timeout.as_secs()).unwrap_or(i32::MAX),
            no_inflight_updates: true,
        };
        // Bounded by LND through `timeout_seconds`; HTLCs already in flight
        // may stay pending past it, so no client timeout applies.
        let send = self.request(Method::POST, "/v2/router/send")?.json(&body);
        let sent = match self.send(send).await {
            Ok(response) => read_payment_stream(response).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(result) => Ok(result),
            Err(e @ NodeError::PaymentFailed(_)) => Err(e),
            Err(e) => {
                warn!(error = %e, "Outbound payment status unknown, tracking it on the node");
                self.track_payment(request).await
            }
        }
    }

    async fn settle_hodl_invoice(&self, secret: &Preimage) -> NodeResult<()> {
        let body = SettleInvoiceRequest {
            preimage: Base64::encode_string(secret.as_bytes()),
        };
        let _: serde_json::Value = self
            .post_json("/v2/invoices/settle", &body, self.request_timeout)
            .await?;
        Ok(())
    }

    async fn cancel_hodl_invoice(&self, id: &PaymentHash) -> NodeResult<()> {
        let body = CancelInvoiceRequest {
            payment_hash: Base64::encode_string(id.as_bytes()),
        };
        let _: serde_json::Value = self
            .post_json("/v2/invoices/cancel", &body, self.request_timeout)
            .await?;
        Ok(())
    }
}

/// Read a payment stream until LND reports a terminal status. Anything else
/// that ends the stream leaves the payment's fate unknown and is returned as
/// a non-`PaymentFailed` error.
async fn read_payment_stream(mut response: Response) -> NodeResult<PaymentResult> {
    let mut lines = LineBuffer::default();
    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        let (ready, ended) = match chunk {
            Some(chunk) => (lines.push(&chunk), false),
            None => (std::mem::take(&mut lines).finish().into_iter().collect(), true),
        };

        for line in ready {
            let Some(frame) = StreamFrame::<PaymentUpdate>::parse(&line) else {
                continue;
            };
            match frame?.progress() {
                PaymentProgress::InFlight => continue,
                PaymentProgress::Succeeded(result) => return Ok(result),
                PaymentProgress::Failed(reason) => return Err(NodeError::PaymentFailed(reason)),
            }
        }

        if ended {
            return Err(NodeError::Transport(
                "payment stream ended before a terminal status".to_string(),
            ));
        }
    }
}

/// Forward streamed invoice updates until the node closes the stream or the
/// subscriber goes away.
async fn pump_invoice_updates(
    id: PaymentHash,
    mut response: Response,
    tx: mpsc::Sender<NodeResult<Invoice>>,
) {
    let mut lines = LineBuffer::default();
    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => {
                debug!(payment_hash = %id, "Invoice subscription dropped");
                return;
            }
            chunk = response.chunk() => chunk,
        };

        let chunk = match chunk {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                let _ = tx
                    .send(Err(NodeError::Transport(
                        "invoice subscription closed by node".to_string(),
                    )))
                    .await;
                return;
            }
            Err(e) => {
                let _ = tx.send(Err(NodeError::Transport(e.to_string()))).await;
                return;
            }
        };

        for line in lines.push(&chunk) {
            let Some(frame) = StreamFrame::<InvoiceResponse>::parse(&line) else {
                continue;
            };
            if tx.send(frame.and_then(Invoice::try_from)).await.is_err() {
                return;
            }
        }
    }
}
