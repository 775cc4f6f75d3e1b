// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LND REST gateway JSON shapes.
//!
//! The gateway encodes 64-bit integers as strings and byte fields as
//! standard base64. Conversions into the domain types in [`super::types`]
//! live next to each shape.

use std::collections::HashMap;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use super::error::NodeError;
use super::types::*;

/// LND's decoder reports this expiry when the request does not set one.
const DEFAULT_INVOICE_EXPIRY_SECS: i64 = 3600;

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

/// Accept `"123"`, `123`, `""` and `null` for 64-bit integer fields.
fn u64_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(0),
        Some(StringOrNumber::Number(n)) => Ok(n),
        Some(StringOrNumber::String(s)) if s.is_empty() => Ok(0),
        Some(StringOrNumber::String(s)) => s.parse().map_err(de::Error::custom),
    }
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, NodeError> {
    Base64::decode_vec(value)
        .map_err(|e| NodeError::InvalidResponse(format!("{field} is not base64: {e}")))
}

fn timestamp(field: &str, secs: i64) -> Result<DateTime<Utc>, NodeError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| NodeError::InvalidResponse(format!("{field} out of range: {secs}")))
}

// =============================================================================
// Errors and streams
// =============================================================================

/// Error body returned by the gateway (gRPC status mapped to JSON).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// gRPC `NOT_FOUND`.
const GRPC_NOT_FOUND: i32 = 5;

impl RestError {
    /// Classify a failed call from its HTTP status and body.
    pub fn classify(http_status: u16, body: &str) -> NodeError {
        let parsed: RestError = serde_json::from_str(body).unwrap_or_else(|_| RestError {
            code: 0,
            message: body.trim().to_string(),
        });
        parsed.into_node_error(http_status)
    }

    pub fn into_node_error(self, http_status: u16) -> NodeError {
        let message = if self.message.is_empty() {
            format!("status {http_status}")
        } else {
            self.message
        };
        let lowered = message.to_ascii_lowercase();

        if http_status == 404
            || self.code == GRPC_NOT_FOUND
            || lowered.contains("unable to locate invoice")
            || lowered.contains("there are no existing invoices")
        {
            NodeError::NotFound(message)
        } else if lowered.contains("unable to find a path") || lowered.contains("no route") {
            NodeError::NoRoute(message)
        } else if (400..500).contains(&http_status) || self.code != 0 {
            NodeError::Rejected(message)
        } else {
            NodeError::Transport(message)
        }
    }
}

/// One frame of a server-streaming call.
#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct StreamFrame<T> {
    pub result: Option<T>,
    pub error: Option<RestError>,
}

impl<T: DeserializeOwned> StreamFrame<T> {
    /// Parse one newline-delimited frame. Blank lines yield `None`.
    pub fn parse(line: &[u8]) -> Option<Result<T, NodeError>> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        let frame: StreamFrame<T> = match serde_json::from_slice(line) {
            Ok(frame) => frame,
            Err(e) => {
                return Some(Err(NodeError::InvalidResponse(format!(
                    "unparseable stream frame: {e}"
                ))))
            }
        };
        match (frame.result, frame.error) {
            (_, Some(error)) => Some(Err(error.into_node_error(500))),
            (Some(result), None) => Some(Ok(result)),
            (None, None) => Some(Err(NodeError::InvalidResponse(
                "stream frame without result".to_string(),
            ))),
        }
    }
}

/// Splits a byte stream into newline-terminated frames.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            lines.push(self.pending.drain(..=pos).collect());
        }
        lines
    }

    /// Whatever is left once the stream ends without a final newline.
    pub fn finish(self) -> Option<Vec<u8>> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

// =============================================================================
// Node info
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GetInfoResponse {
    #[serde(default)]
    pub identity_pubkey: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub block_height: u32,
    #[serde(default)]
    pub synced_to_chain: bool,
}

impl From<GetInfoResponse> for WalletInfo {
    fn from(info: GetInfoResponse) -> Self {
        WalletInfo {
            public_key: info.identity_pubkey,
            alias: info.alias,
            current_block_height: info.block_height,
            is_synced_to_chain: info.synced_to_chain,
        }
    }
}

// =============================================================================
// Payment requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_known: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HopHint {
    #[serde(default)]
    pub node_id: String,
    #[serde(default, deserialize_with = "u64_any")]
    pub chan_id: u64,
    #[serde(default)]
    pub fee_base_msat: u32,
    #[serde(default)]
    pub fee_proportional_millionths: u32,
    #[serde(default)]
    pub cltv_expiry_delta: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteHint {
    #[serde(default)]
    pub hop_hints: Vec<HopHint>,
}

impl From<HopHint> for RouteHintHop {
    fn from(hint: HopHint) -> Self {
        RouteHintHop {
            public_key: hint.node_id,
            channel_id: hint.chan_id,
            base_fee_mtokens: u64::from(hint.fee_base_msat),
            fee_rate: hint.fee_proportional_millionths,
            cltv_delta: hint.cltv_expiry_delta,
        }
    }
}

impl From<&RouteHintHop> for HopHint {
    fn from(hop: &RouteHintHop) -> Self {
        HopHint {
            node_id: hop.public_key.clone(),
            chan_id: hop.channel_id,
            fee_base_msat: u32::try_from(hop.base_fee_mtokens).unwrap_or(u32::MAX),
            fee_proportional_millionths: hop.fee_rate,
            cltv_expiry_delta: hop.cltv_delta,
        }
    }
}

/// `GET /v1/payreq/{pay_req}`
#[derive(Debug, Deserialize)]
pub struct PayReq {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub payment_hash: String,
    #[serde(default, deserialize_with = "u64_any")]
    pub num_satoshis: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub num_msat: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub timestamp: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub expiry: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_hash: String,
    #[serde(default, deserialize_with = "u64_any")]
    pub cltv_expiry: u64,
    #[serde(default)]
    pub route_hints: Vec<RouteHint>,
    #[serde(default)]
    pub features: HashMap<String, Feature>,
}

impl TryFrom<PayReq> for DecodedPaymentRequest {
    type Error = NodeError;

    fn try_from(req: PayReq) -> Result<Self, Self::Error> {
        let id: PaymentHash = req
            .payment_hash
            .parse()
            .map_err(|e: String| NodeError::InvalidResponse(e))?;

        let created_secs = i64::try_from(req.timestamp)
            .map_err(|_| NodeError::InvalidResponse("timestamp out of range".to_string()))?;
        let expiry_secs = match i64::try_from(req.expiry) {
            Ok(0) => DEFAULT_INVOICE_EXPIRY_SECS,
            Ok(secs) => secs,
            Err(_) => return Err(NodeError::InvalidResponse("expiry out of range".to_string())),
        };
        let created_at = timestamp("timestamp", created_secs)?;
        let expires_at = timestamp("expiry", created_secs.saturating_add(expiry_secs))?;

        let mut features = req
            .features
            .into_iter()
            .map(|(bit, feature)| {
                let bit = bit.parse::<u32>().map_err(|_| {
                    NodeError::InvalidResponse(format!("feature key {bit} is not a bit number"))
                })?;
                Ok(FeatureBit {
                    bit,
                    name: feature.name,
                    is_known: feature.is_known,
                    is_required: feature.is_required,
                })
            })
            .collect::<Result<Vec<_>, NodeError>>()?;
        features.sort_by_key(|f| f.bit);

        let mtokens = if req.num_msat > 0 {
            req.num_msat
        } else {
            req.num_satoshis.saturating_mul(1_000)
        };

        Ok(DecodedPaymentRequest {
            id,
            destination: req.destination,
            tokens: req.num_satoshis,
            mtokens,
            cltv_delta: u32::try_from(req.cltv_expiry).ok().filter(|d| *d > 0),
            created_at,
            expires_at,
            features,
            routes: req
                .route_hints
                .into_iter()
                .map(|hint| hint.hop_hints.into_iter().map(RouteHintHop::from).collect())
                .collect(),
            description: Some(req.description).filter(|d| !d.is_empty()),
            description_hash: Some(req.description_hash).filter(|d| !d.is_empty()),
        })
    }
}

// =============================================================================
// Invoices
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct InvoiceHtlc {
    #[serde(default, deserialize_with = "u64_any")]
    pub chan_id: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub amt_msat: u64,
    #[serde(default)]
    pub state: String,
}

/// `lnrpc.Invoice`
#[derive(Debug, Deserialize)]
pub struct InvoiceResponse {
    #[serde(default)]
    pub r_hash: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "u64_any")]
    pub value_msat: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub amt_paid_msat: u64,
    #[serde(default)]
    pub htlcs: Vec<InvoiceHtlc>,
}

fn invoice_state(raw: &str) -> Result<InvoiceState, NodeError> {
    match raw {
        "" | "OPEN" => Ok(InvoiceState::Open),
        "ACCEPTED" => Ok(InvoiceState::Accepted),
        "SETTLED" => Ok(InvoiceState::Settled),
        "CANCELED" => Ok(InvoiceState::Canceled),
        other => Err(NodeError::InvalidResponse(format!(
            "unknown invoice state {other}"
        ))),
    }
}

fn htlc_state(raw: &str) -> Result<HtlcState, NodeError> {
    match raw {
        "" | "ACCEPTED" => Ok(HtlcState::Accepted),
        "SETTLED" => Ok(HtlcState::Settled),
        "CANCELED" => Ok(HtlcState::Canceled),
        other => Err(NodeError::InvalidResponse(format!(
            "unknown htlc state {other}"
        ))),
    }
}

impl TryFrom<InvoiceResponse> for Invoice {
    type Error = NodeError;

    fn try_from(invoice: InvoiceResponse) -> Result<Self, Self::Error> {
        let hash = decode_base64("r_hash", &invoice.r_hash)?;
        let id = PaymentHash::from_slice(&hash)
            .ok_or_else(|| NodeError::InvalidResponse("r_hash must be 32 bytes".to_string()))?;

        let payments = invoice
            .htlcs
            .into_iter()
            .map(|htlc| {
                Ok(InvoicePayment {
                    channel_id: htlc.chan_id,
                    mtokens: htlc.amt_msat,
                    state: htlc_state(&htlc.state)?,
                })
            })
            .collect::<Result<Vec<_>, NodeError>>()?;

        Ok(Invoice {
            id,
            state: invoice_state(&invoice.state)?,
            mtokens: invoice.value_msat,
            received_mtokens: invoice.amt_paid_msat,
            payments,
        })
    }
}

/// `POST /v2/invoices/hodl`
#[derive(Debug, Serialize)]
pub struct AddHoldInvoiceRequest {
    pub hash: String,
    pub value_msat: String,
    pub expiry: String,
    pub cltv_expiry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_hash: Option<String>,
}

impl AddHoldInvoiceRequest {
    /// Build the request body; `now` anchors the relative expiry LND expects.
    pub fn new(params: &HodlInvoiceParams, now: DateTime<Utc>) -> Result<Self, NodeError> {
        let expiry = (params.expires_at - now).num_seconds();
        if expiry <= 0 {
            return Err(NodeError::Rejected(
                "hold invoice expiry is in the past".to_string(),
            ));
        }
        let description_hash = match &params.description_hash {
            Some(hash_hex) => {
                let bytes = hex::decode(hash_hex).map_err(|e| {
                    NodeError::Rejected(format!("description hash is not hex: {e}"))
                })?;
                Some(Base64::encode_string(&bytes))
            }
            None => None,
        };

        Ok(Self {
            hash: Base64::encode_string(params.id.as_bytes()),
            value_msat: params.mtokens.to_string(),
            expiry: expiry.to_string(),
            cltv_expiry: params.cltv_delta.to_string(),
            memo: params.description.clone(),
            description_hash,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddHoldInvoiceResponse {
    #[serde(default)]
    pub payment_request: String,
}

#[derive(Debug, Serialize)]
pub struct SettleInvoiceRequest {
    pub preimage: String,
}

#[derive(Debug, Serialize)]
pub struct CancelInvoiceRequest {
    pub payment_hash: String,
}

// =============================================================================
// Fees and routes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChannelFeeReport {
    #[serde(default, deserialize_with = "u64_any")]
    pub chan_id: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub base_fee_msat: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub fee_per_mil: u64,
}

/// `GET /v1/fees`
#[derive(Debug, Deserialize)]
pub struct FeeReportResponse {
    #[serde(default)]
    pub channel_fees: Vec<ChannelFeeReport>,
}

impl From<FeeReportResponse> for Vec<ChannelFeePolicy> {
    fn from(report: FeeReportResponse) -> Self {
        report
            .channel_fees
            .into_iter()
            .map(|channel| ChannelFeePolicy {
                channel_id: channel.chan_id,
                base_fee_mtokens: channel.base_fee_msat,
                fee_rate: channel.fee_per_mil,
            })
            .collect()
    }
}

/// `POST /v1/graph/routes`. The amount travels only as `amt_msat`; LND
/// rejects a query that also sets `amt`.
#[derive(Debug, Serialize)]
pub struct QueryRoutesRequest {
    pub pub_key: String,
    pub amt_msat: String,
    pub final_cltv_delta: u32,
    pub use_mission_control: bool,
    pub dest_features: Vec<u32>,
    pub route_hints: Vec<RouteHint>,
}

impl From<&RouteProbe> for QueryRoutesRequest {
    fn from(probe: &RouteProbe) -> Self {
        QueryRoutesRequest {
            pub_key: probe.destination.clone(),
            amt_msat: probe.mtokens.to_string(),
            final_cltv_delta: probe.cltv_delta,
            use_mission_control: true,
            dest_features: probe.features.clone(),
            route_hints: probe
                .routes
                .iter()
                .map(|route| RouteHint {
                    hop_hints: route.iter().map(HopHint::from).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Hop {
    #[serde(default, deserialize_with = "u64_any")]
    pub chan_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub total_time_lock: u32,
    #[serde(default, deserialize_with = "u64_any")]
    pub total_fees_msat: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub total_amt_msat: u64,
    #[serde(default)]
    pub hops: Vec<Hop>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRoutesResponse {
    #[serde(default)]
    pub routes: Vec<RouteResponse>,
}

impl From<RouteResponse> for Route {
    fn from(route: RouteResponse) -> Self {
        Route {
            hops: route
                .hops
                .into_iter()
                .map(|hop| RouteHop {
                    channel_id: hop.chan_id,
                })
                .collect(),
            mtokens: route.total_amt_msat,
            fee_mtokens: route.total_fees_msat,
            timeout: route.total_time_lock,
        }
    }
}

impl QueryRoutesResponse {
    /// First route with at least one hop.
    pub fn best_route(self) -> Option<Route> {
        self.routes
            .into_iter()
            .find(|route| !route.hops.is_empty())
            .map(Route::from)
    }
}

// =============================================================================
// Payments
// =============================================================================

/// `POST /v2/router/send`
#[derive(Debug, Serialize)]
pub struct SendPaymentRequest {
    pub payment_request: String,
    pub fee_limit_msat: String,
    pub timeout_seconds: i32,
    pub no_inflight_updates: bool,
}

/// `lnrpc.Payment`, streamed until terminal.
#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub payment_preimage: String,
    #[serde(default, deserialize_with = "u64_any")]
    pub value_msat: u64,
    #[serde(default, deserialize_with = "u64_any")]
    pub fee_msat: u64,
    #[serde(default)]
    pub failure_reason: String,
}

/// Where a payment stands after one streamed update.
#[derive(Debug, PartialEq, Eq)]
pub enum PaymentProgress {
    InFlight,
    Succeeded(PaymentResult),
    Failed(String),
}

impl PaymentUpdate {
    pub fn progress(self) -> PaymentProgress {
        match self.status.as_str() {
            "SUCCEEDED" => {
                // All-zero preimages come back for payments that never settled.
                let secret = hex::decode(&self.payment_preimage)
                    .ok()
                    .and_then(|bytes| Preimage::from_slice(&bytes))
                    .filter(|secret| secret.as_bytes() != &[0u8; 32]);
                PaymentProgress::Succeeded(PaymentResult {
                    secret,
                    fee_mtokens: self.fee_msat,
                    mtokens: self.value_msat,
                })
            }
            "FAILED" => PaymentProgress::Failed(if self.failure_reason.is_empty() {
                "FAILURE_REASON_UNKNOWN".to_string()
            } else {
                self.failure_reason
            }),
            _ => PaymentProgress::InFlight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HASH_HEX: &str = "f8a1e5a0a6b36be1b7f4c3b0c7f2ab8e43ad5a6f0dbd36f4a8c0a2bf1e0d9c11";

    fn payreq_json() -> serde_json::Value {
        json!({
            "destination": "03abcdef",
            "payment_hash": HASH_HEX,
            "num_satoshis": "100000",
            "timestamp": "1760000000",
            "expiry": "86400",
            "description": "coffee",
            "description_hash": "",
            "fallback_addr": "",
            "cltv_expiry": "40",
            "route_hints": [{
                "hop_hints": [{
                    "node_id": "02feed",
                    "chan_id": "824812993839104001",
                    "fee_base_msat": 1000,
                    "fee_proportional_millionths": 100,
                    "cltv_expiry_delta": 144
                }]
            }],
            "payment_addr": "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=",
            "num_msat": "100000000",
            "features": {
                "9": { "name": "tlv-onion", "is_required": false, "is_known": true },
                "14": { "name": "payment-addr", "is_required": true, "is_known": true }
            }
        })
    }

    #[test]
    fn payreq_converts_into_decoded_request() {
        let payreq: PayReq = serde_json::from_value(payreq_json()).unwrap();
        let decoded = DecodedPaymentRequest::try_from(payreq).unwrap();

        assert_eq!(decoded.id.to_hex(), HASH_HEX);
        assert_eq!(decoded.tokens, 100_000);
        assert_eq!(decoded.mtokens, 100_000_000);
        assert_eq!(decoded.cltv_delta, Some(40));
        assert_eq!(
            (decoded.expires_at - decoded.created_at).num_seconds(),
            86_400
        );
        assert_eq!(
            decoded.features.iter().map(|f| f.bit).collect::<Vec<_>>(),
            vec![9, 14]
        );
        assert_eq!(decoded.routes[0][0].channel_id, 824_812_993_839_104_001);
        assert_eq!(decoded.routes[0][0].cltv_delta, 144);
        assert_eq!(decoded.description.as_deref(), Some("coffee"));
        assert_eq!(decoded.description_hash, None);
    }

    #[test]
    fn payreq_without_cltv_or_expiry_uses_node_defaults() {
        let mut raw = payreq_json();
        raw["cltv_expiry"] = json!("0");
        raw["expiry"] = json!("0");
        let decoded = DecodedPaymentRequest::try_from(
            serde_json::from_value::<PayReq>(raw).unwrap(),
        )
        .unwrap();

        assert_eq!(decoded.cltv_delta, None);
        assert_eq!(
            (decoded.expires_at - decoded.created_at).num_seconds(),
            DEFAULT_INVOICE_EXPIRY_SECS
        );
    }

    #[test]
    fn invoice_response_reports_held_htlcs() {
        let raw = json!({
            "r_hash": Base64::encode_string(&[9u8; 32]),
            "state": "ACCEPTED",
            "value_msat": "100253000",
            "amt_paid_msat": "100253000",
            "htlcs": [{ "chan_id": "12345", "amt_msat": "100253000", "state": "ACCEPTED" }]
        });
        let invoice =
            Invoice::try_from(serde_json::from_value::<InvoiceResponse>(raw).unwrap()).unwrap();

        assert_eq!(invoice.id, PaymentHash([9u8; 32]));
        assert!(invoice.is_held());
        assert_eq!(invoice.payments[0].channel_id, 12_345);
    }

    #[test]
    fn rest_errors_are_classified() {
        assert!(RestError::classify(404, "{}").is_not_found());
        assert!(RestError::classify(
            500,
            r#"{"code":2,"message":"unable to locate invoice"}"#
        )
        .is_not_found());
        assert!(matches!(
            RestError::classify(500, r#"{"code":2,"message":"unable to find a path to destination"}"#),
            NodeError::NoRoute(_)
        ));
        assert!(matches!(
            RestError::classify(400, r#"{"code":3,"message":"invalid index"}"#),
            NodeError::Rejected(_)
        ));
        assert!(matches!(
            RestError::classify(502, "bad gateway"),
            NodeError::Transport(_)
        ));
    }

    #[test]
    fn route_query_sends_amount_once_in_msat() {
        let probe = RouteProbe {
            destination: "03abcdef".into(),
            mtokens: 100_000_500,
            cltv_delta: 40,
            features: vec![9, 14],
            routes: vec![],
            timeout: std::time::Duration::from_secs(300),
        };
        let body = serde_json::to_value(QueryRoutesRequest::from(&probe)).unwrap();

        assert_eq!(body["pub_key"], "03abcdef");
        assert_eq!(body["amt_msat"], "100000500");
        assert_eq!(body["final_cltv_delta"], 40);
        assert!(body.get("amt").is_none());
    }

    #[test]
    fn line_buffer_splits_partial_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"result\":").is_empty());
        let lines = buffer.push(b"{}}\n{\"error\":{}}\n{\"res");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], b"{\"result\":{}}\n".to_vec());
        assert_eq!(buffer.finish(), Some(b"{\"res".to_vec()));
    }

    #[test]
    fn stream_frames_carry_results_and_errors() {
        let ok = StreamFrame::<GetInfoResponse>::parse(br#"{"result":{"alias":"relay"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(ok.alias, "relay");

        let err = StreamFrame::<GetInfoResponse>::parse(
            br#"{"error":{"code":2,"message":"invoice not found"}}"#,
        )
        .unwrap();
        assert!(err.is_err());

        assert!(StreamFrame::<GetInfoResponse>::parse(b"\n").is_none());
    }

    #[test]
    fn payment_updates_map_to_progress() {
        let secret = [3u8; 32];
        let succeeded = PaymentUpdate {
            status: "SUCCEEDED".into(),
            payment_preimage: hex::encode(secret),
            value_msat: 100_000_000,
            fee_msat: 1_200,
            failure_reason: String::new(),
        };
        match succeeded.progress() {
            PaymentProgress::Succeeded(result) => {
                assert_eq!(result.secret, Some(Preimage(secret)));
                assert_eq!(result.fee_mtokens, 1_200);
            }
            other => panic!("unexpected progress {other:?}"),
        }

        let zeroed = PaymentUpdate {
            status: "SUCCEEDED".into(),
            payment_preimage: "00".repeat(32),
            value_msat: 0,
            fee_msat: 0,
            failure_reason: String::new(),
        };
        assert!(matches!(
            zeroed.progress(),
            PaymentProgress::Succeeded(PaymentResult { secret: None, .. })
        ));

        let failed = PaymentUpdate {
            status: "FAILED".into(),
            payment_preimage: String::new(),
            value_msat: 0,
            fee_msat: 0,
            failure_reason: "FAILURE_REASON_NO_ROUTE".into(),
        };
        assert_eq!(
            failed.progress(),
            PaymentProgress::Failed("FAILURE_REASON_NO_ROUTE".into())
        );
    }

    #[test]
    fn hold_invoice_request_uses_relative_expiry() {
        let now = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        let params = HodlInvoiceParams {
            id: PaymentHash([1u8; 32]),
            mtokens: 100_253_000,
            cltv_delta: 120,
            expires_at: now + chrono::Duration::seconds(7_200),
            description: Some("coffee".into()),
            description_hash: None,
        };
        let body = AddHoldInvoiceRequest::new(&params, now).unwrap();
        assert_eq!(body.expiry, "7200");
        assert_eq!(body.value_msat, "100253000");
        assert_eq!(body.cltv_expiry, "120");

        let stale = HodlInvoiceParams {
            expires_at: now - chrono::Duration::seconds(1),
            ..params
        };
        assert!(AddHoldInvoiceRequest::new(&stale, now).is_err());
    }
}
