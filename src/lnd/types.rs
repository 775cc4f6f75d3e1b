// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lightning types exchanged with the node.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 payment hash identifying an invoice and its HTLCs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaymentHash(pub [u8; 32]);

impl PaymentHash {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(PaymentHash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentHash({})", self.to_hex())
    }
}

impl FromStr for PaymentHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("invalid payment hash hex: {e}"))?;
        PaymentHash::from_slice(&bytes)
            .ok_or_else(|| format!("payment hash must be 32 bytes, got {}", bytes.len()))
    }
}

/// Payment preimage ("secret") releasing an HTLC.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Preimage(pub [u8; 32]);

impl Preimage {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Preimage)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn payment_hash(&self) -> PaymentHash {
        PaymentHash(Sha256::digest(self.0).into())
    }

    /// True when this preimage unlocks HTLCs locked to `hash`.
    pub fn unlocks(&self, hash: &PaymentHash) -> bool {
        self.payment_hash() == *hash
    }
}

// Never print secrets in logs.
impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Preimage(<redacted>)")
    }
}

/// A BOLT11 feature bit as reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureBit {
    pub bit: u32,
    pub name: String,
    pub is_known: bool,
    pub is_required: bool,
}

/// One hop of a private route hint carried in a payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHintHop {
    pub public_key: String,
    pub channel_id: u64,
    pub base_fee_mtokens: u64,
    pub fee_rate: u32,
    pub cltv_delta: u32,
}

/// A payment request as decoded by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPaymentRequest {
    /// Payment hash.
    pub id: PaymentHash,
    /// Destination node public key (hex).
    pub destination: String,
    pub tokens: u64,
    pub mtokens: u64,
    /// Final CLTV delta; `None` when the request carries none.
    pub cltv_delta: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub features: Vec<FeatureBit>,
    pub routes: Vec<Vec<RouteHintHop>>,
    pub description: Option<String>,
    /// Hex-encoded description hash.
    pub description_hash: Option<String>,
}

/// Forwarding policy the node applies on one of its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFeePolicy {
    pub channel_id: u64,
    pub base_fee_mtokens: u64,
    /// Proportional fee in parts per million.
    pub fee_rate: u64,
}

/// Constraints for a route probe towards a payment destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteProbe {
    pub destination: String,
    pub mtokens: u64,
    pub cltv_delta: u32,
    pub features: Vec<u32>,
    pub routes: Vec<Vec<RouteHintHop>>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHop {
    pub channel_id: u64,
}

/// A viable route found by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub hops: Vec<RouteHop>,
    /// Total amount sent including routing fees.
    pub mtokens: u64,
    pub fee_mtokens: u64,
    /// Absolute block height at which the first HTLC times out.
    pub timeout: u32,
}

/// Parameters for creating a hold invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HodlInvoiceParams {
    pub id: PaymentHash,
    pub mtokens: u64,
    pub cltv_delta: u32,
    pub expires_at: DateTime<Utc>,
    pub description: Option<String>,
    pub description_hash: Option<String>,
}

/// Result of creating a hold invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedHodlInvoice {
    pub id: PaymentHash,
    /// BOLT11 request for the hold invoice.
    pub request: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceState {
    Open,
    Accepted,
    Settled,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtlcState {
    Accepted,
    Settled,
    Canceled,
}

/// An HTLC paying into an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayment {
    pub channel_id: u64,
    pub mtokens: u64,
    pub state: HtlcState,
}

/// Snapshot of an invoice, as returned by lookups and lifecycle updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub id: PaymentHash,
    pub state: InvoiceState,
    pub mtokens: u64,
    pub received_mtokens: u64,
    pub payments: Vec<InvoicePayment>,
}

impl Invoice {
    /// The complete HTLC set is locked in and waiting to be settled or canceled.
    pub fn is_held(&self) -> bool {
        self.state == InvoiceState::Accepted && !self.payments.is_empty()
    }
}

/// Outcome of a successful downstream payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    /// `None` when the node reported success without a usable preimage.
    pub secret: Option<Preimage>,
    pub fee_mtokens: u64,
    pub mtokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub public_key: String,
    pub alias: String,
    pub current_block_height: u32,
    pub is_synced_to_chain: bool,
}
