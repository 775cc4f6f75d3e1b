// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `ToSchema`
//! for the OpenAPI documentation served at `/docs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::relay::HoldInvoice;

/// Request to relay a BOLT11 payment request through a hold invoice.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RelayInvoiceRequest {
    /// BOLT11 payment request to be paid once the hold invoice is.
    pub request: String,
    /// Flat fee rate in parts per million. When omitted the fee is derived
    /// from a probed route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_rate: Option<u64>,
}

/// Hold invoice the payer should pay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct HoldInvoiceResponse {
    /// Payment hash, hex encoded. Same as the relayed request's.
    pub id: String,
    /// BOLT11 request of the hold invoice.
    pub request: String,
    pub tokens: u64,
    pub mtokens: u64,
    /// Routing fee included in the amount, excluding the premium.
    pub fee_mtokens: u64,
    pub cltv_delta: u32,
    pub expires_at: DateTime<Utc>,
}

impl From<HoldInvoice> for HoldInvoiceResponse {
    fn from(invoice: HoldInvoice) -> Self {
        Self {
            id: invoice.id.to_hex(),
            request: invoice.request,
            tokens: invoice.tokens,
            mtokens: invoice.mtokens,
            fee_mtokens: invoice.fee_mtokens,
            cltv_delta: invoice.cltv_delta,
            expires_at: invoice.expires_at,
        }
    }
}
