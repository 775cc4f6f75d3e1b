// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hold invoice issuance.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::lnd::{DecodedPaymentRequest, HodlInvoiceParams, LightningNode, NodeError, PaymentHash};

use super::error::RelayError;
use super::fees::FeeQuote;
use super::policy::RelayPolicy;

/// The relay's own invoice, sharing the payment hash of the request it relays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldInvoice {
    pub id: PaymentHash,
    /// BOLT11 request the payer should pay.
    pub request: String,
    /// Amount in whole tokens, rounded up.
    pub tokens: u64,
    pub mtokens: u64,
    /// Routing fee part of the markup, excluding the premium.
    pub fee_mtokens: u64,
    pub cltv_delta: u32,
    pub expires_at: DateTime<Utc>,
}

/// Parameters of the hold invoice backing `decoded` under `quote`.
pub fn hold_invoice_params(
    decoded: &DecodedPaymentRequest,
    quote: &FeeQuote,
    policy: &RelayPolicy,
) -> Result<HodlInvoiceParams, RelayError> {
    let mtokens = decoded
        .mtokens
        .checked_add(quote.total_mtokens())
        .ok_or_else(|| {
            RelayError::InvoiceCreationFailed(NodeError::Rejected(
                "hold invoice amount overflows".into(),
            ))
        })?;

    // Flat quotes never probed a route, so pad the request's own delta.
    let cltv_delta = quote.cltv_delta.unwrap_or_else(|| {
        decoded
            .cltv_delta
            .unwrap_or(policy.min_cltv_delta)
            .saturating_add(policy.cltv_padding)
    });

    let margin = Duration::from_std(policy.hold_expiry_margin).unwrap_or(Duration::hours(1));

    Ok(HodlInvoiceParams {
        id: decoded.id,
        mtokens,
        cltv_delta,
        expires_at: decoded.expires_at + margin,
        description: decoded.description.clone(),
        description_hash: decoded.description_hash.clone(),
    })
}

/// Create the hold invoice on the node.
pub async fn issue(
    node: &dyn LightningNode,
    decoded: &DecodedPaymentRequest,
    quote: &FeeQuote,
    policy: &RelayPolicy,
) -> Result<HoldInvoice, RelayError> {
    let params = hold_invoice_params(decoded, quote, policy)?;

    let created = node
        .create_hodl_invoice(&params)
        .await
        .map_err(RelayError::InvoiceCreationFailed)?;

    info!(
        payment_hash = %created.id,
        mtokens = params.mtokens,
        original_mtokens = decoded.mtokens,
        cltv_delta = params.cltv_delta,
        expires_at = %params.expires_at,
        "Hold invoice created"
    );

    Ok(HoldInvoice {
        id: created.id,
        request: created.request,
        tokens: params.mtokens.div_ceil(1_000),
        mtokens: params.mtokens,
        fee_mtokens: quote.fee_mtokens,
        cltv_delta: params.cltv_delta,
        expires_at: params.expires_at,
    })
}
