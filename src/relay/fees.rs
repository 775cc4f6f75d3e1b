// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay fee estimation.
//!
//! Two strategies, picked by whether the caller supplied a fee rate:
//!
//! - **Dynamic** (no override): probe a route to the destination, then
//!   charge the first hop channel's forwarding policy on the route amount.
//!   The route timelock also sets the hold invoice CLTV delta.
//! - **Flat** (override given): proportional fee at the given rate plus the
//!   default base fee. No probe round trip.
//!
//! Both add the fixed premium on top, kept separate in [`FeeQuote`] so the
//! downstream forward can be bounded by the routing fee alone.

use tracing::{debug, info};

use crate::lnd::{ChannelFeePolicy, DecodedPaymentRequest, LightningNode, Route, RouteProbe};

use super::error::RelayError;
use super::policy::RelayPolicy;

/// How the relay fee is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStrategy {
    Dynamic,
    Flat { fee_rate: u64 },
}

impl FeeStrategy {
    /// Flat when the caller supplied a fee rate, dynamic otherwise.
    pub fn select(max_fee_rate: Option<u64>) -> Self {
        match max_fee_rate {
            Some(fee_rate) => FeeStrategy::Flat { fee_rate },
            None => FeeStrategy::Dynamic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeeStrategy::Dynamic => "dynamic",
            FeeStrategy::Flat { .. } => "flat",
        }
    }
}

/// The relay's charge for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuote {
    pub strategy: FeeStrategy,
    /// Routing fee. Also the upper bound on what the forward may spend.
    pub fee_mtokens: u64,
    pub premium_mtokens: u64,
    /// Hold invoice CLTV delta derived from the probed route (dynamic only).
    pub cltv_delta: Option<u32>,
}

impl FeeQuote {
    /// Everything the relay adds on top of the original amount.
    pub fn total_mtokens(&self) -> u64 {
        self.fee_mtokens.saturating_add(self.premium_mtokens)
    }
}

/// Compute the fee quote for `decoded` with the selected strategy.
pub async fn estimate(
    node: &dyn LightningNode,
    decoded: &DecodedPaymentRequest,
    strategy: FeeStrategy,
    policy: &RelayPolicy,
) -> Result<FeeQuote, RelayError> {
    let quote = match strategy {
        FeeStrategy::Dynamic => dynamic_quote(node, decoded, policy).await?,
        FeeStrategy::Flat { fee_rate } => flat_quote(decoded, fee_rate, policy),
    };

    info!(
        payment_hash = %decoded.id,
        strategy = quote.strategy.name(),
        fee_mtokens = quote.fee_mtokens,
        premium_mtokens = quote.premium_mtokens,
        cltv_delta = ?quote.cltv_delta,
        "Relay fee computed"
    );
    Ok(quote)
}

fn flat_quote(decoded: &DecodedPaymentRequest, fee_rate: u64, policy: &RelayPolicy) -> FeeQuote {
    let fee_mtokens = RelayPolicy::proportional_fee(decoded.mtokens, fee_rate)
        .saturating_add(policy.base_fee_mtokens);

    FeeQuote {
        strategy: FeeStrategy::Flat { fee_rate },
        fee_mtokens,
        premium_mtokens: policy.premium_mtokens,
        cltv_delta: None,
    }
}

async fn dynamic_quote(
    node: &dyn LightningNode,
    decoded: &DecodedPaymentRequest,
    policy: &RelayPolicy,
) -> Result<FeeQuote, RelayError> {
    let fee_rates = node.get_fee_rates().await.map_err(RelayError::Node)?;
    let route = probe(node, decoded, policy).await?;
    let height = node.get_height().await.map_err(RelayError::Node)?;

    let fee_mtokens = route_fee(&route, &fee_rates, policy);
    let cltv_delta = route
        .timeout
        .saturating_sub(height)
        .saturating_add(policy.cltv_padding);

    Ok(FeeQuote {
        strategy: FeeStrategy::Dynamic,
        fee_mtokens,
        premium_mtokens: policy.premium_mtokens,
        cltv_delta: Some(cltv_delta),
    })
}

/// Confirm a path exists to the destination of `decoded`.
async fn probe(
    node: &dyn LightningNode,
    decoded: &DecodedPaymentRequest,
    policy: &RelayPolicy,
) -> Result<Route, RelayError> {
    let probe = RouteProbe {
        destination: decoded.destination.clone(),
        mtokens: decoded.mtokens,
        cltv_delta: decoded.cltv_delta.unwrap_or(policy.min_cltv_delta),
        features: decoded.features.iter().map(|f| f.bit).collect(),
        routes: decoded.routes.clone(),
        timeout: policy.probe_timeout,
    };

    match node.probe_for_route(&probe).await.map_err(RelayError::Node)? {
        Some(route) if !route.hops.is_empty() => {
            debug!(
                payment_hash = %decoded.id,
                hops = route.hops.len(),
                route_mtokens = route.mtokens,
                route_fee_mtokens = route.fee_mtokens,
                route_timeout = route.timeout,
                "Route found"
            );
            Ok(route)
        }
        _ => {
            info!(payment_hash = %decoded.id, destination = %decoded.destination, "No route to destination");
            Err(RelayError::NoRouteFound)
        }
    }
}

/// Fee charged on `route` under the policy of its first hop channel,
/// falling back to the defaults when the node does not report that channel.
fn route_fee(route: &Route, fee_rates: &[ChannelFeePolicy], policy: &RelayPolicy) -> u64 {
    let first_channel = route.hops.first().map(|hop| hop.channel_id);
    let (base_fee_mtokens, fee_rate) = fee_rates
        .iter()
        .find(|channel| Some(channel.channel_id) == first_channel)
        .map(|channel| (channel.base_fee_mtokens, channel.fee_rate))
        .unwrap_or((policy.base_fee_mtokens, policy.fee_rate));

    base_fee_mtokens.saturating_add(RelayPolicy::proportional_fee(route.mtokens, fee_rate))
}
