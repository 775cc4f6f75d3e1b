// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment request validation.
//!
//! A request is decoded by the node and then checked, in order, failing on
//! the first violated rule:
//!
//! 1. CLTV delta present, within `[min_cltv_delta, max_cltv_delta]`
//! 2. Not expired, and valid for at least `min_expiry_margin`
//! 3. Amount of at least `min_tokens`
//! 4. At least one feature bit, all of them on the allow-list and known to the decoder

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::lnd::{DecodedPaymentRequest, LightningNode, NodeError};

use super::error::RelayError;
use super::policy::RelayPolicy;

/// Why a payment request is not eligible for relaying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("payment request could not be decoded: {0}")]
    Malformed(String),

    #[error("payment request has no CLTV delta")]
    MissingCltvDelta,

    #[error("CLTV delta {actual} is below the minimum of {min}")]
    CltvDeltaTooLow { actual: u32, min: u32 },

    #[error("CLTV delta {actual} is above the maximum of {max}")]
    CltvDeltaTooHigh { actual: u32, max: u32 },

    #[error("payment request expired at {expires_at}")]
    Expired { expires_at: DateTime<Utc> },

    #[error("payment request expires in {seconds_left}s, at least {min_seconds}s are required")]
    ExpiresSoon { seconds_left: i64, min_seconds: u64 },

    #[error("zero amount payment requests are not accepted")]
    ZeroAmount,

    #[error("payment request has no feature bits")]
    MissingFeatureBits,

    #[error("unexpected feature bit {bit} ({name})")]
    UnexpectedFeatureBit { bit: u32, name: String },
}

impl ValidationFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::Malformed(_) => "UnableToDecodePaymentRequest",
            ValidationFailure::MissingCltvDelta => "ExpectedCltvDeltaInThePaymentRequest",
            ValidationFailure::CltvDeltaTooLow { .. } => {
                "ExpectedHigherCltvDeltaInThePaymentRequest"
            }
            ValidationFailure::CltvDeltaTooHigh { .. } => "ExpectedLowerCltvDeltaInPaymentRequest",
            ValidationFailure::Expired { .. } => "ExpectedUnexpiredPaymentRequest",
            ValidationFailure::ExpiresSoon { .. } => "PaymentRequestExpiresSoon",
            ValidationFailure::ZeroAmount => "ZeroAmountPaymentRequestAreNotAccepted",
            ValidationFailure::MissingFeatureBits => "ExpectedFeatureBitsInPaymentRequest",
            ValidationFailure::UnexpectedFeatureBit { .. } => {
                "UnExpectedFeatureBitInPaymentRequest"
            }
        }
    }
}

/// Check a decoded request against the relay policy at time `now`.
pub fn validate(
    decoded: &DecodedPaymentRequest,
    policy: &RelayPolicy,
    now: DateTime<Utc>,
) -> Result<(), ValidationFailure> {
    let cltv_delta = decoded.cltv_delta.ok_or(ValidationFailure::MissingCltvDelta)?;
    if cltv_delta < policy.min_cltv_delta {
        return Err(ValidationFailure::CltvDeltaTooLow {
            actual: cltv_delta,
            min: policy.min_cltv_delta,
        });
    }
    if cltv_delta > policy.max_cltv_delta {
        return Err(ValidationFailure::CltvDeltaTooHigh {
            actual: cltv_delta,
            max: policy.max_cltv_delta,
        });
    }

    if decoded.expires_at <= now {
        return Err(ValidationFailure::Expired {
            expires_at: decoded.expires_at,
        });
    }
    let seconds_left = (decoded.expires_at - now).num_seconds();
    let min_seconds = policy.min_expiry_margin.as_secs();
    if u64::try_from(seconds_left).unwrap_or(0) < min_seconds {
        return Err(ValidationFailure::ExpiresSoon {
            seconds_left,
            min_seconds,
        });
    }

    if decoded.tokens < policy.min_tokens {
        return Err(ValidationFailure::ZeroAmount);
    }

    if decoded.features.is_empty() {
        return Err(ValidationFailure::MissingFeatureBits);
    }
    if let Some(feature) = decoded
        .features
        .iter()
        .find(|f| !policy.is_known_feature(f.bit) || !f.is_known)
    {
        return Err(ValidationFailure::UnexpectedFeatureBit {
            bit: feature.bit,
            name: feature.name.clone(),
        });
    }

    Ok(())
}

/// Decode `request` on the node and validate it.
pub async fn decode_and_validate(
    node: &dyn LightningNode,
    request: &str,
    policy: &RelayPolicy,
    now: DateTime<Utc>,
) -> Result<DecodedPaymentRequest, RelayError> {
    if request.trim().is_empty() {
        return Err(RelayError::MissingInput);
    }

    let decoded = match node.decode_payment_request(request).await {
        Ok(decoded) => decoded,
        Err(NodeError::Transport(reason)) => {
            return Err(RelayError::Node(NodeError::Transport(reason)))
        }
        Err(e) => return Err(ValidationFailure::Malformed(e.to_string()).into()),
    };

    validate(&decoded, policy, now)?;

    debug!(
        payment_hash = %decoded.id,
        destination = %decoded.destination,
        tokens = decoded.tokens,
        cltv_delta = ?decoded.cltv_delta,
        expires_at = %decoded.expires_at,
        "Payment request validated"
    );
    Ok(decoded)
}
