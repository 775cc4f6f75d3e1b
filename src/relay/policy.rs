// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay policy constants.

use std::time::Duration;

/// Parts-per-million divisor for proportional fees.
pub const RATE_DIVISOR: u128 = 1_000_000;

/// BOLT11 feature bits the relay is able to forward:
/// var_onion_optin (8/9), payment_secret (14/15), basic_mpp (16/17).
pub const KNOWN_FEATURE_BITS: [u32; 6] = [8, 9, 14, 15, 16, 17];

/// Tunables applied to every relay attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPolicy {
    /// Lowest final CLTV delta accepted on an inbound request.
    pub min_cltv_delta: u32,
    /// Highest final CLTV delta accepted on an inbound request.
    pub max_cltv_delta: u32,
    /// How long a request must still be valid for.
    pub min_expiry_margin: Duration,
    /// Smallest amount, in tokens, worth relaying.
    pub min_tokens: u64,
    pub known_feature_bits: Vec<u32>,
    /// Base fee used when no channel policy applies, and by the flat strategy.
    pub base_fee_mtokens: u64,
    /// Fee rate (ppm) used when no channel policy applies.
    pub fee_rate: u64,
    /// Blocks added on top of the route timelock for the hold invoice.
    pub cltv_padding: u32,
    /// Margin charged on every relay, regardless of the routing fee.
    pub premium_mtokens: u64,
    /// How much longer than the original request the hold invoice lives.
    pub hold_expiry_margin: Duration,
    pub probe_timeout: Duration,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            min_cltv_delta: 10,
            max_cltv_delta: 2016,
            min_expiry_margin: Duration::from_secs(600),
            min_tokens: 1,
            known_feature_bits: KNOWN_FEATURE_BITS.to_vec(),
            base_fee_mtokens: 1_000,
            fee_rate: 2_500,
            cltv_padding: 80,
            premium_mtokens: 2_000,
            hold_expiry_margin: Duration::from_secs(3_600),
            probe_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl RelayPolicy {
    pub fn is_known_feature(&self, bit: u32) -> bool {
        self.known_feature_bits.contains(&bit)
    }

    /// Proportional fee on `mtokens` at `fee_rate` ppm, rounded down.
    pub fn proportional_fee(mtokens: u64, fee_rate: u64) -> u64 {
        let fee = u128::from(mtokens) * u128::from(fee_rate) / RATE_DIVISOR;
        u64::try_from(fee).unwrap_or(u64::MAX)
    }
}
