// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HODL Relay - Non-custodial Lightning Payment Relay
//!
//! This crate issues hold invoices for marked-up BOLT11 requests and forwards
//! the original payment once the hold invoice is paid. The hold invoice is
//! settled only with the preimage revealed by a successful forward, and
//! canceled on every other outcome, so the relay never holds funds.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `config` - Environment configuration
//! - `lnd` - Lightning node RPC contract and LND REST client
//! - `relay` - Validation, fee estimation, hold invoice issuance and the HTLC coordinator

pub mod api;
pub mod config;
pub mod error;
pub mod lnd;
pub mod models;
pub mod relay;
pub mod state;
