// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::{
    error::{ApiError, ErrorBody},
    models::{HoldInvoiceResponse, RelayInvoiceRequest},
    state::AppState,
};

/// Relay a BOLT11 request.
///
/// Returns a hold invoice for the request amount plus the relay fee. The
/// original request is paid once the hold invoice is, and the hold invoice
/// settles only if that payment succeeds.
#[utoipa::path(
    post,
    path = "/v1/invoices",
    request_body = RelayInvoiceRequest,
    tag = "Relay",
    responses(
        (status = 201, description = "Hold invoice created", body = HoldInvoiceResponse),
        (status = 400, description = "Invalid payment request", body = ErrorBody),
        (status = 409, description = "Payment hash already in use", body = ErrorBody),
        (status = 503, description = "No route or node unavailable", body = ErrorBody)
    )
)]
pub async fn create_hold_invoice(
    State(state): State<AppState>,
    Json(body): Json<RelayInvoiceRequest>,
) -> Result<(StatusCode, Json<HoldInvoiceResponse>), ApiError> {
    let invoice = state
        .relay
        .relay(&body.request, body.max_fee_rate)
        .await
        .map_err(|e| {
            warn!(error_code = e.code(), error = %e, "Relay request failed");
            ApiError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(invoice.into())))
}
