// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::relay::{RelayError, RelayErrorKind};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable code.
    pub error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

fn status_for(kind: RelayErrorKind) -> StatusCode {
    match kind {
        RelayErrorKind::Validation => StatusCode::BAD_REQUEST,
        RelayErrorKind::Conflict => StatusCode::CONFLICT,
        RelayErrorKind::RouteUnavailable
        | RelayErrorKind::InvoiceCreation
        | RelayErrorKind::Upstream => StatusCode::SERVICE_UNAVAILABLE,
        RelayErrorKind::Settlement | RelayErrorKind::Cancellation => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self::new(status_for(err.kind()), err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}
