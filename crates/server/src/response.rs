//! JSON envelope shared by every API handler. Success and failure use the
//! same shape so voice-agent tooling can branch on `ok` alone.

use axum::{http::StatusCode, Json};
use loadline_core::errors::InterfaceError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { ok: true, data: Some(data), error: None })
    }
}

pub type ApiError = (StatusCode, Json<Envelope<serde_json::Value>>);

pub fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(Envelope { ok: false, data: None, error: Some(message.into()) }))
}

/// Map a classified interface error onto a status code and envelope. Bad
/// requests keep their detail; 5xx responses only expose the generic
/// user-safe message.
pub fn from_interface(interface: InterfaceError) -> ApiError {
    match interface {
        InterfaceError::BadRequest { .. } => error(StatusCode::BAD_REQUEST, interface.to_string()),
        InterfaceError::ServiceUnavailable { .. } => {
            error(StatusCode::SERVICE_UNAVAILABLE, interface.user_message())
        }
        InterfaceError::Internal { .. } => {
            error(StatusCode::INTERNAL_SERVER_ERROR, interface.user_message())
        }
    }
}
