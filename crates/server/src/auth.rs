//! API-key gate for the webhook surface. Every `/api/v1` route requires the
//! configured key in the `x-api-key` header; the health endpoint runs on a
//! separate listener and stays open.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::response;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ApiKeyState {
    api_key: SecretString,
}

impl ApiKeyState {
    pub fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }
}

pub async fn require_api_key(
    State(state): State<ApiKeyState>,
    request: Request,
    next: Next,
) -> Response {
    let presented =
        request.headers().get(API_KEY_HEADER).and_then(|value| value.to_str().ok());

    match presented {
        Some(key) if key == state.api_key.expose_secret() => next.run(request).await,
        Some(_) => {
            warn!(
                event_name = "auth.api_key.rejected",
                path = %request.uri().path(),
                "request presented an invalid api key"
            );
            response::error(StatusCode::UNAUTHORIZED, "invalid API key").into_response()
        }
        None => {
            warn!(
                event_name = "auth.api_key.missing",
                path = %request.uri().path(),
                "request is missing the api key header"
            );
            response::error(StatusCode::UNAUTHORIZED, format!("missing {API_KEY_HEADER} header"))
                .into_response()
        }
    }
}
