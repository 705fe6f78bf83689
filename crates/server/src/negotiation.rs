//! Stateless negotiation endpoints.
//!
//! - `POST /api/v1/negotiation/evaluate` — run one policy round
//! - `GET  /api/v1/negotiation/summary`  — derived figures for a listed rate
//!
//! These carry no call state; the voice agent supplies the round number and
//! rates on every hit. Stateful per-call negotiation lives in `calls`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use loadline_core::negotiation::{NegotiationRequest, PolicySnapshot, RateDecision, RatePolicy};

use crate::response::{self, ApiError, Envelope};

#[derive(Clone)]
pub struct NegotiationState {
    pub policy: Arc<RatePolicy>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub listed_rate: Decimal,
    pub carrier_ask: Decimal,
    #[serde(default = "first_round")]
    pub round_number: u32,
    pub market_average: Option<Decimal>,
    pub broker_maximum: Option<Decimal>,
}

fn first_round() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub listed_rate: Decimal,
    pub market_average: Option<Decimal>,
}

pub fn router(state: NegotiationState) -> Router {
    Router::new()
        .route("/api/v1/negotiation/evaluate", post(evaluate))
        .route("/api/v1/negotiation/summary", get(summary))
        .with_state(state)
}

async fn evaluate(
    State(state): State<NegotiationState>,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<Envelope<RateDecision>>, ApiError> {
    let request = NegotiationRequest {
        listed_rate: body.listed_rate,
        carrier_ask: body.carrier_ask,
        round_number: body.round_number,
        market_average: body.market_average,
        broker_maximum: body.broker_maximum,
    };

    let decision = state
        .policy
        .evaluate(&request)
        .map_err(|error| response::error(StatusCode::BAD_REQUEST, error.to_string()))?;

    info!(
        event_name = "negotiation.evaluate",
        round = decision.round,
        outcome = decision.outcome.as_str(),
        listed_rate = %decision.quoted_rate,
        carrier_ask = %body.carrier_ask,
        "stateless negotiation round evaluated"
    );

    Ok(Envelope::ok(decision))
}

async fn summary(
    State(state): State<NegotiationState>,
    Query(query): Query<SummaryQuery>,
) -> Json<Envelope<PolicySnapshot>> {
    Envelope::ok(state.policy.summary(query.listed_rate, query.market_average))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use loadline_core::negotiation::RatePolicy;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use super::{router, NegotiationState};

    fn app() -> axum::Router {
        router(NegotiationState { policy: Arc::new(RatePolicy::default()) })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn evaluate_counters_a_high_first_ask() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/negotiation/evaluate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"listed_rate": "2000", "carrier_ask": "2500", "round_number": 1}"#,
            ))
            .expect("request");

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["data"]["outcome"], "counter");
        assert_eq!(
            body["data"]["counter_offer"].as_str().map(str::parse::<Decimal>),
            Some(Ok(Decimal::from(2130)))
        );
    }

    #[tokio::test]
    async fn evaluate_defaults_to_round_one() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/negotiation/evaluate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"listed_rate": "2000", "carrier_ask": "2050"}"#))
            .expect("request");

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"]["outcome"], "accept");
        assert_eq!(body["data"]["round"], 1);
    }

    #[tokio::test]
    async fn evaluate_rejects_nonpositive_rates() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/negotiation/evaluate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"listed_rate": "0", "carrier_ask": "2500"}"#))
            .expect("request");

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().expect("error message").contains("listed_rate"));
    }

    #[tokio::test]
    async fn summary_reports_derived_figures() {
        let request = Request::builder()
            .uri("/api/v1/negotiation/summary?listed_rate=2000")
            .body(Body::empty())
            .expect("request");

        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let data = &body["data"];
        assert_eq!(data["acceptance_threshold"].as_str().map(str::parse::<Decimal>),
            Some(Ok(Decimal::new(2100, 0))));
        assert_eq!(data["broker_maximum"].as_str().map(str::parse::<Decimal>),
            Some(Ok(Decimal::from(2400))));
        assert_eq!(data["max_rounds"], 3);
    }
}
