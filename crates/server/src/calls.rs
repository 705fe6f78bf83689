//! Stateful call-lifecycle endpoints, one hit per voice-agent webhook.
//!
//! - `POST /api/v1/calls/{call_id}/start`     — open (or resume) a call session
//! - `POST /api/v1/calls/{call_id}/mc`        — verify the carrier's MC number
//! - `POST /api/v1/calls/{call_id}/search`    — find and present a load
//! - `POST /api/v1/calls/{call_id}/negotiate` — run one negotiation round
//! - `GET  /api/v1/calls/{call_id}/summary`   — post-call record and analytics
//!
//! Each handler re-reads the session, applies one state-machine transition,
//! and persists before responding. The policy engine itself stays stateless;
//! the round counter lives in the session.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use loadline_core::conversation::{
    analytics, CallSession, CarrierCallFlow, ConversationContext, ConversationEvent,
    ConversationFlow, ConversationState, NegotiationHistoryEntry,
};
use loadline_core::domain::call::{CallId, CallOutcome, CallRecord};
use loadline_core::domain::carrier::{CarrierVerification, VerificationStatus};
use loadline_core::domain::load::{EquipmentType, Load, LoadSearchCriteria};
use loadline_core::errors::ApplicationError;
use loadline_core::negotiation::{
    NegotiationOutcome, NegotiationRequest, RateDecision, RatePolicy,
};
use loadline_db::repositories::{
    CallRepository, ConversationRepository, LoadRepository, NegotiationEventRecord,
    RepositoryError,
};
use loadline_fmcsa::{CarrierVerifier, FmcsaError};

use crate::response::{self, ApiError, Envelope};

const DEFAULT_SEARCH_LIMIT: u32 = 3;

#[derive(Clone)]
pub struct CallsState {
    pub policy: Arc<RatePolicy>,
    pub verifier: Arc<dyn CarrierVerifier>,
    pub loads: Arc<dyn LoadRepository>,
    pub calls: Arc<dyn CallRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
}

pub fn router(state: CallsState) -> Router {
    Router::new()
        .route("/api/v1/calls/{call_id}/start", post(start))
        .route("/api/v1/calls/{call_id}/mc", post(provide_mc))
        .route("/api/v1/calls/{call_id}/search", post(search_loads))
        .route("/api/v1/calls/{call_id}/negotiate", post(negotiate))
        .route("/api/v1/calls/{call_id}/summary", get(summary))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub call_id: String,
    pub state: ConversationState,
    pub resumed: bool,
}

#[derive(Debug, Deserialize)]
pub struct McRequest {
    pub mc_number: String,
}

#[derive(Debug, Serialize)]
pub struct McResponse {
    pub call_id: String,
    pub state: ConversationState,
    pub verification: CarrierVerification,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub origin_city: Option<String>,
    pub origin_state: Option<String>,
    pub destination_city: Option<String>,
    pub destination_state: Option<String>,
    pub equipment_type: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub call_id: String,
    pub state: ConversationState,
    pub loads: Vec<Load>,
    pub presented: Option<Load>,
    pub search_widened: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct NegotiateRequest {
    pub carrier_ask: Decimal,
    pub market_average: Option<Decimal>,
    pub broker_maximum: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct NegotiateResponse {
    pub call_id: String,
    pub state: ConversationState,
    pub event: ConversationEvent,
    pub decision: RateDecision,
}

#[derive(Debug, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub carrier_ask: Decimal,
    pub outcome: NegotiationOutcome,
    pub counter_offer: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CallSummaryResponse {
    pub call_id: String,
    pub state: ConversationState,
    pub carrier_mc: Option<String>,
    pub carrier_name: Option<String>,
    pub fmcsa_status: Option<VerificationStatus>,
    pub presented_load_id: Option<String>,
    pub listed_rate: Option<Decimal>,
    pub outcome: CallOutcome,
    pub final_rate: Option<Decimal>,
    pub negotiation_rounds: u32,
    pub sentiment: analytics::Sentiment,
    pub rate_sensitivity: analytics::RateSensitivity,
    pub aggressiveness: analytics::Aggressiveness,
    pub rounds: Vec<RoundSummary>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn start(
    Path(call_id): Path<String>,
    State(state): State<CallsState>,
) -> Result<Json<Envelope<StartResponse>>, ApiError> {
    let call_id = CallId(call_id);

    if let Some(existing) = state
        .conversations
        .find(&call_id)
        .await
        .map_err(|e| persistence(&call_id, e))?
    {
        return Ok(Envelope::ok(StartResponse {
            call_id: call_id.0,
            state: existing.state,
            resumed: true,
        }));
    }

    let now = Utc::now();
    let session = CallSession::new(call_id.clone(), now);
    let record = CallRecord::new(call_id.clone(), now);

    state.conversations.save(session.clone()).await.map_err(|e| persistence(&call_id, e))?;
    state.calls.save(record).await.map_err(|e| persistence(&call_id, e))?;

    info!(
        event_name = "calls.session.started",
        correlation_id = %call_id.0,
        call_id = %call_id.0,
        "call session opened"
    );

    Ok(Envelope::ok(StartResponse { call_id: call_id.0, state: session.state, resumed: false }))
}

async fn provide_mc(
    Path(call_id): Path<String>,
    State(state): State<CallsState>,
    Json(body): Json<McRequest>,
) -> Result<Json<Envelope<McResponse>>, ApiError> {
    let call_id = CallId(call_id);
    let now = Utc::now();
    let mut session = load_session(&state, &call_id).await?;

    apply_event(&mut session, ConversationEvent::McProvided, now)?;

    let verification = match state.verifier.verify(&body.mc_number).await {
        Ok(verification) => verification,
        Err(FmcsaError::InvalidMcNumber(_)) => {
            return Err(response::error(
                StatusCode::BAD_REQUEST,
                format!("`{}` is not a valid MC number", body.mc_number),
            ));
        }
        Err(other) => {
            error!(
                event_name = "calls.mc.registry_failed",
                correlation_id = %call_id.0,
                call_id = %call_id.0,
                error = %other,
                "carrier registry lookup failed"
            );
            return Err(response::from_interface(
                ApplicationError::Integration(other.to_string()).into_interface(call_id.0.clone()),
            ));
        }
    };

    let event = if verification.eligible {
        ConversationEvent::McVerified
    } else {
        ConversationEvent::McRejected
    };
    apply_event(&mut session, event, now)?;

    session.carrier_mc = Some(verification.mc_number.clone());
    session.carrier_name = verification.carrier_name.clone();

    let mut record = load_record(&state, &call_id).await?;
    record.carrier_mc = Some(verification.mc_number.clone());
    record.carrier_name = verification.carrier_name.clone();
    record.fmcsa_status = Some(verification.status());
    record.updated_at = now;

    state.conversations.save(session.clone()).await.map_err(|e| persistence(&call_id, e))?;
    state.calls.save(record).await.map_err(|e| persistence(&call_id, e))?;

    info!(
        event_name = "calls.mc.verified",
        correlation_id = %call_id.0,
        call_id = %call_id.0,
        mc_number = %verification.mc_number,
        eligible = verification.eligible,
        "carrier eligibility checked"
    );

    Ok(Envelope::ok(McResponse { call_id: call_id.0, state: session.state, verification }))
}

async fn search_loads(
    Path(call_id): Path<String>,
    State(state): State<CallsState>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Envelope<SearchResponse>>, ApiError> {
    let call_id = CallId(call_id);
    let now = Utc::now();
    let mut session = load_session(&state, &call_id).await?;

    let equipment = body
        .equipment_type
        .as_deref()
        .map(EquipmentType::from_str)
        .transpose()
        .map_err(|error| response::error(StatusCode::BAD_REQUEST, error.to_string()))?;

    let criteria = LoadSearchCriteria {
        origin_city: body.origin_city,
        origin_state: body.origin_state,
        destination_city: body.destination_city,
        destination_state: body.destination_state,
        equipment_type: equipment,
        limit: body.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
    };

    let mut loads =
        state.loads.search(&criteria).await.map_err(|e| persistence(&call_id, e))?;

    // Exact lane came up empty: retry at state level so the agent can offer
    // nearby alternatives instead of ending the call.
    let mut widened = false;
    if loads.is_empty() && (criteria.origin_city.is_some() || criteria.destination_city.is_some())
    {
        loads = state
            .loads
            .search(&criteria.state_level())
            .await
            .map_err(|e| persistence(&call_id, e))?;
        widened = true;
    }

    if loads.is_empty() {
        apply_event(&mut session, ConversationEvent::NoLoadsMatched, now)?;
        state.conversations.save(session.clone()).await.map_err(|e| persistence(&call_id, e))?;

        info!(
            event_name = "calls.search.empty",
            correlation_id = %call_id.0,
            call_id = %call_id.0,
            "no loads matched, call failed"
        );

        return Ok(Envelope::ok(SearchResponse {
            call_id: call_id.0,
            state: session.state,
            loads: Vec::new(),
            presented: None,
            search_widened: widened,
            message: "no matching loads are available right now".to_string(),
        }));
    }

    apply_event(&mut session, ConversationEvent::LoadsFound, now)?;

    let presented = loads[0].clone();
    session.presented_load_id = Some(presented.id.clone());
    session.listed_rate = Some(presented.total_rate);
    state.conversations.save(session.clone()).await.map_err(|e| persistence(&call_id, e))?;

    info!(
        event_name = "calls.search.presented",
        correlation_id = %call_id.0,
        call_id = %call_id.0,
        load_id = %presented.id.0,
        listed_rate = %presented.total_rate,
        search_widened = widened,
        "load presented to carrier"
    );

    let message = if widened {
        format!("nothing on that exact lane; here are nearby options like {}", presented.lane())
    } else {
        format!("found {} load(s), starting with {}", loads.len(), presented.lane())
    };

    Ok(Envelope::ok(SearchResponse {
        call_id: call_id.0,
        state: session.state,
        loads,
        presented: Some(presented),
        search_widened: widened,
        message,
    }))
}

async fn negotiate(
    Path(call_id): Path<String>,
    State(state): State<CallsState>,
    Json(body): Json<NegotiateRequest>,
) -> Result<Json<Envelope<NegotiateResponse>>, ApiError> {
    let call_id = CallId(call_id);
    let now = Utc::now();
    let mut session = load_session(&state, &call_id).await?;

    let Some(listed_rate) = session.listed_rate else {
        return Err(response::error(
            StatusCode::BAD_REQUEST,
            "no load has been presented on this call; search for a load first",
        ));
    };

    let round = session.negotiation_rounds + 1;
    let request = NegotiationRequest {
        listed_rate,
        carrier_ask: body.carrier_ask,
        round_number: round,
        market_average: body.market_average,
        broker_maximum: body.broker_maximum,
    };
    let decision = state
        .policy
        .evaluate(&request)
        .map_err(|error| response::error(StatusCode::BAD_REQUEST, error.to_string()))?;

    let max_rounds = state.policy.config().max_rounds;
    let event = match decision.outcome {
        NegotiationOutcome::Accept => ConversationEvent::AskAccepted,
        NegotiationOutcome::Reject => ConversationEvent::NegotiationFailed,
        // The next round would be terminal, so this counter is the final offer.
        NegotiationOutcome::Counter if round + 1 >= max_rounds => {
            ConversationEvent::FinalOfferIssued
        }
        NegotiationOutcome::Counter => ConversationEvent::CounterIssued,
    };
    apply_event(&mut session, event, now)?;

    session.record_round(
        NegotiationHistoryEntry { round, carrier_ask: body.carrier_ask, decision: decision.clone() },
        now,
    );

    let mut record = load_record(&state, &call_id).await?;
    record.negotiation_rounds = round;
    record.updated_at = now;
    match decision.outcome {
        NegotiationOutcome::Accept => {
            session.final_rate = decision.accepted_rate;
            record.outcome = CallOutcome::Accepted;
            record.final_rate = decision.accepted_rate;
        }
        NegotiationOutcome::Reject => {
            record.outcome = CallOutcome::Rejected;
        }
        NegotiationOutcome::Counter => {}
    }

    state.conversations.save(session.clone()).await.map_err(|e| persistence(&call_id, e))?;
    state.calls.save(record).await.map_err(|e| persistence(&call_id, e))?;
    state
        .conversations
        .append_event(NegotiationEventRecord {
            call_id: call_id.clone(),
            round,
            carrier_ask: body.carrier_ask,
            outcome: decision.outcome,
            counter_offer: decision.counter_offer,
            created_at: now,
        })
        .await
        .map_err(|e| persistence(&call_id, e))?;

    info!(
        event_name = "calls.negotiation.round",
        correlation_id = %call_id.0,
        call_id = %call_id.0,
        round,
        outcome = decision.outcome.as_str(),
        carrier_ask = %body.carrier_ask,
        counter_offer = %decision.counter_offer.unwrap_or(Decimal::ZERO),
        "negotiation round evaluated"
    );

    Ok(Envelope::ok(NegotiateResponse {
        call_id: call_id.0,
        state: session.state,
        event,
        decision,
    }))
}

async fn summary(
    Path(call_id): Path<String>,
    State(state): State<CallsState>,
) -> Result<Json<Envelope<CallSummaryResponse>>, ApiError> {
    let call_id = CallId(call_id);
    let session = load_session(&state, &call_id).await?;
    let record = load_record(&state, &call_id).await?;
    let events =
        state.conversations.events_for_call(&call_id).await.map_err(|e| persistence(&call_id, e))?;

    let aggressiveness = analytics::negotiation_aggressiveness(
        session.listed_rate.unwrap_or(Decimal::ZERO),
        session.first_ask(),
    );

    Ok(Envelope::ok(CallSummaryResponse {
        call_id: call_id.0,
        state: session.state,
        carrier_mc: session.carrier_mc,
        carrier_name: session.carrier_name,
        fmcsa_status: record.fmcsa_status,
        presented_load_id: session.presented_load_id.map(|id| id.0),
        listed_rate: session.listed_rate,
        outcome: record.outcome,
        final_rate: record.final_rate,
        negotiation_rounds: session.negotiation_rounds,
        sentiment: analytics::sentiment(record.outcome),
        rate_sensitivity: analytics::rate_sensitivity(session.negotiation_rounds),
        aggressiveness,
        rounds: events
            .into_iter()
            .map(|event| RoundSummary {
                round: event.round,
                carrier_ask: event.carrier_ask,
                outcome: event.outcome,
                counter_offer: event.counter_offer,
                created_at: event.created_at,
            })
            .collect(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_session(state: &CallsState, call_id: &CallId) -> Result<CallSession, ApiError> {
    state.conversations.find(call_id).await.map_err(|e| persistence(call_id, e))?.ok_or_else(
        || {
            response::error(
                StatusCode::NOT_FOUND,
                format!("unknown call `{}`; start the call first", call_id.0),
            )
        },
    )
}

async fn load_record(state: &CallsState, call_id: &CallId) -> Result<CallRecord, ApiError> {
    state.calls.find_by_id(call_id).await.map_err(|e| persistence(call_id, e))?.ok_or_else(|| {
        response::error(
            StatusCode::NOT_FOUND,
            format!("unknown call `{}`; start the call first", call_id.0),
        )
    })
}

fn apply_event(
    session: &mut CallSession,
    event: ConversationEvent,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let flow = CarrierCallFlow;
    let context = ConversationContext { has_presented_load: session.has_presented_load() };
    let outcome = flow
        .transition(&session.state, &event, &context)
        .map_err(|error| response::error(StatusCode::BAD_REQUEST, error.to_string()))?;
    session.state = outcome.to;
    session.updated_at = now;
    Ok(())
}

fn persistence(call_id: &CallId, error: RepositoryError) -> ApiError {
    error!(
        event_name = "calls.persistence_failed",
        correlation_id = %call_id.0,
        call_id = %call_id.0,
        error = %error,
        "repository operation failed"
    );
    response::from_interface(
        ApplicationError::Persistence(error.to_string()).into_interface(call_id.0.clone()),
    )
}
