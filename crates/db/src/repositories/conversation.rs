use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use loadline_core::conversation::{CallSession, ConversationState, NegotiationHistoryEntry};
use loadline_core::domain::call::CallId;
use loadline_core::domain::load::LoadId;
use loadline_core::negotiation::NegotiationOutcome;

use super::load::{parse_decimal, parse_timestamp};
use super::{ConversationRepository, NegotiationEventRecord, RepositoryError};
use crate::DbPool;

/// SQLite-backed conversation store, keyed by call id. Each webhook hit
/// reads the session row, applies the transition, and writes it back as
/// an upsert; the full round history rides along as JSON.
pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find(&self, call_id: &CallId) -> Result<Option<CallSession>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT call_id, state, carrier_mc, carrier_name, presented_load_id,
                   CAST(listed_rate AS TEXT) AS listed_rate_text,
                   negotiation_rounds,
                   CAST(last_counter_offer AS TEXT) AS last_counter_offer_text,
                   CAST(final_rate AS TEXT) AS final_rate_text,
                   history_json, created_at, updated_at
            FROM conversation
            WHERE call_id = ?
            "#,
        )
        .bind(&call_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| session_from_row(&row)).transpose()
    }

    async fn save(&self, session: CallSession) -> Result<(), RepositoryError> {
        let history_json = serde_json::to_string(&session.history)
            .map_err(|error| RepositoryError::Decode(format!("encode history: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO conversation (
                call_id, state, carrier_mc, carrier_name, presented_load_id,
                listed_rate, negotiation_rounds, last_counter_offer, final_rate,
                history_json, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (call_id) DO UPDATE SET
                state = excluded.state,
                carrier_mc = excluded.carrier_mc,
                carrier_name = excluded.carrier_name,
                presented_load_id = excluded.presented_load_id,
                listed_rate = excluded.listed_rate,
                negotiation_rounds = excluded.negotiation_rounds,
                last_counter_offer = excluded.last_counter_offer,
                final_rate = excluded.final_rate,
                history_json = excluded.history_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.call_id.0)
        .bind(session.state.as_str())
        .bind(&session.carrier_mc)
        .bind(&session.carrier_name)
        .bind(session.presented_load_id.as_ref().map(|id| id.0.clone()))
        .bind(session.listed_rate.map(|rate| rate.to_string()))
        .bind(i64::from(session.negotiation_rounds))
        .bind(session.last_counter_offer.map(|offer| offer.to_string()))
        .bind(session.final_rate.map(|rate| rate.to_string()))
        .bind(history_json)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_event(&self, event: NegotiationEventRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO negotiation_event (call_id, round, carrier_ask, outcome, counter_offer, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.call_id.0)
        .bind(i64::from(event.round))
        .bind(event.carrier_ask.to_string())
        .bind(event.outcome.as_str())
        .bind(event.counter_offer.map(|offer| offer.to_string()))
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn events_for_call(
        &self,
        call_id: &CallId,
    ) -> Result<Vec<NegotiationEventRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT call_id, round,
                   CAST(carrier_ask AS TEXT) AS carrier_ask_text,
                   outcome,
                   CAST(counter_offer AS TEXT) AS counter_offer_text,
                   created_at
            FROM negotiation_event
            WHERE call_id = ?
            ORDER BY round ASC, id ASC
            "#,
        )
        .bind(&call_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }
}

fn session_from_row(row: &SqliteRow) -> Result<CallSession, RepositoryError> {
    let call_id: String = row.try_get("call_id")?;
    let state_raw: String = row.try_get("state")?;
    let state = ConversationState::from_str(&state_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let presented_load_id: Option<String> = row.try_get("presented_load_id")?;
    let listed_rate_raw: Option<String> = row.try_get("listed_rate_text")?;
    let listed_rate =
        listed_rate_raw.map(|value| parse_decimal("listed_rate", value)).transpose()?;
    let rounds_raw: i64 = row.try_get("negotiation_rounds")?;
    let last_counter_raw: Option<String> = row.try_get("last_counter_offer_text")?;
    let last_counter_offer =
        last_counter_raw.map(|value| parse_decimal("last_counter_offer", value)).transpose()?;
    let final_rate_raw: Option<String> = row.try_get("final_rate_text")?;
    let final_rate =
        final_rate_raw.map(|value| parse_decimal("final_rate", value)).transpose()?;
    let history_json: String = row.try_get("history_json")?;
    let history: Vec<NegotiationHistoryEntry> = serde_json::from_str(&history_json)
        .map_err(|error| RepositoryError::Decode(format!("decode history: {error}")))?;

    Ok(CallSession {
        call_id: CallId(call_id),
        state,
        carrier_mc: row.try_get("carrier_mc")?,
        carrier_name: row.try_get("carrier_name")?,
        presented_load_id: presented_load_id.map(LoadId),
        listed_rate,
        negotiation_rounds: u32::try_from(rounds_raw).map_err(|_| {
            RepositoryError::Decode(format!("negotiation_rounds `{rounds_raw}` exceeds u32"))
        })?,
        last_counter_offer,
        final_rate,
        history,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn event_from_row(row: &SqliteRow) -> Result<NegotiationEventRecord, RepositoryError> {
    let call_id: String = row.try_get("call_id")?;
    let round_raw: i64 = row.try_get("round")?;
    let outcome_raw: String = row.try_get("outcome")?;
    let outcome = NegotiationOutcome::from_str(&outcome_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let counter_raw: Option<String> = row.try_get("counter_offer_text")?;
    let counter_offer =
        counter_raw.map(|value| parse_decimal("counter_offer", value)).transpose()?;

    Ok(NegotiationEventRecord {
        call_id: CallId(call_id),
        round: u32::try_from(round_raw)
            .map_err(|_| RepositoryError::Decode(format!("round `{round_raw}` exceeds u32")))?,
        carrier_ask: parse_decimal("carrier_ask", row.try_get("carrier_ask_text")?)?,
        outcome,
        counter_offer,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use loadline_core::conversation::{CallSession, ConversationState, NegotiationHistoryEntry};
    use loadline_core::domain::call::CallId;
    use loadline_core::domain::load::LoadId;
    use loadline_core::negotiation::{NegotiationOutcome, NegotiationRequest, RatePolicy};

    use super::SqlConversationRepository;
    use crate::repositories::{ConversationRepository, NegotiationEventRecord};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    async fn save_and_find_round_trips_session_with_history() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());
        let policy = RatePolicy::default();

        let mut session = CallSession::new(CallId("call-conv-1".to_string()), Utc::now());
        session.state = ConversationState::Negotiation;
        session.carrier_mc = Some("123456".to_string());
        session.presented_load_id = Some(LoadId("LOAD-001".to_string()));
        session.listed_rate = Some(Decimal::from(2000));

        let ask = Decimal::from(2500);
        let decision = policy
            .evaluate(&NegotiationRequest::new(Decimal::from(2000), ask, 1))
            .expect("evaluate");
        session.record_round(
            NegotiationHistoryEntry { round: 1, carrier_ask: ask, decision },
            Utc::now(),
        );

        repo.save(session.clone()).await.expect("save session");

        let fetched =
            repo.find(&session.call_id).await.expect("find session").expect("session exists");
        assert_eq!(fetched.state, ConversationState::Negotiation);
        assert_eq!(fetched.negotiation_rounds, 1);
        assert_eq!(fetched.history.len(), 1);
        assert_eq!(fetched.history[0].carrier_ask, ask);
        assert_eq!(fetched.last_counter_offer, session.last_counter_offer);

        pool.close().await;
    }

    #[tokio::test]
    async fn save_upserts_without_duplicating_sessions() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());

        let mut session = CallSession::new(CallId("call-conv-2".to_string()), Utc::now());
        repo.save(session.clone()).await.expect("save initial");

        session.state = ConversationState::Agreement;
        session.final_rate = Some(Decimal::from(2130));
        repo.save(session.clone()).await.expect("save updated");

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversation WHERE call_id = ?")
                .bind(&session.call_id.0)
                .fetch_one(&pool)
                .await
                .expect("count sessions");
        assert_eq!(count, 1);

        let fetched =
            repo.find(&session.call_id).await.expect("find session").expect("session exists");
        assert_eq!(fetched.state, ConversationState::Agreement);
        assert_eq!(fetched.final_rate, Some(Decimal::from(2130)));

        pool.close().await;
    }

    #[tokio::test]
    async fn events_are_returned_in_round_order() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());
        let call_id = CallId("call-conv-3".to_string());

        for (round, outcome, counter) in [
            (1, NegotiationOutcome::Counter, Some(Decimal::from(2130))),
            (2, NegotiationOutcome::Counter, Some(Decimal::from(2250))),
            (3, NegotiationOutcome::Accept, None),
        ] {
            repo.append_event(NegotiationEventRecord {
                call_id: call_id.clone(),
                round,
                carrier_ask: Decimal::from(2500),
                outcome,
                counter_offer: counter,
                created_at: Utc::now(),
            })
            .await
            .expect("append event");
        }

        let events = repo.events_for_call(&call_id).await.expect("events");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].round, 1);
        assert_eq!(events[2].outcome, NegotiationOutcome::Accept);
        assert_eq!(events[1].counter_offer, Some(Decimal::from(2250)));

        let other = repo
            .events_for_call(&CallId("call-other".to_string()))
            .await
            .expect("events for unknown call");
        assert!(other.is_empty());

        pool.close().await;
    }
}
