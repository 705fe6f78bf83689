use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use loadline_core::domain::call::{CallId, CallOutcome, CallRecord};
use loadline_core::domain::carrier::VerificationStatus;

use super::load::{parse_decimal, parse_timestamp};
use super::{CallRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCallRepository {
    pool: DbPool,
}

impl SqlCallRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallRepository for SqlCallRepository {
    async fn find_by_id(&self, id: &CallId) -> Result<Option<CallRecord>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT call_id, carrier_mc, carrier_name, fmcsa_status, outcome,
                   CAST(final_rate AS TEXT) AS final_rate_text,
                   negotiation_rounds, created_at, updated_at
            FROM call
            WHERE call_id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn save(&self, record: CallRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO call (
                call_id, carrier_mc, carrier_name, fmcsa_status, outcome,
                final_rate, negotiation_rounds, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (call_id) DO UPDATE SET
                carrier_mc = excluded.carrier_mc,
                carrier_name = excluded.carrier_name,
                fmcsa_status = excluded.fmcsa_status,
                outcome = excluded.outcome,
                final_rate = excluded.final_rate,
                negotiation_rounds = excluded.negotiation_rounds,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.call_id.0)
        .bind(&record.carrier_mc)
        .bind(&record.carrier_name)
        .bind(record.fmcsa_status.map(|status| status.as_str()))
        .bind(record.outcome.as_str())
        .bind(record.final_rate.map(|rate| rate.to_string()))
        .bind(i64::from(record.negotiation_rounds))
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn record_from_row(row: &SqliteRow) -> Result<CallRecord, RepositoryError> {
    let call_id: String = row.try_get("call_id")?;
    let outcome_raw: String = row.try_get("outcome")?;
    let outcome = CallOutcome::from_str(&outcome_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let fmcsa_raw: Option<String> = row.try_get("fmcsa_status")?;
    let fmcsa_status = fmcsa_raw
        .map(|value| {
            VerificationStatus::from_str(&value)
                .map_err(|error| RepositoryError::Decode(error.to_string()))
        })
        .transpose()?;
    let final_rate_raw: Option<String> = row.try_get("final_rate_text")?;
    let final_rate =
        final_rate_raw.map(|value| parse_decimal("final_rate", value)).transpose()?;
    let rounds_raw: i64 = row.try_get("negotiation_rounds")?;

    Ok(CallRecord {
        call_id: CallId(call_id),
        carrier_mc: row.try_get("carrier_mc")?,
        carrier_name: row.try_get("carrier_name")?,
        fmcsa_status,
        outcome,
        final_rate,
        negotiation_rounds: u32::try_from(rounds_raw).map_err(|_| {
            RepositoryError::Decode(format!("negotiation_rounds `{rounds_raw}` exceeds u32"))
        })?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
