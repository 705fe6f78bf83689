use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row};

use loadline_core::domain::load::{EquipmentType, Load, LoadId, LoadSearchCriteria};

use super::{LoadRepository, RepositoryError};
use crate::DbPool;

const LOAD_COLUMNS: &str = "id, origin_city, origin_state, destination_city, destination_state,
     pickup_datetime, delivery_datetime, equipment_type, weight_lbs, miles,
     CAST(rate_per_mile AS TEXT) AS rate_per_mile_text,
     CAST(total_rate AS TEXT) AS total_rate_text,
     commodity, special_requirements, broker_name, broker_mc, is_active";

pub struct SqlLoadRepository {
    pool: DbPool,
}

impl SqlLoadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoadRepository for SqlLoadRepository {
    async fn find_by_id(&self, id: &LoadId) -> Result<Option<Load>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {LOAD_COLUMNS} FROM load WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| load_from_row(&row)).transpose()
    }

    async fn search(&self, criteria: &LoadSearchCriteria) -> Result<Vec<Load>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {LOAD_COLUMNS} FROM load WHERE is_active = 1"));

        if let Some(city) = &criteria.origin_city {
            builder.push(" AND LOWER(origin_city) = LOWER(");
            builder.push_bind(city);
            builder.push(")");
        }
        if let Some(state) = &criteria.origin_state {
            builder.push(" AND LOWER(origin_state) = LOWER(");
            builder.push_bind(state);
            builder.push(")");
        }
        if let Some(city) = &criteria.destination_city {
            builder.push(" AND LOWER(destination_city) = LOWER(");
            builder.push_bind(city);
            builder.push(")");
        }
        if let Some(state) = &criteria.destination_state {
            builder.push(" AND LOWER(destination_state) = LOWER(");
            builder.push_bind(state);
            builder.push(")");
        }
        if let Some(equipment) = &criteria.equipment_type {
            builder.push(" AND equipment_type = ");
            builder.push_bind(equipment.as_str());
        }

        builder.push(" ORDER BY pickup_datetime ASC LIMIT ");
        builder.push_bind(i64::from(criteria.limit.max(1)));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(load_from_row).collect()
    }

    async fn save(&self, load: Load) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO load (
                id, origin_city, origin_state, destination_city, destination_state,
                pickup_datetime, delivery_datetime, equipment_type, weight_lbs, miles,
                rate_per_mile, total_rate, commodity, special_requirements,
                broker_name, broker_mc, is_active
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                origin_city = excluded.origin_city,
                origin_state = excluded.origin_state,
                destination_city = excluded.destination_city,
                destination_state = excluded.destination_state,
                pickup_datetime = excluded.pickup_datetime,
                delivery_datetime = excluded.delivery_datetime,
                equipment_type = excluded.equipment_type,
                weight_lbs = excluded.weight_lbs,
                miles = excluded.miles,
                rate_per_mile = excluded.rate_per_mile,
                total_rate = excluded.total_rate,
                commodity = excluded.commodity,
                special_requirements = excluded.special_requirements,
                broker_name = excluded.broker_name,
                broker_mc = excluded.broker_mc,
                is_active = excluded.is_active
            "#,
        )
        .bind(&load.id.0)
        .bind(&load.origin_city)
        .bind(&load.origin_state)
        .bind(&load.destination_city)
        .bind(&load.destination_state)
        .bind(load.pickup_date.to_rfc3339())
        .bind(load.delivery_date.to_rfc3339())
        .bind(load.equipment_type.as_str())
        .bind(i64::from(load.weight_lbs))
        .bind(i64::from(load.miles))
        .bind(load.rate_per_mile.to_string())
        .bind(load.total_rate.to_string())
        .bind(&load.commodity)
        .bind(&load.special_requirements)
        .bind(&load.broker_name)
        .bind(&load.broker_mc)
        .bind(load.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn load_from_row(row: &SqliteRow) -> Result<Load, RepositoryError> {
    let id: String = row.try_get("id")?;
    let equipment_raw: String = row.try_get("equipment_type")?;
    let equipment_type = EquipmentType::from_str(&equipment_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let weight_raw: i64 = row.try_get("weight_lbs")?;
    let miles_raw: i64 = row.try_get("miles")?;

    Ok(Load {
        id: LoadId(id),
        origin_city: row.try_get("origin_city")?,
        origin_state: row.try_get("origin_state")?,
        destination_city: row.try_get("destination_city")?,
        destination_state: row.try_get("destination_state")?,
        pickup_date: parse_timestamp("pickup_datetime", row.try_get("pickup_datetime")?)?,
        delivery_date: parse_timestamp("delivery_datetime", row.try_get("delivery_datetime")?)?,
        equipment_type,
        weight_lbs: u32::try_from(weight_raw)
            .map_err(|_| RepositoryError::Decode(format!("weight `{weight_raw}` exceeds u32")))?,
        miles: u32::try_from(miles_raw)
            .map_err(|_| RepositoryError::Decode(format!("miles `{miles_raw}` exceeds u32")))?,
        rate_per_mile: parse_decimal("rate_per_mile", row.try_get("rate_per_mile_text")?)?,
        total_rate: parse_decimal("total_rate", row.try_get("total_rate_text")?)?,
        commodity: row.try_get("commodity")?,
        special_requirements: row.try_get("special_requirements")?,
        broker_name: row.try_get("broker_name")?,
        broker_mc: row.try_get("broker_mc")?,
        is_active: row.try_get("is_active")?,
    })
}

pub(crate) fn parse_timestamp(
    field: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp for {field}: {error}")))
}

pub(crate) fn parse_decimal(field: &str, value: String) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal for {field}: {error}")))
}
