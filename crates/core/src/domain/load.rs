use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    DryVan,
    Refrigerated,
    Flatbed,
}

impl EquipmentType {
    /// Display/storage label, matching the wording carriers use on calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryVan => "Dry Van",
            Self::Refrigerated => "Refrigerated",
            Self::Flatbed => "Flatbed",
        }
    }
}

impl std::str::FromStr for EquipmentType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', " ").as_str() {
            "dry van" | "van" => Ok(Self::DryVan),
            "refrigerated" | "reefer" => Ok(Self::Refrigerated),
            "flatbed" => Ok(Self::Flatbed),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported equipment type `{other}` (expected dry van|refrigerated|flatbed)"
            ))),
        }
    }
}

/// A posted load available for carriers to book.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub origin_city: String,
    pub origin_state: String,
    pub destination_city: String,
    pub destination_state: String,
    pub pickup_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub equipment_type: EquipmentType,
    pub weight_lbs: u32,
    pub miles: u32,
    pub rate_per_mile: Decimal,
    pub total_rate: Decimal,
    pub commodity: String,
    pub special_requirements: Option<String>,
    pub broker_name: String,
    pub broker_mc: String,
    pub is_active: bool,
}

impl Load {
    pub fn lane(&self) -> String {
        format!(
            "{}, {} -> {}, {}",
            self.origin_city, self.origin_state, self.destination_city, self.destination_state
        )
    }
}

/// Search filters for matching loads to a carrier's position and equipment.
///
/// City/state matching is case-insensitive equality; an empty origin city
/// matches any city in the origin state (used for the nearby-alternatives
/// fallback).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSearchCriteria {
    pub origin_city: Option<String>,
    pub origin_state: Option<String>,
    pub destination_city: Option<String>,
    pub destination_state: Option<String>,
    pub equipment_type: Option<EquipmentType>,
    pub limit: u32,
}

impl LoadSearchCriteria {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Widen the search to state-level matching by clearing city filters.
    pub fn state_level(&self) -> Self {
        Self { origin_city: None, destination_city: None, ..self.clone() }
    }
}
