use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::carrier::VerificationStatus;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Accepted,
    Rejected,
    Transferred,
    Incomplete,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Transferred => "transferred",
            Self::Incomplete => "incomplete",
        }
    }
}

impl std::str::FromStr for CallOutcome {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "transferred" => Ok(Self::Transferred),
            "incomplete" => Ok(Self::Incomplete),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported call outcome `{other}` (expected accepted|rejected|transferred|incomplete)"
            ))),
        }
    }
}

/// Durable record of one carrier call, updated as the conversation advances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: CallId,
    pub carrier_mc: Option<String>,
    pub carrier_name: Option<String>,
    pub fmcsa_status: Option<VerificationStatus>,
    pub outcome: CallOutcome,
    pub final_rate: Option<Decimal>,
    pub negotiation_rounds: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    pub fn new(call_id: CallId, now: DateTime<Utc>) -> Self {
        Self {
            call_id,
            carrier_mc: None,
            carrier_name: None,
            fmcsa_status: None,
            outcome: CallOutcome::Incomplete,
            final_rate: None,
            negotiation_rounds: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
