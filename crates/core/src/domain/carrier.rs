use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "verified" => Ok(Self::Verified),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported verification status `{other}` (expected verified|failed)"
            ))),
        }
    }
}

/// Result of checking a carrier's MC number against the FMCSA registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierVerification {
    pub mc_number: String,
    pub carrier_name: Option<String>,
    pub operating_status: Option<String>,
    pub eligible: bool,
    pub reason: Option<String>,
}

impl CarrierVerification {
    pub fn status(&self) -> VerificationStatus {
        if self.eligible {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Failed
        }
    }

    pub fn ineligible(mc_number: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            mc_number: mc_number.into(),
            carrier_name: None,
            operating_status: None,
            eligible: false,
            reason: Some(reason.into()),
        }
    }
}
