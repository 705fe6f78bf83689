use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use loadline_core::domain::carrier::CarrierVerification;

use crate::CarrierVerifier;

#[derive(Debug, Error)]
pub enum FmcsaError {
    #[error("mc number `{0}` is not a valid docket number")]
    InvalidMcNumber(String),
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("registry returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("registry response could not be decoded: {0}")]
    Decode(String),
}

/// Client for the FMCSA QCMobile carrier lookup. Queries the
/// docket-number endpoint and maps the operating authority fields onto
/// an eligibility verdict.
pub struct FmcsaClient {
    client: Client,
    base_url: String,
    web_key: SecretString,
}

impl FmcsaClient {
    pub fn new(
        base_url: impl Into<String>,
        web_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, FmcsaError> {
        let client = Client::builder().timeout(Duration::from_secs(timeout_secs.max(1))).build()?;
        Ok(Self { client, base_url: base_url.into(), web_key })
    }

    fn validate_mc_number(mc_number: &str) -> Result<&str, FmcsaError> {
        let trimmed = mc_number.trim();
        let digits = trimmed.strip_prefix("MC").unwrap_or(trimmed).trim_start_matches('-');
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(FmcsaError::InvalidMcNumber(mc_number.to_string()));
        }
        Ok(digits)
    }
}

#[async_trait]
impl CarrierVerifier for FmcsaClient {
    async fn verify(&self, mc_number: &str) -> Result<CarrierVerification, FmcsaError> {
        let docket = Self::validate_mc_number(mc_number)?;
        let url = format!("{}/carriers/docket-number/{docket}", self.base_url.trim_end_matches('/'));

        debug!(mc_number = docket, "querying carrier registry");
        let response = self
            .client
            .get(&url)
            .query(&[("webKey", self.web_key.expose_secret())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Ok(CarrierVerification::ineligible(docket, "MC number not found"));
            }
            status => {
                warn!(mc_number = docket, %status, "unexpected registry status");
                return Err(FmcsaError::UnexpectedStatus(status));
            }
        }

        let body: DocketResponse = response
            .json()
            .await
            .map_err(|error| FmcsaError::Decode(error.to_string()))?;

        let Some(carrier) = body.content.into_iter().next().map(|entry| entry.carrier) else {
            return Ok(CarrierVerification::ineligible(docket, "MC number not found"));
        };

        Ok(carrier.into_verification(docket))
    }
}

#[derive(Debug, Default, Deserialize)]
struct DocketResponse {
    #[serde(default)]
    content: Vec<DocketEntry>,
}

#[derive(Debug, Deserialize)]
struct DocketEntry {
    carrier: CarrierPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CarrierPayload {
    legal_name: Option<String>,
    allowed_to_operate: Option<String>,
    status_code: Option<String>,
    oos_date: Option<String>,
}

impl CarrierPayload {
    fn into_verification(self, mc_number: &str) -> CarrierVerification {
        let allowed = self.allowed_to_operate.as_deref() == Some("Y");
        let out_of_service = self.oos_date.is_some();
        let eligible = allowed && !out_of_service;

        let reason = if eligible {
            None
        } else if out_of_service {
            Some("carrier is out of service".to_string())
        } else {
            Some("carrier is not authorized to operate".to_string())
        };

        CarrierVerification {
            mc_number: mc_number.to_string(),
            carrier_name: self.legal_name,
            operating_status: self.status_code,
            eligible,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CarrierPayload, FmcsaClient, FmcsaError};

    #[test]
    fn mc_number_validation_accepts_digit_forms() {
        assert_eq!(FmcsaClient::validate_mc_number("123456").unwrap(), "123456");
        assert_eq!(FmcsaClient::validate_mc_number("MC-123456").unwrap(), "123456");
        assert_eq!(FmcsaClient::validate_mc_number(" MC123456 ").unwrap(), "123456");
    }

    #[test]
    fn mc_number_validation_rejects_non_digits() {
        for bad in ["", "MC-", "12a456", "twelve"] {
            let error = FmcsaClient::validate_mc_number(bad).expect_err("invalid mc number");
            assert!(matches!(error, FmcsaError::InvalidMcNumber(_)));
        }
    }

    #[test]
    fn authorized_carrier_without_oos_is_eligible() {
        let payload = CarrierPayload {
            legal_name: Some("Sunrise Carriers LLC".to_string()),
            allowed_to_operate: Some("Y".to_string()),
            status_code: Some("A".to_string()),
            oos_date: None,
        };

        let verification = payload.into_verification("123456");
        assert!(verification.eligible);
        assert_eq!(verification.carrier_name.as_deref(), Some("Sunrise Carriers LLC"));
        assert_eq!(verification.reason, None);
    }

    #[test]
    fn out_of_service_carrier_is_ineligible() {
        let payload = CarrierPayload {
            legal_name: Some("Parked Trucks Inc".to_string()),
            allowed_to_operate: Some("Y".to_string()),
            status_code: Some("A".to_string()),
            oos_date: Some("2024-01-15".to_string()),
        };

        let verification = payload.into_verification("654321");
        assert!(!verification.eligible);
        assert_eq!(verification.reason.as_deref(), Some("carrier is out of service"));
    }

    #[test]
    fn unauthorized_carrier_is_ineligible() {
        let payload = CarrierPayload {
            legal_name: Some("No Authority Freight".to_string()),
            allowed_to_operate: Some("N".to_string()),
            status_code: None,
            oos_date: None,
        };

        let verification = payload.into_verification("999999");
        assert!(!verification.eligible);
        assert_eq!(verification.reason.as_deref(), Some("carrier is not authorized to operate"));
    }
}
