use std::collections::HashMap;

use async_trait::async_trait;

use loadline_core::domain::carrier::CarrierVerification;

use crate::{CarrierVerifier, FmcsaError};

/// Offline stand-in for the registry, used when no web key is configured
/// and in tests. Unknown MC numbers verify as not found.
pub struct StaticCarrierDirectory {
    carriers: HashMap<String, CarrierVerification>,
}

impl StaticCarrierDirectory {
    pub fn new(carriers: Vec<CarrierVerification>) -> Self {
        let carriers =
            carriers.into_iter().map(|carrier| (carrier.mc_number.clone(), carrier)).collect();
        Self { carriers }
    }

    /// A handful of well-known test carriers matching the seed load board.
    pub fn with_demo_carriers() -> Self {
        let eligible = |mc: &str, name: &str| CarrierVerification {
            mc_number: mc.to_string(),
            carrier_name: Some(name.to_string()),
            operating_status: Some("A".to_string()),
            eligible: true,
            reason: None,
        };

        Self::new(vec![
            eligible("123456", "Sunrise Carriers LLC"),
            eligible("789012", "Great Plains Trucking"),
            eligible("345678", "Lone Star Haulers"),
            CarrierVerification {
                mc_number: "666666".to_string(),
                carrier_name: Some("Grounded Freight Co".to_string()),
                operating_status: Some("I".to_string()),
                eligible: false,
                reason: Some("carrier is not authorized to operate".to_string()),
            },
        ])
    }
}

#[async_trait]
impl CarrierVerifier for StaticCarrierDirectory {
    async fn verify(&self, mc_number: &str) -> Result<CarrierVerification, FmcsaError> {
        let trimmed = mc_number.trim();
        let digits = trimmed.strip_prefix("MC").unwrap_or(trimmed).trim_start_matches('-');
        Ok(self
            .carriers
            .get(digits)
            .cloned()
            .unwrap_or_else(|| CarrierVerification::ineligible(digits, "MC number not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::StaticCarrierDirectory;
    use crate::CarrierVerifier;

    #[tokio::test]
    async fn known_carrier_verifies_eligible() {
        let directory = StaticCarrierDirectory::with_demo_carriers();

        let verification = directory.verify("123456").await.expect("verify");
        assert!(verification.eligible);
        assert_eq!(verification.carrier_name.as_deref(), Some("Sunrise Carriers LLC"));
    }

    #[tokio::test]
    async fn mc_prefix_is_normalized() {
        let directory = StaticCarrierDirectory::with_demo_carriers();

        let verification = directory.verify("MC-789012").await.expect("verify");
        assert!(verification.eligible);
    }

    #[tokio::test]
    async fn unknown_carrier_is_not_found() {
        let directory = StaticCarrierDirectory::with_demo_carriers();

        let verification = directory.verify("000001").await.expect("verify");
        assert!(!verification.eligible);
        assert_eq!(verification.reason.as_deref(), Some("MC number not found"));
    }

    #[tokio::test]
    async fn revoked_carrier_is_ineligible_with_reason() {
        let directory = StaticCarrierDirectory::with_demo_carriers();

        let verification = directory.verify("666666").await.expect("verify");
        assert!(!verification.eligible);
        assert_eq!(verification.reason.as_deref(), Some("carrier is not authorized to operate"));
    }
}
