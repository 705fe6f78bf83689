pub mod client;
pub mod directory;

pub use client::{FmcsaClient, FmcsaError};
pub use directory::StaticCarrierDirectory;

use async_trait::async_trait;

use loadline_core::domain::carrier::CarrierVerification;

/// Eligibility lookup seam. The production implementation calls the FMCSA
/// QCMobile API; tests and local development use the static directory.
#[async_trait]
pub trait CarrierVerifier: Send + Sync {
    async fn verify(&self, mc_number: &str) -> Result<CarrierVerification, FmcsaError>;
}
