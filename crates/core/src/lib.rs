pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod negotiation;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use conversation::{
    CallSession, CarrierCallFlow, ConversationEvent, ConversationFlow, ConversationState,
    FlowTransitionError, NegotiationHistoryEntry,
};
pub use domain::call::{CallId, CallOutcome, CallRecord};
pub use domain::carrier::{CarrierVerification, VerificationStatus};
pub use domain::load::{EquipmentType, Load, LoadId, LoadSearchCriteria};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use negotiation::{
    NegotiationEngine, NegotiationOutcome, NegotiationRequest, PolicyConfig, RateDecision,
    RatePolicy,
};
