pub mod policy;

pub use policy::{
    NegotiationEngine, NegotiationOutcome, NegotiationRequest, PolicyConfig, PolicySnapshot,
    RateDecision, RatePolicy,
};
