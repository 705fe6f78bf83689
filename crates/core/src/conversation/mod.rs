pub mod analytics;
pub mod engine;
pub mod session;
pub mod states;

pub use analytics::{Aggressiveness, RateSensitivity, Sentiment};
pub use engine::{CarrierCallFlow, ConversationFlow, FlowTransitionError};
pub use session::{CallSession, NegotiationHistoryEntry};
pub use states::{
    ConversationAction, ConversationContext, ConversationEvent, ConversationState,
    TransitionOutcome,
};
