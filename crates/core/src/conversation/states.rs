use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Where a carrier call currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Greeting,
    McVerification,
    LoadSearch,
    LoadPresentation,
    Negotiation,
    FinalOffer,
    Agreement,
    Transfer,
    Complete,
    Failed,
}

impl ConversationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::McVerification => "mc_verification",
            Self::LoadSearch => "load_search",
            Self::LoadPresentation => "load_presentation",
            Self::Negotiation => "negotiation",
            Self::FinalOffer => "final_offer",
            Self::Agreement => "agreement",
            Self::Transfer => "transfer",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ConversationState {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greeting" => Ok(Self::Greeting),
            "mc_verification" => Ok(Self::McVerification),
            "load_search" => Ok(Self::LoadSearch),
            "load_presentation" => Ok(Self::LoadPresentation),
            "negotiation" => Ok(Self::Negotiation),
            "final_offer" => Ok(Self::FinalOffer),
            "agreement" => Ok(Self::Agreement),
            "transfer" => Ok(Self::Transfer),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported conversation state `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationEvent {
    McProvided,
    McVerified,
    McRejected,
    LoadsFound,
    NoLoadsMatched,
    AskAccepted,
    CounterIssued,
    FinalOfferIssued,
    NegotiationFailed,
    TransferRequested,
    CallCompleted,
}

/// Follow-up the orchestration layer should take after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationAction {
    VerifyCarrier,
    CollectSearchCriteria,
    PresentLoad,
    OfferAlternatives,
    AwaitCounterResponse,
    AwaitFinalResponse,
    TransferToSales,
    EndCall,
}

/// Per-call facts the transition table consults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Whether a load has been presented on this call. Negotiation events
    /// are invalid without one.
    pub has_presented_load: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ConversationState,
    pub to: ConversationState,
    pub event: ConversationEvent,
    pub actions: Vec<ConversationAction>,
}
