use thiserror::Error;

use crate::conversation::states::{
    ConversationAction, ConversationContext, ConversationEvent, ConversationState,
    TransitionOutcome,
};

/// State machine seam for a call flow. One implementation exists today;
/// the trait keeps the orchestration layer testable against doubles.
pub trait ConversationFlow {
    fn initial_state(&self) -> ConversationState;
    fn transition(
        &self,
        current: &ConversationState,
        event: &ConversationEvent,
        context: &ConversationContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The standard inbound carrier call: verify, search, present, negotiate,
/// hand off.
#[derive(Clone, Copy, Debug, Default)]
pub struct CarrierCallFlow;

impl ConversationFlow for CarrierCallFlow {
    fn initial_state(&self) -> ConversationState {
        ConversationState::Greeting
    }

    fn transition(
        &self,
        current: &ConversationState,
        event: &ConversationEvent,
        context: &ConversationContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_carrier_call(current, event, context)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("no load has been presented yet in state {state:?}; search for a load first")]
    MissingPresentedLoad { state: ConversationState },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ConversationState, event: ConversationEvent },
}

fn transition_carrier_call(
    current: &ConversationState,
    event: &ConversationEvent,
    context: &ConversationContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationAction::{
        AwaitCounterResponse, AwaitFinalResponse, CollectSearchCriteria, EndCall,
        OfferAlternatives, PresentLoad, TransferToSales, VerifyCarrier,
    };
    use ConversationEvent::{
        AskAccepted, CallCompleted, CounterIssued, FinalOfferIssued, LoadsFound, McProvided,
        McRejected, McVerified, NegotiationFailed, NoLoadsMatched, TransferRequested,
    };
    use ConversationState::{
        Agreement, Complete, Failed, FinalOffer, Greeting, LoadPresentation, LoadSearch,
        McVerification, Negotiation, Transfer,
    };

    let negotiating = matches!(current, LoadPresentation | Negotiation | FinalOffer);
    if negotiating
        && matches!(event, AskAccepted | CounterIssued | FinalOfferIssued | NegotiationFailed)
        && !context.has_presented_load
    {
        return Err(FlowTransitionError::MissingPresentedLoad { state: *current });
    }

    let (to, actions) = match (current, event) {
        (Greeting, McProvided) => (McVerification, vec![VerifyCarrier]),
        (McVerification, McVerified) => (LoadSearch, vec![CollectSearchCriteria]),
        (McVerification, McRejected) => (Failed, vec![EndCall]),
        (LoadSearch, LoadsFound) => (LoadPresentation, vec![PresentLoad]),
        (LoadSearch, NoLoadsMatched) => (Failed, vec![OfferAlternatives]),
        (LoadPresentation | Negotiation | FinalOffer, AskAccepted) => {
            (Agreement, vec![TransferToSales])
        }
        (LoadPresentation | Negotiation, CounterIssued) => {
            (Negotiation, vec![AwaitCounterResponse])
        }
        (LoadPresentation | Negotiation, FinalOfferIssued) => {
            (FinalOffer, vec![AwaitFinalResponse])
        }
        (LoadPresentation | Negotiation | FinalOffer, NegotiationFailed) => {
            (Failed, vec![EndCall])
        }
        (Agreement, TransferRequested) => (Transfer, Vec::new()),
        (Transfer, CallCompleted) => (Complete, vec![EndCall]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}
