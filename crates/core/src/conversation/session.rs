use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::conversation::states::ConversationState;
use crate::domain::call::CallId;
use crate::domain::load::LoadId;
use crate::negotiation::RateDecision;

/// One negotiation round as recorded in a call's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationHistoryEntry {
    pub round: u32,
    pub carrier_ask: Decimal,
    pub decision: RateDecision,
}

/// Everything the backend remembers about one call, keyed by call id.
/// Persisted and re-read on every webhook hit; the policy engine itself
/// never sees this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: CallId,
    pub state: ConversationState,
    pub carrier_mc: Option<String>,
    pub carrier_name: Option<String>,
    pub presented_load_id: Option<LoadId>,
    pub listed_rate: Option<Decimal>,
    pub negotiation_rounds: u32,
    pub last_counter_offer: Option<Decimal>,
    pub final_rate: Option<Decimal>,
    pub history: Vec<NegotiationHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallSession {
    pub fn new(call_id: CallId, now: DateTime<Utc>) -> Self {
        Self {
            call_id,
            state: ConversationState::Greeting,
            carrier_mc: None,
            carrier_name: None,
            presented_load_id: None,
            listed_rate: None,
            negotiation_rounds: 0,
            last_counter_offer: None,
            final_rate: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_presented_load(&self) -> bool {
        self.presented_load_id.is_some() && self.listed_rate.is_some()
    }

    /// Ask from the first recorded round, used for aggressiveness scoring.
    pub fn first_ask(&self) -> Option<Decimal> {
        self.history.first().map(|entry| entry.carrier_ask)
    }

    pub fn record_round(&mut self, entry: NegotiationHistoryEntry, now: DateTime<Utc>) {
        self.negotiation_rounds = entry.round;
        self.last_counter_offer = entry.decision.counter_offer;
        self.history.push(entry);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::conversation::states::ConversationState;
    use crate::domain::call::CallId;
    use crate::negotiation::{NegotiationRequest, RatePolicy};

    use super::{CallSession, NegotiationHistoryEntry};

    #[test]
    fn new_session_starts_at_greeting_with_empty_history() {
        let session = CallSession::new(CallId("call-1".to_string()), Utc::now());

        assert_eq!(session.state, ConversationState::Greeting);
        assert!(!session.has_presented_load());
        assert_eq!(session.first_ask(), None);
        assert!(session.history.is_empty());
    }

    #[test]
    fn record_round_tracks_rounds_and_counters() {
        let mut session = CallSession::new(CallId("call-1".to_string()), Utc::now());
        let policy = RatePolicy::default();

        let ask = Decimal::from(2500);
        let decision = policy
            .evaluate(&NegotiationRequest::new(Decimal::from(2000), ask, 1))
            .expect("evaluate");
        session.record_round(
            NegotiationHistoryEntry { round: 1, carrier_ask: ask, decision: decision.clone() },
            Utc::now(),
        );

        assert_eq!(session.negotiation_rounds, 1);
        assert_eq!(session.last_counter_offer, decision.counter_offer);
        assert_eq!(session.first_ask(), Some(ask));
        assert_eq!(session.history.len(), 1);
    }
}
