use std::collections::HashMap;

use tokio::sync::RwLock;

use loadline_core::conversation::CallSession;
use loadline_core::domain::call::{CallId, CallRecord};
use loadline_core::domain::load::{Load, LoadId, LoadSearchCriteria};

use super::{
    CallRepository, ConversationRepository, LoadRepository, NegotiationEventRecord,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryLoadRepository {
    loads: RwLock<HashMap<String, Load>>,
}

#[async_trait::async_trait]
impl LoadRepository for InMemoryLoadRepository {
    async fn find_by_id(&self, id: &LoadId) -> Result<Option<Load>, RepositoryError> {
        let loads = self.loads.read().await;
        Ok(loads.get(&id.0).cloned())
    }

    async fn search(&self, criteria: &LoadSearchCriteria) -> Result<Vec<Load>, RepositoryError> {
        let loads = self.loads.read().await;
        let mut matches: Vec<Load> = loads
            .values()
            .filter(|load| load.is_active && matches_criteria(load, criteria))
            .cloned()
            .collect();
        matches.sort_by_key(|load| load.pickup_date);
        matches.truncate(criteria.limit.max(1) as usize);
        Ok(matches)
    }

    async fn save(&self, load: Load) -> Result<(), RepositoryError> {
        let mut loads = self.loads.write().await;
        loads.insert(load.id.0.clone(), load);
        Ok(())
    }
}

fn matches_criteria(load: &Load, criteria: &LoadSearchCriteria) -> bool {
    let city_eq = |candidate: &str, wanted: &Option<String>| {
        wanted.as_ref().map(|value| candidate.eq_ignore_ascii_case(value)).unwrap_or(true)
    };

    city_eq(&load.origin_city, &criteria.origin_city)
        && city_eq(&load.origin_state, &criteria.origin_state)
        && city_eq(&load.destination_city, &criteria.destination_city)
        && city_eq(&load.destination_state, &criteria.destination_state)
        && criteria
            .equipment_type
            .map(|equipment| load.equipment_type == equipment)
            .unwrap_or(true)
}

#[derive(Default)]
pub struct InMemoryCallRepository {
    records: RwLock<HashMap<String, CallRecord>>,
}

#[async_trait::async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn find_by_id(&self, id: &CallId) -> Result<Option<CallRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&id.0).cloned())
    }

    async fn save(&self, record: CallRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.call_id.0.clone(), record);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    sessions: RwLock<HashMap<String, CallSession>>,
    events: RwLock<Vec<NegotiationEventRecord>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find(&self, call_id: &CallId) -> Result<Option<CallSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&call_id.0).cloned())
    }

    async fn save(&self, session: CallSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.call_id.0.clone(), session);
        Ok(())
    }

    async fn append_event(&self, event: NegotiationEventRecord) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }

    async fn events_for_call(
        &self,
        call_id: &CallId,
    ) -> Result<Vec<NegotiationEventRecord>, RepositoryError> {
        let events = self.events.read().await;
        let mut matches: Vec<NegotiationEventRecord> =
            events.iter().filter(|event| event.call_id == *call_id).cloned().collect();
        matches.sort_by_key(|event| event.round);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use loadline_core::conversation::{CallSession, ConversationState};
    use loadline_core::domain::call::{CallId, CallOutcome, CallRecord};
    use loadline_core::domain::load::{EquipmentType, Load, LoadId, LoadSearchCriteria};
    use loadline_core::negotiation::NegotiationOutcome;

    use crate::repositories::{
        CallRepository, ConversationRepository, InMemoryCallRepository,
        InMemoryConversationRepository, InMemoryLoadRepository, LoadRepository,
        NegotiationEventRecord,
    };

    fn sample_load(id: &str, origin_city: &str, equipment: EquipmentType) -> Load {
        let pickup = Utc::now() + Duration::days(1);
        Load {
            id: LoadId(id.to_string()),
            origin_city: origin_city.to_string(),
            origin_state: "CA".to_string(),
            destination_city: "Phoenix".to_string(),
            destination_state: "AZ".to_string(),
            pickup_date: pickup,
            delivery_date: pickup + Duration::days(1),
            equipment_type: equipment,
            weight_lbs: 45_000,
            miles: 370,
            rate_per_mile: Decimal::new(215, 2),
            total_rate: Decimal::new(79_550, 2),
            commodity: "Electronics".to_string(),
            special_requirements: None,
            broker_name: "ABC Logistics".to_string(),
            broker_mc: "123456".to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn in_memory_load_search_filters_like_sql() {
        let repo = InMemoryLoadRepository::default();
        repo.save(sample_load("LOAD-M1", "Los Angeles", EquipmentType::DryVan))
            .await
            .expect("save");
        repo.save(sample_load("LOAD-M2", "Sacramento", EquipmentType::Flatbed))
            .await
            .expect("save");

        let criteria = LoadSearchCriteria {
            origin_city: Some("los angeles".to_string()),
            ..LoadSearchCriteria::default()
        }
        .with_limit(5);

        let results = repo.search(&criteria).await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, LoadId("LOAD-M1".to_string()));

        let by_equipment = repo
            .search(
                &LoadSearchCriteria {
                    equipment_type: Some(EquipmentType::Flatbed),
                    ..LoadSearchCriteria::default()
                }
                .with_limit(5),
            )
            .await
            .expect("search by equipment");
        assert_eq!(by_equipment.len(), 1);
        assert_eq!(by_equipment[0].id, LoadId("LOAD-M2".to_string()));
    }

    #[tokio::test]
    async fn in_memory_call_repository_round_trips() {
        let repo = InMemoryCallRepository::default();
        let mut record = CallRecord::new(CallId("call-m1".to_string()), Utc::now());
        record.outcome = CallOutcome::Transferred;
        repo.save(record.clone()).await.expect("save");

        let fetched =
            repo.find_by_id(&record.call_id).await.expect("find").expect("record exists");
        assert_eq!(fetched.outcome, CallOutcome::Transferred);
    }

    #[tokio::test]
    async fn in_memory_conversation_repository_keeps_events_per_call() {
        let repo = InMemoryConversationRepository::default();
        let call_id = CallId("call-m2".to_string());

        let mut session = CallSession::new(call_id.clone(), Utc::now());
        session.state = ConversationState::LoadSearch;
        repo.save(session).await.expect("save session");

        repo.append_event(NegotiationEventRecord {
            call_id: call_id.clone(),
            round: 1,
            carrier_ask: Decimal::from(2500),
            outcome: NegotiationOutcome::Counter,
            counter_offer: Some(Decimal::from(2130)),
            created_at: Utc::now(),
        })
        .await
        .expect("append event");
        repo.append_event(NegotiationEventRecord {
            call_id: CallId("call-other".to_string()),
            round: 1,
            carrier_ask: Decimal::from(900),
            outcome: NegotiationOutcome::Accept,
            counter_offer: None,
            created_at: Utc::now(),
        })
        .await
        .expect("append other event");

        let fetched = repo.find(&call_id).await.expect("find").expect("session exists");
        assert_eq!(fetched.state, ConversationState::LoadSearch);

        let events = repo.events_for_call(&call_id).await.expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].counter_offer, Some(Decimal::from(2130)));
    }
}
