use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use loadline_core::conversation::CallSession;
use loadline_core::domain::call::{CallId, CallRecord};
use loadline_core::domain::load::{Load, LoadId, LoadSearchCriteria};
use loadline_core::negotiation::NegotiationOutcome;

pub mod call;
pub mod conversation;
pub mod load;
pub mod memory;

pub use call::SqlCallRepository;
pub use conversation::SqlConversationRepository;
pub use load::SqlLoadRepository;
pub use memory::{InMemoryCallRepository, InMemoryConversationRepository, InMemoryLoadRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One persisted policy verdict, kept for reporting after the call ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegotiationEventRecord {
    pub call_id: CallId,
    pub round: u32,
    pub carrier_ask: Decimal,
    pub outcome: NegotiationOutcome,
    pub counter_offer: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait LoadRepository: Send + Sync {
    async fn find_by_id(&self, id: &LoadId) -> Result<Option<Load>, RepositoryError>;
    async fn search(&self, criteria: &LoadSearchCriteria) -> Result<Vec<Load>, RepositoryError>;
    async fn save(&self, load: Load) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CallRepository: Send + Sync {
    async fn find_by_id(&self, id: &CallId) -> Result<Option<CallRecord>, RepositoryError>;
    async fn save(&self, record: CallRecord) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find(&self, call_id: &CallId) -> Result<Option<CallSession>, RepositoryError>;
    async fn save(&self, session: CallSession) -> Result<(), RepositoryError>;
    async fn append_event(&self, event: NegotiationEventRecord) -> Result<(), RepositoryError>;
    async fn events_for_call(
        &self,
        call_id: &CallId,
    ) -> Result<Vec<NegotiationEventRecord>, RepositoryError>;
}
