//! In-memory implementation of the backend for testing and development

use crate::core::auth::{AuthEvent, Session, SessionProvider};
use crate::core::events::{ChangeAction, ChangeEvent, EventBus, EventEnvelope, Table};
use crate::core::follow_up::{FollowUpColumns, FollowUpRow};
use crate::core::lead::{LeadColumns, LeadRow, LeadStatus};
use crate::core::service::LeadBackend;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

/// In-memory leads backend
///
/// Rows are kept in insertion order and scoped to the session's user the
/// way row-level security would scope them. Every successful write publishes
/// a change event on the table's feed. Uses RwLock for thread-safe access.
#[derive(Clone)]
pub struct InMemoryBackend {
    leads: Arc<RwLock<Vec<LeadRow>>>,
    follow_ups: Arc<RwLock<Vec<FollowUpRow>>>,
    lead_events: EventBus,
    follow_up_events: EventBus,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a backend whose change feeds buffer `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            leads: Arc::new(RwLock::new(Vec::new())),
            follow_ups: Arc::new(RwLock::new(Vec::new())),
            lead_events: EventBus::new(capacity),
            follow_up_events: EventBus::new(capacity),
        }
    }

    fn bus(&self, table: Table) -> &EventBus {
        match table {
            Table::Leads => &self.lead_events,
            Table::FollowUps => &self.follow_up_events,
        }
    }

    fn publish(&self, table: Table, action: ChangeAction, record_id: &str) {
        let receivers = self
            .bus(table)
            .publish(ChangeEvent::new(table, action, record_id));
        tracing::trace!(%table, action = action.as_str(), record_id, receivers, "Change published");
    }

    /// Number of lead rows across all users
    pub fn lead_count(&self) -> usize {
        self.leads.read().map(|rows| rows.len()).unwrap_or(0)
    }

    /// Number of follow-up rows across all users
    pub fn follow_up_count(&self) -> usize {
        self.follow_ups.read().map(|rows| rows.len()).unwrap_or(0)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeadBackend for InMemoryBackend {
    async fn fetch_leads(&self, session: &Session) -> Result<Vec<LeadRow>> {
        let leads = self
            .leads
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        // Newest first
        Ok(leads
            .iter()
            .rev()
            .filter(|row| row.user_id == session.user_id)
            .cloned()
            .collect())
    }

    async fn insert_lead(&self, session: &Session, columns: LeadColumns) -> Result<LeadRow> {
        let row = LeadRow {
            id: Uuid::new_v4().to_string(),
            user_id: session.user_id,
            created_at: Utc::now(),
            columns,
        };

        self.leads
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?
            .push(row.clone());

        self.publish(Table::Leads, ChangeAction::Insert, &row.id);
        Ok(row)
    }

    async fn update_lead(
        &self,
        session: &Session,
        id: &str,
        columns: LeadColumns,
    ) -> Result<LeadRow> {
        let updated = {
            let mut leads = self
                .leads
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

            let row = leads
                .iter_mut()
                .find(|row| row.id == id && row.user_id == session.user_id)
                .ok_or_else(|| anyhow!("Lead {} not found", id))?;
            row.columns = columns;
            row.clone()
        };

        self.publish(Table::Leads, ChangeAction::Update, id);
        Ok(updated)
    }

    async fn update_lead_status(
        &self,
        session: &Session,
        id: &str,
        status: LeadStatus,
    ) -> Result<LeadRow> {
        let updated = {
            let mut leads = self
                .leads
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

            let row = leads
                .iter_mut()
                .find(|row| row.id == id && row.user_id == session.user_id)
                .ok_or_else(|| anyhow!("Lead {} not found", id))?;
            row.columns.status = status.as_str().to_string();
            row.clone()
        };

        self.publish(Table::Leads, ChangeAction::Update, id);
        Ok(updated)
    }

    async fn delete_lead(&self, session: &Session, id: &str) -> Result<()> {
        let removed = {
            let mut leads = self
                .leads
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

            let before = leads.len();
            leads.retain(|row| !(row.id == id && row.user_id == session.user_id));
            leads.len() < before
        };

        if removed {
            self.publish(Table::Leads, ChangeAction::Delete, id);
        }
        Ok(())
    }

    async fn fetch_follow_ups(&self, session: &Session) -> Result<Vec<FollowUpRow>> {
        let follow_ups = self
            .follow_ups
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(follow_ups
            .iter()
            .filter(|row| row.user_id == session.user_id)
            .cloned()
            .collect())
    }

    async fn insert_follow_up(
        &self,
        session: &Session,
        columns: FollowUpColumns,
    ) -> Result<FollowUpRow> {
        // Foreign key: the lead must exist and belong to the caller
        let lead_exists = self
            .leads
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?
            .iter()
            .any(|row| row.id == columns.lead_id && row.user_id == session.user_id);
        if !lead_exists {
            return Err(anyhow!(
                "Lead {} not found for follow-up",
                columns.lead_id
            ));
        }

        let row = FollowUpRow {
            id: Uuid::new_v4().to_string(),
            user_id: session.user_id,
            created_at: Utc::now(),
            columns,
        };

        self.follow_ups
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?
            .push(row.clone());

        self.publish(Table::FollowUps, ChangeAction::Insert, &row.id);
        Ok(row)
    }

    async fn update_follow_up(
        &self,
        session: &Session,
        id: &str,
        columns: FollowUpColumns,
    ) -> Result<FollowUpRow> {
        let updated = {
            let mut follow_ups = self
                .follow_ups
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

            let row = follow_ups
                .iter_mut()
                .find(|row| row.id == id && row.user_id == session.user_id)
                .ok_or_else(|| anyhow!("Follow-up {} not found", id))?;
            row.columns = columns;
            row.clone()
        };

        self.publish(Table::FollowUps, ChangeAction::Update, id);
        Ok(updated)
    }

    async fn delete_follow_up(&self, session: &Session, id: &str) -> Result<()> {
        let removed = {
            let mut follow_ups = self
                .follow_ups
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

            let before = follow_ups.len();
            follow_ups.retain(|row| !(row.id == id && row.user_id == session.user_id));
            follow_ups.len() < before
        };

        if removed {
            self.publish(Table::FollowUps, ChangeAction::Delete, id);
        }
        Ok(())
    }

    async fn delete_follow_ups_for_lead(&self, session: &Session, lead_id: &str) -> Result<()> {
        let removed: Vec<String> = {
            let mut follow_ups = self
                .follow_ups
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

            let (gone, kept): (Vec<FollowUpRow>, Vec<FollowUpRow>) =
                follow_ups.drain(..).partition(|row| {
                    row.columns.lead_id == lead_id && row.user_id == session.user_id
                });
            *follow_ups = kept;
            gone.into_iter().map(|row| row.id).collect()
        };

        for id in &removed {
            self.publish(Table::FollowUps, ChangeAction::Delete, id);
        }
        Ok(())
    }

    fn subscribe(&self, table: Table) -> broadcast::Receiver<EventEnvelope> {
        self.bus(table).subscribe()
    }
}

/// In-memory session provider
///
/// Holds at most one session; `sign_in` and `sign_out` emit the matching
/// [`AuthEvent`].
#[derive(Clone)]
pub struct InMemorySessionProvider {
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl InMemorySessionProvider {
    /// Provider starting signed out
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            session: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Provider starting with `session` already signed in
    pub fn signed_in(session: Session) -> Self {
        let provider = Self::new();
        if let Ok(mut current) = provider.session.write() {
            *current = Some(session);
        }
        provider
    }

    pub fn sign_in(&self, session: Session) -> Result<()> {
        *self
            .session
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))? = Some(session.clone());
        // No receivers is fine
        let _ = self.events.send(AuthEvent::SignedIn { session });
        Ok(())
    }
}

impl Default for InMemorySessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn get_session(&self) -> Result<Option<Session>> {
        let session = self
            .session
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(session.clone())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        *self
            .session
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))? = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }
}
