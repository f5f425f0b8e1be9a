//! Backend service trait
//!
//! The backend is an opaque relational store with a realtime change feed.
//! Implementations own row storage, id and timestamp assignment, and the
//! per-user ownership rule; the mirror only reads whole tables and writes
//! single records through this trait.

use crate::core::auth::Session;
use crate::core::events::{EventEnvelope, Table};
use crate::core::follow_up::{FollowUpColumns, FollowUpRow};
use crate::core::lead::{LeadColumns, LeadRow, LeadStatus};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Service trait for the `leads` and `follow_ups` tables
#[async_trait]
pub trait LeadBackend: Send + Sync {
    /// All leads owned by the session's user, newest first
    async fn fetch_leads(&self, session: &Session) -> Result<Vec<LeadRow>>;

    /// Insert a lead owned by the session's user
    ///
    /// The backend assigns `id` and `created_at`.
    async fn insert_lead(&self, session: &Session, columns: LeadColumns) -> Result<LeadRow>;

    /// Replace every writable column of a lead
    async fn update_lead(
        &self,
        session: &Session,
        id: &str,
        columns: LeadColumns,
    ) -> Result<LeadRow>;

    /// Change only the status column of a lead
    async fn update_lead_status(
        &self,
        session: &Session,
        id: &str,
        status: LeadStatus,
    ) -> Result<LeadRow>;

    /// Delete a lead
    async fn delete_lead(&self, session: &Session, id: &str) -> Result<()>;

    /// All follow-ups owned by the session's user
    async fn fetch_follow_ups(&self, session: &Session) -> Result<Vec<FollowUpRow>>;

    async fn insert_follow_up(
        &self,
        session: &Session,
        columns: FollowUpColumns,
    ) -> Result<FollowUpRow>;

    async fn update_follow_up(
        &self,
        session: &Session,
        id: &str,
        columns: FollowUpColumns,
    ) -> Result<FollowUpRow>;

    async fn delete_follow_up(&self, session: &Session, id: &str) -> Result<()>;

    /// Delete every follow-up attached to a lead
    ///
    /// Used by the cascade delete policy.
    async fn delete_follow_ups_for_lead(&self, session: &Session, lead_id: &str) -> Result<()>;

    /// Subscribe to the change feed of one table
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self, table: Table) -> broadcast::Receiver<EventEnvelope>;
}
