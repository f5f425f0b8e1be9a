//! The lead mirror
//!
//! [`LeadMirror`] keeps an in-memory copy of the `leads` and `follow_ups`
//! tables for the signed-in user. Writes go through the backend and are
//! followed by a full re-fetch of the affected table; the change feeds
//! trigger the same full re-fetch for writes made elsewhere.
//!
//! # Flow
//!
//! ```text
//! add_lead() ──▶ backend write ──▶ refresh_leads() ──▶ watch channel ──▶ UI
//!                     │
//!                     └──▶ change feed ──▶ listener ──▶ refresh_leads()
//! ```
//!
//! # Stale fetches
//!
//! Each refresh of a table draws a sequence number when it starts. Its result
//! is applied only if no fetch that started later has been applied already,
//! so a slow fetch never overwrites newer data.

use super::snapshot::MirrorSnapshot;
use crate::config::{DeletePolicy, MirrorConfig};
use crate::core::auth::{Session, SessionGate};
use crate::core::error::{FetchError, MirrorError, Operation};
use crate::core::events::Table;
use crate::core::follow_up::{FollowUp, FollowUpDraft, group_by_lead};
use crate::core::lead::{Lead, LeadDraft, LeadRow, LeadStatus};
use crate::core::metrics::DashboardMetrics;
use crate::core::notify::{Notification, Notifier};
use crate::core::service::LeadBackend;
use crate::core::validation;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

/// Client-side mirror of the leads and follow-ups tables
///
/// Build with [`MirrorBuilder`](super::MirrorBuilder), start with
/// [`init`](LeadMirror::init), stop with [`dispose`](LeadMirror::dispose).
/// Share it with UI components as an `Arc<LeadMirror>`.
pub struct LeadMirror {
    pub(super) backend: Arc<dyn LeadBackend>,
    pub(super) sessions: SessionGate,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) config: MirrorConfig,
    pub(super) state: watch::Sender<MirrorSnapshot>,
    pub(super) leads_seq: AtomicU64,
    pub(super) follow_ups_seq: AtomicU64,
    pub(super) tasks: Mutex<Vec<JoinHandle<()>>>,
    pub(super) disposed: AtomicBool,
}

impl LeadMirror {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribe to both change feeds and to auth changes, then load both
    /// tables
    ///
    /// Subscriptions are taken before the first fetch so no change made in
    /// between is missed. Calling `init` on a running mirror is a no-op.
    pub async fn init(self: &Arc<Self>) {
        {
            let Ok(mut tasks) = self.tasks.lock() else {
                tracing::error!("Mirror task list poisoned, not initializing");
                return;
            };
            if !tasks.is_empty() {
                tracing::warn!("Mirror already initialized");
                return;
            }
            self.disposed.store(false, Ordering::SeqCst);
            self.state.send_modify(|snap| snap.loading = true);

            tasks.push(self.spawn_table_listener(Table::Leads));
            tasks.push(self.spawn_table_listener(Table::FollowUps));
            tasks.push(self.spawn_auth_listener());
        }

        tracing::info!("Lead mirror initialized");

        // Failures are already notified and logged
        let _ = self.refresh_leads().await;
        let _ = self.refresh_follow_ups().await;
    }

    /// Stop listening for changes
    ///
    /// Fetches still in flight complete on the backend but their results are
    /// dropped.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let handles = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        if handles.is_empty() {
            return;
        }
        let count = handles.len();
        for handle in handles {
            handle.abort();
        }
        tracing::info!(listeners = count, "Lead mirror disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the current state
    pub fn snapshot(&self) -> MirrorSnapshot {
        self.state.borrow().clone()
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.state.borrow().leads.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Follow-ups grouped by lead id, without orphans
    pub fn follow_ups_by_lead(&self) -> HashMap<String, Vec<FollowUp>> {
        self.state.borrow().visible_follow_ups()
    }

    /// Follow-ups of a lead by ascending day number
    ///
    /// Empty when the lead has none or is no longer mirrored.
    pub fn get_lead_follow_ups(&self, lead_id: &str) -> Vec<FollowUp> {
        self.state.borrow().follow_ups_for(lead_id).to_vec()
    }

    /// Dashboard metrics over the current leads
    pub fn metrics(&self) -> DashboardMetrics {
        DashboardMetrics::compute(&self.state.borrow().leads)
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Receiver woken after every applied change
    pub fn subscribe(&self) -> watch::Receiver<MirrorSnapshot> {
        self.state.subscribe()
    }

    /// Stream of snapshots, starting with the current one
    pub fn changes(&self) -> WatchStream<MirrorSnapshot> {
        WatchStream::new(self.state.subscribe())
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.sessions.current_session().await
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Re-fetch one table
    pub async fn refresh(&self, table: Table) -> Result<(), MirrorError> {
        match table {
            Table::Leads => self.refresh_leads().await,
            Table::FollowUps => self.refresh_follow_ups().await,
        }
    }

    /// Replace the mirrored leads with the backend's current rows
    ///
    /// Without a session the leads are cleared. On failure the previous
    /// leads stay in place and the error is notified.
    pub async fn refresh_leads(&self) -> Result<(), MirrorError> {
        let seq = self.leads_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(session) = self.sessions.current_session().await else {
            self.apply_leads(seq, Vec::new());
            return Ok(());
        };

        let fetched = match self.backend.fetch_leads(&session).await {
            Ok(rows) => rows
                .into_iter()
                .map(Lead::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| FetchError::new(Operation::Fetch, Table::Leads, e.to_string())),
            Err(e) => Err(FetchError::from_backend(Operation::Fetch, Table::Leads, &e)),
        };

        match fetched {
            Ok(leads) => {
                self.apply_leads(seq, leads);
                Ok(())
            }
            Err(err) => {
                tracing::error!(table = %Table::Leads, seq, error = %err, "Fetch failed");
                self.state
                    .send_if_modified(|snap| std::mem::replace(&mut snap.loading, false));
                self.notify(Notification::error("Error", "Failed to fetch leads"));
                Err(err.into())
            }
        }
    }

    /// Replace the mirrored follow-ups with the backend's current rows
    pub async fn refresh_follow_ups(&self) -> Result<(), MirrorError> {
        let seq = self.follow_ups_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(session) = self.sessions.current_session().await else {
            self.apply_follow_ups(seq, HashMap::new());
            return Ok(());
        };

        match self.backend.fetch_follow_ups(&session).await {
            Ok(rows) => {
                let grouped = group_by_lead(rows.into_iter().map(FollowUp::from));
                self.apply_follow_ups(seq, grouped);
                Ok(())
            }
            Err(e) => {
                let err = FetchError::from_backend(Operation::Fetch, Table::FollowUps, &e);
                tracing::error!(table = %Table::FollowUps, seq, error = %err, "Fetch failed");
                self.notify(Notification::error("Error", "Failed to fetch follow-ups"));
                Err(err.into())
            }
        }
    }

    fn apply_leads(&self, seq: u64, leads: Vec<Lead>) -> bool {
        if self.is_disposed() {
            tracing::debug!(table = %Table::Leads, seq, "Mirror disposed, fetch dropped");
            return false;
        }
        let count = leads.len();
        let applied = self.state.send_if_modified(|snap| {
            if seq <= snap.leads_revision {
                return false;
            }
            snap.leads = leads;
            snap.leads_revision = seq;
            snap.loading = false;
            true
        });
        if applied {
            tracing::debug!(table = %Table::Leads, seq, count, "Fetch applied");
        } else {
            tracing::debug!(table = %Table::Leads, seq, "Stale fetch discarded");
        }
        applied
    }

    fn apply_follow_ups(&self, seq: u64, grouped: HashMap<String, Vec<FollowUp>>) -> bool {
        if self.is_disposed() {
            tracing::debug!(table = %Table::FollowUps, seq, "Mirror disposed, fetch dropped");
            return false;
        }
        let applied = self.state.send_if_modified(|snap| {
            if seq <= snap.follow_ups_revision {
                return false;
            }
            snap.follow_ups_by_lead = grouped;
            snap.follow_ups_revision = seq;
            true
        });
        if applied {
            tracing::debug!(table = %Table::FollowUps, seq, "Fetch applied");
        } else {
            tracing::debug!(table = %Table::FollowUps, seq, "Stale fetch discarded");
        }
        applied
    }

    // =========================================================================
    // Lead writes
    // =========================================================================

    /// Validate and insert a lead owned by the signed-in user
    ///
    /// Nothing is changed locally until the follow-up fetch lands.
    pub async fn add_lead(&self, draft: LeadDraft) -> Result<Lead, MirrorError> {
        let result = async {
            validation::check(&draft)?;
            let session = self.require_session().await?;
            let row = self
                .backend
                .insert_lead(&session, draft.to_columns())
                .await
                .map_err(|e| FetchError::from_backend(Operation::Insert, Table::Leads, &e))?;
            project_lead(row, Operation::Insert)
        }
        .await;
        self.finish(
            result,
            Table::Leads,
            Notification::success("Success", format!("Lead \"{}\" added", draft.name)),
            "Failed to add lead",
        )
        .await
    }

    /// Replace every field of a lead
    pub async fn update_lead(&self, id: &str, draft: LeadDraft) -> Result<Lead, MirrorError> {
        let result = async {
            validation::check(&draft)?;
            let session = self.require_session().await?;
            let row = self
                .backend
                .update_lead(&session, id, draft.to_columns())
                .await
                .map_err(|e| FetchError::from_backend(Operation::Update, Table::Leads, &e))?;
            project_lead(row, Operation::Update)
        }
        .await;
        self.finish(
            result,
            Table::Leads,
            Notification::success("Success", "Lead updated"),
            "Failed to update lead",
        )
        .await
    }

    /// Move a lead to another pipeline status
    pub async fn update_lead_status(
        &self,
        id: &str,
        status: LeadStatus,
    ) -> Result<Lead, MirrorError> {
        let result = async {
            let session = self.require_session().await?;
            let row = self
                .backend
                .update_lead_status(&session, id, status)
                .await
                .map_err(|e| {
                    FetchError::from_backend(Operation::UpdateStatus, Table::Leads, &e)
                })?;
            project_lead(row, Operation::UpdateStatus)
        }
        .await;
        self.finish(
            result,
            Table::Leads,
            Notification::success("Success", format!("Lead moved to {}", status.label())),
            "Failed to update lead status",
        )
        .await
    }

    /// Delete a lead, applying the configured policy to its follow-ups
    ///
    /// The lead goes first. If removing its follow-ups then fails they are
    /// left orphaned, and orphans are never shown.
    pub async fn delete_lead(&self, id: &str) -> Result<(), MirrorError> {
        let cascade = self.config.delete_policy == DeletePolicy::Cascade;
        let mut lead_deleted = false;
        let result = async {
            let session = self.require_session().await?;
            self.backend
                .delete_lead(&session, id)
                .await
                .map_err(|e| FetchError::from_backend(Operation::Delete, Table::Leads, &e))?;
            lead_deleted = true;
            if cascade {
                self.backend
                    .delete_follow_ups_for_lead(&session, id)
                    .await
                    .map_err(|e| {
                        FetchError::from_backend(Operation::Delete, Table::FollowUps, &e)
                    })?;
            }
            Ok::<_, MirrorError>(())
        }
        .await;

        if lead_deleted {
            // Part of the cascade may have landed even if the rest failed
            if cascade {
                let _ = self.refresh_follow_ups().await;
            }
            if result.is_err() {
                let _ = self.refresh_leads().await;
            }
        }
        self.finish(
            result,
            Table::Leads,
            Notification::success("Success", "Lead deleted"),
            "Failed to delete lead",
        )
        .await
    }

    // =========================================================================
    // Follow-up writes
    // =========================================================================

    /// Add a follow-up note to a lead
    pub async fn add_follow_up(&self, draft: FollowUpDraft) -> Result<FollowUp, MirrorError> {
        let result = async {
            validation::check(&draft)?;
            let session = self.require_session().await?;
            let row = self
                .backend
                .insert_follow_up(&session, draft.to_columns())
                .await
                .map_err(|e| FetchError::from_backend(Operation::Insert, Table::FollowUps, &e))?;
            Ok::<_, MirrorError>(FollowUp::from(row))
        }
        .await;
        self.finish(
            result,
            Table::FollowUps,
            Notification::success(
                "Success",
                format!("Day {} follow-up added", draft.day_number),
            ),
            "Failed to add follow-up",
        )
        .await
    }

    /// Replace every field of a follow-up
    pub async fn update_follow_up(
        &self,
        id: &str,
        draft: FollowUpDraft,
    ) -> Result<FollowUp, MirrorError> {
        let result = async {
            validation::check(&draft)?;
            let session = self.require_session().await?;
            let row = self
                .backend
                .update_follow_up(&session, id, draft.to_columns())
                .await
                .map_err(|e| FetchError::from_backend(Operation::Update, Table::FollowUps, &e))?;
            Ok::<_, MirrorError>(FollowUp::from(row))
        }
        .await;
        self.finish(
            result,
            Table::FollowUps,
            Notification::success("Success", "Follow-up updated"),
            "Failed to update follow-up",
        )
        .await
    }

    pub async fn delete_follow_up(&self, id: &str) -> Result<(), MirrorError> {
        let result = async {
            let session = self.require_session().await?;
            self.backend
                .delete_follow_up(&session, id)
                .await
                .map_err(|e| FetchError::from_backend(Operation::Delete, Table::FollowUps, &e))?;
            Ok::<_, MirrorError>(())
        }
        .await;
        self.finish(
            result,
            Table::FollowUps,
            Notification::success("Success", "Follow-up deleted"),
            "Failed to delete follow-up",
        )
        .await
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign out and clear the mirror
    pub async fn sign_out(&self) -> Result<(), MirrorError> {
        if let Err(e) = self.sessions.sign_out().await {
            let err = FetchError::session(Operation::SignOut, format!("{:#}", e));
            tracing::warn!(error = %err, "Sign out failed");
            self.notify(Notification::error("Error", "Failed to sign out"));
            return Err(err.into());
        }
        let _ = self.refresh_leads().await;
        let _ = self.refresh_follow_ups().await;
        self.notify(Notification::info("Signed out", "You have been signed out"));
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_session(&self) -> Result<Session, MirrorError> {
        self.sessions
            .current_session()
            .await
            .ok_or(MirrorError::AuthRequired)
    }

    /// Refresh after a successful write; notify the outcome either way
    async fn finish<T>(
        &self,
        result: Result<T, MirrorError>,
        table: Table,
        success: Notification,
        failure: &str,
    ) -> Result<T, MirrorError> {
        match result {
            Ok(value) => {
                let _ = self.refresh(table).await;
                self.notify(success);
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(%table, code = err.error_code(), error = %err, "{}", failure);
                self.notify(Notification::error("Error", format!("{}: {}", failure, err)));
                Err(err)
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if self.config.notifications.enabled {
            self.notifier.notify(notification);
        }
    }
}

impl Drop for LeadMirror {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn project_lead(row: LeadRow, operation: Operation) -> Result<Lead, MirrorError> {
    Lead::try_from(row)
        .map_err(|e| FetchError::new(operation, Table::Leads, e.to_string()).into())
}
