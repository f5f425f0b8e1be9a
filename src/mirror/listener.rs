//! Background tasks that turn change feeds into refreshes
//!
//! Every change event, whatever its action or record, triggers a full
//! re-fetch of its table. Auth changes re-fetch both tables. The tasks hold
//! only a weak reference to the mirror and stop once it is gone.

use super::store::LeadMirror;
use crate::core::auth::AuthEvent;
use crate::core::events::{EventEnvelope, Table};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

impl LeadMirror {
    /// Subscribe to one table's change feed and refresh on every event
    ///
    /// The subscription is taken before returning, so events published after
    /// this call are never missed.
    pub(super) fn spawn_table_listener(self: &Arc<Self>, table: Table) -> JoinHandle<()> {
        let rx = self.backend.subscribe(table);
        let mirror = Arc::downgrade(self);
        tokio::spawn(run_table_loop(mirror, table, rx))
    }

    /// Refresh both tables whenever the session changes
    pub(super) fn spawn_auth_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let rx = self.sessions.on_change();
        let mirror = Arc::downgrade(self);
        tokio::spawn(run_auth_loop(mirror, rx))
    }
}

async fn run_table_loop(
    mirror: Weak<LeadMirror>,
    table: Table,
    mut rx: broadcast::Receiver<EventEnvelope>,
) {
    tracing::debug!(%table, "Change listener started");

    loop {
        match rx.recv().await {
            Ok(envelope) => {
                tracing::debug!(
                    %table,
                    action = envelope.event.action.as_str(),
                    record_id = %envelope.event.record_id,
                    "Change received"
                );
            }
            Err(broadcast::error::RecvError::Lagged(count)) => {
                // Skipped events only mean the mirror is behind; one refresh catches up
                tracing::warn!(%table, count, "Change listener lagged, {} events skipped", count);
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!(%table, "Change feed closed, stopping listener");
                break;
            }
        }

        let Some(mirror) = mirror.upgrade() else {
            break;
        };
        if mirror.is_disposed() {
            break;
        }
        // Failures are notified by the refresh itself
        let _ = mirror.refresh(table).await;
    }
}

async fn run_auth_loop(mirror: Weak<LeadMirror>, mut rx: broadcast::Receiver<AuthEvent>) {
    tracing::debug!("Auth listener started");

    loop {
        match rx.recv().await {
            Ok(event) => {
                tracing::info!(signed_in = event.session().is_some(), "Auth state changed");
            }
            Err(broadcast::error::RecvError::Lagged(count)) => {
                tracing::warn!(count, "Auth listener lagged, {} events skipped", count);
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Auth feed closed, stopping listener");
                break;
            }
        }

        let Some(mirror) = mirror.upgrade() else {
            break;
        };
        if mirror.is_disposed() {
            break;
        }
        let _ = mirror.refresh_leads().await;
        let _ = mirror.refresh_follow_ups().await;
    }
}
