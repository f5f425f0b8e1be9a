//! Session gate
//!
//! Wraps the backend's authentication session. The gate answers "is there a
//! session, and whose is it" and forwards sign-in/sign-out notifications.
//! A failed session check is treated as "no session": callers only ever see
//! `Option<Session>`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Owner of every row written under this session
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Authentication state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { session: Session },
    SignedOut,
}

impl AuthEvent {
    /// Session in effect after this event
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::SignedIn { session } => Some(session),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Backend authentication boundary
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current session, `None` when signed out
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Subscribe to sign-in/sign-out notifications
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent>;

    /// End the current session
    async fn sign_out(&self) -> Result<()>;
}

/// Session access for the mirror
#[derive(Clone)]
pub struct SessionGate {
    provider: Arc<dyn SessionProvider>,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    /// Current session; provider failures count as signed out
    pub async fn current_session(&self) -> Option<Session> {
        match self.provider.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed, treating as signed out");
                None
            }
        }
    }

    /// Receiver firing whenever sign-in or sign-out completes
    pub fn on_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.provider.on_auth_state_change()
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await
    }
}
