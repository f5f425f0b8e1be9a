//! MirrorBuilder for wiring a lead mirror to its backend

use super::snapshot::MirrorSnapshot;
use super::store::LeadMirror;
use crate::config::MirrorConfig;
use crate::core::auth::{SessionGate, SessionProvider};
use crate::core::notify::{Notifier, TracingNotifier};
use crate::core::service::LeadBackend;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Builder for a [`LeadMirror`]
///
/// # Example
///
/// ```ignore
/// let mirror = MirrorBuilder::new()
///     .with_backend(InMemoryBackend::new())
///     .with_session_provider(sessions.clone())
///     .with_config(MirrorConfig::from_yaml_file("leadboard.yaml")?)
///     .build()?;
///
/// mirror.init().await;
/// ```
pub struct MirrorBuilder {
    backend: Option<Arc<dyn LeadBackend>>,
    sessions: Option<Arc<dyn SessionProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    config: MirrorConfig,
}

impl MirrorBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            sessions: None,
            notifier: None,
            config: MirrorConfig::default(),
        }
    }

    /// Set the backend (required)
    pub fn with_backend(mut self, backend: impl LeadBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set a backend that is shared with other owners
    pub fn with_backend_arc(mut self, backend: Arc<dyn LeadBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the session provider (required)
    pub fn with_session_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(provider);
        self
    }

    /// Set where user-facing notices go
    ///
    /// Defaults to [`TracingNotifier`], which only logs them.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_config(mut self, config: MirrorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the mirror
    ///
    /// The mirror is idle until [`LeadMirror::init`] is called.
    pub fn build(self) -> Result<Arc<LeadMirror>> {
        self.config.validate()?;

        let backend = self
            .backend
            .ok_or_else(|| anyhow::anyhow!("LeadBackend is required. Call .with_backend()"))?;
        let sessions = self.sessions.ok_or_else(|| {
            anyhow::anyhow!("SessionProvider is required. Call .with_session_provider()")
        })?;
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier));

        let (state, _) = watch::channel(MirrorSnapshot::default());

        tracing::debug!(
            delete_policy = ?self.config.delete_policy,
            notifications = self.config.notifications.enabled,
            "Lead mirror built"
        );

        Ok(Arc::new(LeadMirror {
            backend,
            sessions: SessionGate::new(sessions),
            notifier,
            config: self.config,
            state,
            leads_seq: AtomicU64::new(0),
            follow_ups_seq: AtomicU64::new(0),
            tasks: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }))
    }
}

impl Default for MirrorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
