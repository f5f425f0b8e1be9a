//! Shared test harness for lead mirror testing
//!
//! Provides `ScriptedBackend`, an `InMemoryBackend` wrapper whose fetches and
//! writes can be made to fail or to stall, plus fixtures for drafts and a
//! ready-to-use signed-in mirror.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod mirror_harness;
//! use mirror_harness::*;
//! ```

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use leadboard::config::MirrorConfig;
use leadboard::core::auth::Session;
use leadboard::core::events::{EventEnvelope, Table};
use leadboard::core::follow_up::{FollowUpColumns, FollowUpDraft, FollowUpRow};
use leadboard::core::lead::{LeadColumns, LeadDraft, LeadRow, LeadSource, LeadStatus, Portfolio};
use leadboard::core::notify::RecordingNotifier;
use leadboard::core::service::LeadBackend;
use leadboard::mirror::{LeadMirror, MirrorBuilder, MirrorSnapshot};
use leadboard::storage::{InMemoryBackend, InMemorySessionProvider};

/// How long a test waits for a background refresh before failing
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// ScriptedBackend: failure and latency injection
// ---------------------------------------------------------------------------

/// Backend delegating to an `InMemoryBackend` with scripted misbehaviour
///
/// - `fail_fetches`: every fetch returns an error
/// - `fail_writes`: every insert/update/delete returns an error
/// - `fail_lead_deletes`: only `delete_lead` returns an error
/// - `fail_cascades`: only `delete_follow_ups_for_lead` returns an error
/// - `push_fetch_delay`: the next leads fetch reads its rows, then waits
#[derive(Clone)]
pub struct ScriptedBackend {
    pub inner: Arc<InMemoryBackend>,
    fail_fetches: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    fail_lead_deletes: Arc<AtomicBool>,
    fail_cascades: Arc<AtomicBool>,
    lead_fetch_delays: Arc<Mutex<VecDeque<Duration>>>,
    write_calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(inner: Arc<InMemoryBackend>) -> Self {
        Self {
            inner,
            fail_fetches: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_lead_deletes: Arc::new(AtomicBool::new(false)),
            fail_cascades: Arc::new(AtomicBool::new(false)),
            lead_fetch_delays: Arc::new(Mutex::new(VecDeque::new())),
            write_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lead_deletes(&self, fail: bool) {
        self.fail_lead_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cascades(&self, fail: bool) {
        self.fail_cascades.store(fail, Ordering::SeqCst);
    }

    /// Delay applied to the next leads fetch, after it has read its rows
    pub fn push_fetch_delay(&self, delay: Duration) {
        self.lead_fetch_delays.lock().unwrap().push_back(delay);
    }

    /// Number of write calls that reached this backend
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn check_fetch(&self) -> Result<()> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset by peer"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("permission denied for table"));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadBackend for ScriptedBackend {
    async fn fetch_leads(&self, session: &Session) -> Result<Vec<LeadRow>> {
        self.check_fetch()?;
        let rows = self.inner.fetch_leads(session).await?;
        let delay = self.lead_fetch_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn insert_lead(&self, session: &Session, columns: LeadColumns) -> Result<LeadRow> {
        self.check_write()?;
        self.inner.insert_lead(session, columns).await
    }

    async fn update_lead(
        &self,
        session: &Session,
        id: &str,
        columns: LeadColumns,
    ) -> Result<LeadRow> {
        self.check_write()?;
        self.inner.update_lead(session, id, columns).await
    }

    async fn update_lead_status(
        &self,
        session: &Session,
        id: &str,
        status: LeadStatus,
    ) -> Result<LeadRow> {
        self.check_write()?;
        self.inner.update_lead_status(session, id, status).await
    }

    async fn delete_lead(&self, session: &Session, id: &str) -> Result<()> {
        self.check_write()?;
        if self.fail_lead_deletes.load(Ordering::SeqCst) {
            return Err(anyhow!("lead is locked by another transaction"));
        }
        self.inner.delete_lead(session, id).await
    }

    async fn fetch_follow_ups(&self, session: &Session) -> Result<Vec<FollowUpRow>> {
        self.check_fetch()?;
        self.inner.fetch_follow_ups(session).await
    }

    async fn insert_follow_up(
        &self,
        session: &Session,
        columns: FollowUpColumns,
    ) -> Result<FollowUpRow> {
        self.check_write()?;
        self.inner.insert_follow_up(session, columns).await
    }

    async fn update_follow_up(
        &self,
        session: &Session,
        id: &str,
        columns: FollowUpColumns,
    ) -> Result<FollowUpRow> {
        self.check_write()?;
        self.inner.update_follow_up(session, id, columns).await
    }

    async fn delete_follow_up(&self, session: &Session, id: &str) -> Result<()> {
        self.check_write()?;
        self.inner.delete_follow_up(session, id).await
    }

    async fn delete_follow_ups_for_lead(&self, session: &Session, lead_id: &str) -> Result<()> {
        self.check_write()?;
        if self.fail_cascades.load(Ordering::SeqCst) {
            return Err(anyhow!("statement timeout"));
        }
        self.inner.delete_follow_ups_for_lead(session, lead_id).await
    }

    fn subscribe(&self, table: Table) -> broadcast::Receiver<EventEnvelope> {
        self.inner.subscribe(table)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Everything a mirror test needs to drive and observe one mirror
pub struct TestMirror {
    pub mirror: Arc<LeadMirror>,
    pub backend: ScriptedBackend,
    pub sessions: Arc<InMemorySessionProvider>,
    pub notifier: RecordingNotifier,
    pub session: Session,
}

impl TestMirror {
    /// Signed-in mirror with default configuration, not yet initialized
    pub fn new() -> Self {
        Self::with_config(MirrorConfig::default())
    }

    pub fn with_config(config: MirrorConfig) -> Self {
        let session = Session::new(Uuid::new_v4()).with_email("owner@example.com");
        let sessions = Arc::new(InMemorySessionProvider::signed_in(session.clone()));
        Self::build(config, session, sessions)
    }

    /// Mirror whose session provider starts signed out
    pub fn signed_out() -> Self {
        let session = Session::new(Uuid::new_v4());
        let sessions = Arc::new(InMemorySessionProvider::new());
        Self::build(MirrorConfig::default(), session, sessions)
    }

    fn build(
        config: MirrorConfig,
        session: Session,
        sessions: Arc<InMemorySessionProvider>,
    ) -> Self {
        let inner = InMemoryBackend::with_capacity(config.event_capacity);
        let backend = ScriptedBackend::new(Arc::new(inner));
        let notifier = RecordingNotifier::new();
        let mirror = MirrorBuilder::new()
            .with_backend(backend.clone())
            .with_session_provider(sessions.clone())
            .with_notifier(Arc::new(notifier.clone()))
            .with_config(config)
            .build()
            .unwrap();
        Self {
            mirror,
            backend,
            sessions,
            notifier,
            session,
        }
    }

    /// Initialized mirror
    pub async fn started() -> Self {
        let harness = Self::new();
        harness.mirror.init().await;
        harness
    }

    /// Wait until the mirror publishes a snapshot matching `predicate`
    pub async fn settle(&self, predicate: impl FnMut(&MirrorSnapshot) -> bool) -> MirrorSnapshot {
        let mut rx = self.mirror.subscribe();
        let snapshot = tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(predicate))
            .await
            .expect("mirror did not settle in time")
            .expect("mirror state channel closed")
            .clone();
        snapshot
    }
}

/// A valid lead draft
pub fn lead_draft(name: &str) -> LeadDraft {
    LeadDraft {
        name: name.to_string(),
        organization: "Acme".to_string(),
        email: "a@acme.com".to_string(),
        contact_number: "0700000000".to_string(),
        portfolio: Portfolio::Academy,
        lead_type: "School".to_string(),
        lead_source: LeadSource::Website,
        next_follow_up: "2025-06-01".to_string(),
        expected_revenue: "$5,000".to_string(),
        lead_owner: "Jane".to_string(),
        requirements: String::new(),
        status: LeadStatus::New,
    }
}

/// A valid follow-up draft for `lead_id`
pub fn follow_up_draft(lead_id: &str, day_number: u32) -> FollowUpDraft {
    FollowUpDraft {
        lead_id: lead_id.to_string(),
        day_number,
        notes: format!("Day {} call", day_number),
        updated_by: "Jane".to_string(),
        follow_up_date: "2025-06-01".to_string(),
        work_status: "in progress".to_string(),
        next_step: "send proposal".to_string(),
    }
}
