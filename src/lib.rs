//! # Leadboard
//!
//! A reactive client-side mirror for a lead-management dashboard.
//!
//! ## Features
//!
//! - **Reactive Mirror**: in-memory copy of the signed-in user's leads and follow-ups
//! - **Realtime Refresh**: every change-feed event re-fetches the affected table
//! - **Stale-Fetch Guard**: a slow fetch never overwrites newer data
//! - **Typed Errors**: auth, fetch and validation failures are distinct variants
//! - **Derived Metrics**: status counts, conversion rate, revenue and reminders
//! - **Configuration-Based**: delete policy and reminders via YAML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leadboard::prelude::*;
//!
//! let sessions = Arc::new(InMemorySessionProvider::signed_in(Session::new(user_id)));
//! let mirror = MirrorBuilder::new()
//!     .with_backend(InMemoryBackend::new())
//!     .with_session_provider(sessions)
//!     .build()?;
//!
//! mirror.init().await;
//! let lead = mirror.add_lead(draft).await?;
//! mirror.update_lead_status(&lead.id, LeadStatus::Won).await?;
//!
//! let metrics = mirror.metrics();
//! println!("{}% converted", metrics.conversion_rate);
//! ```

pub mod config;
pub mod core;
pub mod mirror;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Domain ===
    pub use crate::core::{
        auth::{AuthEvent, Session, SessionProvider},
        error::{FetchError, MirrorError, ValidationError},
        events::{ChangeAction, ChangeEvent, Table},
        follow_up::{FollowUp, FollowUpDraft},
        lead::{Lead, LeadDraft, LeadSource, LeadStatus, Portfolio},
        metrics::{DashboardMetrics, Urgency, format_compact_currency},
        notify::{Notification, Notifier},
        service::LeadBackend,
    };

    // === Mirror ===
    pub use crate::mirror::{LeadMirror, MirrorBuilder, MirrorSnapshot};

    // === Storage ===
    pub use crate::storage::{InMemoryBackend, InMemorySessionProvider};

    // === Config ===
    pub use crate::config::{DeletePolicy, MirrorConfig};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
