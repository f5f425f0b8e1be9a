//! Core module containing the domain types and backend boundaries

pub mod auth;
pub mod error;
pub mod events;
pub mod follow_up;
pub mod lead;
pub mod metrics;
pub mod notify;
pub mod service;
pub mod validation;

pub use auth::{AuthEvent, Session, SessionGate, SessionProvider};
pub use error::{ConfigError, FetchError, MirrorError, Operation, ValidationError};
pub use events::{ChangeAction, ChangeEvent, EventBus, EventEnvelope, Table};
pub use follow_up::{FollowUp, FollowUpDraft};
pub use lead::{Lead, LeadDraft, LeadSource, LeadStatus, Portfolio};
pub use metrics::{DashboardMetrics, Reminder, Urgency};
pub use notify::{Notification, Notifier};
pub use service::LeadBackend;
