//! Reactive client-side mirror of the leads and follow-ups tables

pub mod builder;
mod listener;
pub mod snapshot;
pub mod store;

pub use builder::MirrorBuilder;
pub use snapshot::MirrorSnapshot;
pub use store::LeadMirror;
