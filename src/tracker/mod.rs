//! Tracker client adapters.
//!
//! The reconciliation engine only talks to trackers through the
//! [`RequestTracker`] and [`BugTracker`] traits. Real implementations:
//! [`RtClient`] and [`BugzillaClient`]; tests use in-memory doubles.

pub mod bugzilla;
#[cfg(test)]
pub(crate) mod memory;
pub mod models;
pub mod rt;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::TrackerError;

pub use bugzilla::BugzillaClient;
pub use models::{
    Bug, BugId, BugQuery, BugUpdate, Comment, CommunityLink, InvalidLink, NewBug, RecordRef,
    RtTicket, TicketFields, TicketId, TicketSummary,
};
pub use rt::RtClient;

/// Operations the engine needs from RT.
#[async_trait]
pub trait RequestTracker: Send + Sync {
    /// Run a TicketSQL query; returns id and subject per hit.
    async fn search_tickets(&self, query: &str) -> Result<Vec<TicketSummary>, TrackerError>;

    async fn ticket(&self, id: TicketId) -> Result<RtTicket, TrackerError>;

    async fn update_ticket(&self, id: TicketId, fields: &TicketFields) -> Result<(), TrackerError>;
}

/// Operations the engine needs from a Bugzilla instance.
#[async_trait]
pub trait BugTracker: Send + Sync {
    async fn search_bugs(&self, query: &BugQuery) -> Result<Vec<Bug>, TrackerError>;

    async fn bug(&self, id: BugId) -> Result<Bug, TrackerError>;

    async fn create_bug(&self, bug: &NewBug) -> Result<BugId, TrackerError>;

    async fn update_bug(&self, id: BugId, update: &BugUpdate) -> Result<(), TrackerError>;

    /// Comments in creation order; the first one is the bug description.
    async fn comments(&self, id: BugId) -> Result<Vec<Comment>, TrackerError>;
}

/// Map a reqwest failure to a tracker error, separating out timeouts.
pub(crate) fn transport_error(tracker: &str, timeout: Duration, source: reqwest::Error) -> TrackerError {
    if source.is_timeout() {
        TrackerError::Timeout {
            tracker: tracker.to_string(),
            after: timeout,
        }
    } else {
        TrackerError::Http {
            tracker: tracker.to_string(),
            source,
        }
    }
}
