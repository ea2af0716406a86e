//! Typed error hierarchy for tracker-updater.
//!
//! Three enums cover the three layers:
//! - `TrackerError`: a single call against RT or a Bugzilla instance failed
//! - `SyncError`: a reconciliation step failed; fatal or contained to one record
//! - `ConfigError`: the effective configuration could not be built

use std::time::Duration;

use thiserror::Error;

use crate::reconcile::Pass;
use crate::tracker::{BugId, InvalidLink, RecordRef};

/// Errors from a tracker client call.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Request to {tracker} failed: {source}")]
    Http {
        tracker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {tracker} timed out after {}s", .after.as_secs())]
    Timeout { tracker: String, after: Duration },

    #[error("{tracker} returned HTTP {status}: {message}")]
    Status {
        tracker: String,
        status: u16,
        message: String,
    },

    #[error("{tracker} rejected the request: {message}")]
    Api {
        tracker: String,
        message: String,
        code: Option<i64>,
    },

    #[error("Failed to decode {tracker} response: {message}")]
    Decode { tracker: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    InvalidLink(#[from] InvalidLink),
}

/// Errors from a reconciliation pass.
///
/// `is_fatal` decides whether the error stops the whole run or only the
/// record it concerns.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to search {tracker} for {pass} candidates: {source}")]
    Search {
        pass: Pass,
        tracker: String,
        #[source]
        source: TrackerError,
    },

    #[error("Failed to create a linked record for {origin}: {source}")]
    Creation {
        origin: RecordRef,
        #[source]
        source: TrackerError,
    },

    #[error("Created {created} but failed to link it back on {origin}: {source}")]
    BacklinkWrite {
        origin: RecordRef,
        created: RecordRef,
        #[source]
        source: TrackerError,
    },

    #[error("Failed to look up data for {record}: {source}")]
    Lookup {
        record: RecordRef,
        #[source]
        source: TrackerError,
    },

    #[error("Failed to mirror community status '{status}' onto dev bug {bug}: {source}")]
    StatusUpdate {
        bug: BugId,
        status: String,
        #[source]
        source: TrackerError,
    },

    #[error("{pass} task failed: {message}")]
    TaskFailed { pass: Pass, message: String },
}

impl SyncError {
    /// Fatal errors abort the run; everything else is contained to one record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Search { .. } | SyncError::Creation { .. } | SyncError::TaskFailed { .. }
        )
    }
}

/// Errors while building the effective configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No {0} URL configured")]
    MissingUrl(&'static str),

    #[error("Invalid {name} URL '{url}': {message}")]
    InvalidUrl {
        name: &'static str,
        url: String,
        message: String,
    },

    #[error("Invalid throttle range {min}..={max}")]
    InvalidThrottle { min: u32, max: u32 },

    #[error("max_concurrency must be at least 1")]
    InvalidConcurrency,
}
