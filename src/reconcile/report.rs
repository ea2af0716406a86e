//! Per-item outcomes and per-pass reports.

use std::fmt;

use super::Pass;
use crate::errors::SyncError;
use crate::tracker::{BugId, RecordRef};

/// Why a candidate was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Live ticket state no longer matches the search (stale index).
    NoLongerEligible,
    AlreadyLinked,
    Exempt,
    OtherProduct(String),
    OtherComponent(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoLongerEligible => write!(f, "no longer eligible"),
            SkipReason::AlreadyLinked => write!(f, "already linked to a community bug"),
            SkipReason::Exempt => write!(f, "exempt from community processing"),
            SkipReason::OtherProduct(product) => write!(f, "product '{}' is not promoted", product),
            SkipReason::OtherComponent(component) => {
                write!(f, "component '{}' is not promoted", component)
            }
        }
    }
}

/// What happened to one candidate record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Created {
        origin: RecordRef,
        created: RecordRef,
    },
    Updated {
        bug: BugId,
        from: Option<String>,
        to: String,
    },
    Unchanged,
    Skipped(SkipReason),
    /// Not processed because a fatal error stopped the pass.
    Aborted,
}

/// Summary of one pass.
#[derive(Debug)]
pub struct PassReport {
    pub pass: Pass,
    pub candidates: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub aborted: usize,
    /// Contained failures; fatal errors never land here.
    pub failures: Vec<SyncError>,
}

impl PassReport {
    pub fn new(pass: Pass) -> Self {
        Self {
            pass,
            candidates: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            aborted: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Created { .. } => self.created += 1,
            ItemOutcome::Updated { .. } => self.updated += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Aborted => self.aborted += 1,
        }
    }

    pub fn record_failure(&mut self, err: SyncError) {
        // The linked record exists even though the backlink failed
        if matches!(err, SyncError::BacklinkWrite { .. }) {
            self.created += 1;
        }
        self.failures.push(err);
    }
}

/// Reports of every pass that ran, in order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub passes: Vec<PassReport>,
}

impl RunReport {
    pub fn failure_count(&self) -> usize {
        self.passes.iter().map(|p| p.failures.len()).sum()
    }

    pub fn pass(&self, pass: Pass) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.pass == pass)
    }
}
