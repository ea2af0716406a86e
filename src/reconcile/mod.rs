//! Three-pass reconciliation engine.
//!
//! Passes run strictly in order: [`Pass::PromoteToDev`] →
//! [`Pass::PromoteToCommunity`] → [`Pass::SyncCommunityStatus`]. Inside a
//! pass, records are processed concurrently by a bounded task group, and the
//! pass only returns once every task has settled, so later passes see the
//! cross-references written by earlier ones.

mod promote_community;
mod promote_dev;
mod report;
mod sync_status;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::Config;
use crate::errors::{SyncError, TrackerError};
use crate::mapper::DEFAULT_ASSIGNEE;
use crate::tracker::{BugTracker, BugzillaClient, RequestTracker, RtClient};

pub use report::{ItemOutcome, PassReport, RunReport, SkipReason};

/// One reconciliation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    PromoteToDev,
    PromoteToCommunity,
    SyncCommunityStatus,
}

impl Pass {
    pub const ALL: [Pass; 3] = [
        Pass::PromoteToDev,
        Pass::PromoteToCommunity,
        Pass::SyncCommunityStatus,
    ];
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::PromoteToDev => write!(f, "Promote-to-Dev"),
            Pass::PromoteToCommunity => write!(f, "Promote-to-Community"),
            Pass::SyncCommunityStatus => write!(f, "Sync-Status-from-Community"),
        }
    }
}

/// Random delay before each RT ticket fetch: `min_units..=max_units` times `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub unit: Duration,
    pub min_units: u32,
    pub max_units: u32,
}

impl Throttle {
    pub const fn disabled() -> Self {
        Self {
            unit: Duration::ZERO,
            min_units: 0,
            max_units: 0,
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.unit.is_zero() {
            return Duration::ZERO;
        }
        let (low, high) = (
            self.min_units.min(self.max_units),
            self.min_units.max(self.max_units),
        );
        self.unit * rand::thread_rng().gen_range(low..=high)
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            unit: Duration::from_millis(100),
            min_units: 1,
            max_units: 5,
        }
    }
}

/// Engine settings that do not concern any single tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub assignee: String,
    pub max_concurrency: usize,
    pub throttle: Throttle,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            assignee: DEFAULT_ASSIGNEE.to_string(),
            max_concurrency: 8,
            throttle: Throttle::default(),
        }
    }
}

/// Drives the three passes against a set of trackers.
pub struct Reconciler {
    rt: Arc<dyn RequestTracker>,
    dev: Arc<dyn BugTracker>,
    community: Arc<dyn BugTracker>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(
        rt: Arc<dyn RequestTracker>,
        dev: Arc<dyn BugTracker>,
        community: Arc<dyn BugTracker>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            rt,
            dev,
            community,
            settings,
        }
    }

    /// Build HTTP clients for every tracker in `config`.
    pub fn from_config(config: &Config) -> Result<Self, TrackerError> {
        let rt = RtClient::new(&config.rt, config.request_timeout)?;
        let dev = BugzillaClient::new(DEV_TRACKER, &config.dev_tracker, config.request_timeout)?;
        let community =
            BugzillaClient::new(COMMUNITY_TRACKER, &config.community, config.request_timeout)?;
        Ok(Self::new(
            Arc::new(rt),
            Arc::new(dev),
            Arc::new(community),
            config.settings.clone(),
        ))
    }

    /// Run all passes in order, stopping at the first fatal error.
    pub async fn run(&self) -> Result<RunReport, SyncError> {
        let mut report = RunReport::default();
        for pass in Pass::ALL {
            report.passes.push(self.run_pass(pass).await?);
        }
        Ok(report)
    }

    pub async fn run_pass(&self, pass: Pass) -> Result<PassReport, SyncError> {
        match pass {
            Pass::PromoteToDev => self.promote_to_dev().await,
            Pass::PromoteToCommunity => self.promote_to_community().await,
            Pass::SyncCommunityStatus => self.sync_community_status().await,
        }
    }
}

pub(crate) const DEV_TRACKER: &str = "dev tracker";
pub(crate) const COMMUNITY_TRACKER: &str = "community tracker";

type ItemResult = Result<ItemOutcome, SyncError>;

/// Bounded set of per-record tasks for one pass.
///
/// A task returning a fatal error cancels the group's token before it gives
/// up its permit, so queued tasks observe the cancellation before touching a
/// tracker.
struct TaskGroup {
    tasks: JoinSet<ItemResult>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    report: PassReport,
}

impl TaskGroup {
    fn new(pass: Pass, max_concurrency: usize, candidates: usize) -> Self {
        let mut report = PassReport::new(pass);
        report.candidates = candidates;
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            cancel: CancellationToken::new(),
            report,
        }
    }

    fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record an outcome decided without spawning a task.
    fn record(&mut self, outcome: ItemOutcome) {
        self.report.record(outcome);
    }

    fn record_failure(&mut self, err: SyncError) {
        self.report.record_failure(err);
    }

    /// Wait for a free slot, then spawn `task`.
    async fn spawn<F>(&mut self, task: F) -> Result<(), SyncError>
    where
        F: Future<Output = ItemResult> + Send + 'static,
    {
        let pass = self.report.pass;
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SyncError::TaskFailed {
                pass,
                message: e.to_string(),
            })?;
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let _permit = permit; // Hold until complete
            let result = task.await;
            if let Err(err) = &result
                && err.is_fatal()
            {
                cancel.cancel();
            }
            result
        });
        Ok(())
    }

    /// Join barrier: wait for every task, then report or surface the first fatal error.
    async fn join(mut self) -> Result<PassReport, SyncError> {
        let pass = self.report.pass;
        let mut fatal: Option<SyncError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = joined
                .map_err(|e| SyncError::TaskFailed {
                    pass,
                    message: e.to_string(),
                })
                .and_then(|r| r);
            match result {
                Ok(outcome) => self.report.record(outcome),
                Err(err) if err.is_fatal() => {
                    self.cancel.cancel();
                    if fatal.is_none() {
                        fatal = Some(err);
                    }
                }
                Err(err) => self.report.record_failure(err),
            }
        }

        match fatal {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }
}

/// Log an error with the severity its class implies and hand it back.
fn logged(err: SyncError) -> SyncError {
    if err.is_fatal() {
        error!(error = %err, "fatal reconciliation error");
    } else {
        warn!(error = %err, "record skipped after error");
    }
    err
}
