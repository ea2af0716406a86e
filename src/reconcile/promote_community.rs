use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    DEV_TRACKER, ItemOutcome, ItemResult, Pass, PassReport, Reconciler, TaskGroup, logged,
};
use crate::errors::{SyncError, TrackerError};
use crate::mapper::{self, IN_DEVELOPMENT};
use crate::tracker::{Bug, BugQuery, BugTracker, RecordRef};

impl Reconciler {
    /// File a community bug for every eligible dev tracker bug in development.
    pub async fn promote_to_community(&self) -> Result<PassReport, SyncError> {
        let pass = Pass::PromoteToCommunity;
        let bugs = self
            .dev
            .search_bugs(&BugQuery::status(IN_DEVELOPMENT))
            .await
            .map_err(|source| {
                logged(SyncError::Search {
                    pass,
                    tracker: DEV_TRACKER.to_string(),
                    source,
                })
            })?;

        let mut group = TaskGroup::new(pass, self.settings.max_concurrency, bugs.len());
        for bug in bugs {
            if group.is_cancelled() {
                group.record(ItemOutcome::Aborted);
                continue;
            }
            if let Err(reason) = mapper::community_eligibility(&bug) {
                debug!(bug = %bug.id, %reason, "not promoting to community tracker");
                group.record(ItemOutcome::Skipped(reason));
                continue;
            }
            let job = PromoteBug {
                bug,
                dev: self.dev.clone(),
                community: self.community.clone(),
                cancel: group.token(),
            };
            group.spawn(job.run()).await?;
        }
        group.join().await
    }
}

struct PromoteBug {
    bug: Bug,
    dev: Arc<dyn BugTracker>,
    community: Arc<dyn BugTracker>,
    cancel: CancellationToken,
}

impl PromoteBug {
    async fn run(self) -> ItemResult {
        let bug = &self.bug;
        let origin = RecordRef::DevBug(bug.id);

        let lookup = |source: TrackerError| logged(SyncError::Lookup { record: origin, source });
        let comments = self.dev.comments(bug.id).await.map_err(lookup)?;
        let Some(description) = comments.first() else {
            return Err(lookup(TrackerError::NotFound(format!(
                "description comment on {}",
                origin
            ))));
        };

        if self.cancel.is_cancelled() {
            return Ok(ItemOutcome::Aborted);
        }

        let payload = mapper::community_bug_for(bug, description);
        let community_id = self
            .community
            .create_bug(&payload)
            .await
            .map_err(|source| logged(SyncError::Creation { origin, source }))?;
        let created = RecordRef::CommunityBug(community_id);

        self.dev
            .update_bug(bug.id, &mapper::community_backlink(community_id))
            .await
            .map_err(|source| {
                logged(SyncError::BacklinkWrite {
                    origin,
                    created,
                    source,
                })
            })?;
        info!(
            bug = %bug.id,
            community_bug = %community_id,
            "Created community bug {} for tracker bug {}",
            community_id,
            bug.id
        );

        Ok(ItemOutcome::Created { origin, created })
    }
}
