use std::sync::Arc;

use tracing::{debug, info};

use super::{
    DEV_TRACKER, ItemOutcome, ItemResult, Pass, PassReport, Reconciler, SkipReason, TaskGroup,
    logged,
};
use crate::errors::{SyncError, TrackerError};
use crate::mapper::{self, SUBMITTED_TO_COMMUNITY};
use crate::tracker::{Bug, BugId, BugQuery, BugTracker, CommunityLink, RecordRef};

impl Reconciler {
    /// Mirror community status and summary onto dev bugs submitted upstream.
    pub async fn sync_community_status(&self) -> Result<PassReport, SyncError> {
        let pass = Pass::SyncCommunityStatus;
        let bugs = self
            .dev
            .search_bugs(&BugQuery::status(SUBMITTED_TO_COMMUNITY))
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
            let community_id = match bug.community_link() {
                Ok(CommunityLink::Linked(id)) => id,
                Ok(CommunityLink::Exempt) => {
                    debug!(bug = %bug.id, "community sync disabled for bug");
                    group.record(ItemOutcome::Skipped(SkipReason::Exempt));
                    continue;
                }
                Ok(CommunityLink::Unlinked) => {
                    let source =
                        TrackerError::NotFound(format!("community bug reference on dev bug {}", bug.id));
                    group.record_failure(logged(SyncError::Lookup {
                        record: RecordRef::DevBug(bug.id),
                        source,
                    }));
                    continue;
                }
                Err(invalid) => {
                    group.record_failure(logged(SyncError::Lookup {
                        record: RecordRef::DevBug(bug.id),
                        source: invalid.into(),
                    }));
                    continue;
                }
            };
            let job = SyncBug {
                bug,
                community_id,
                dev: self.dev.clone(),
                community: self.community.clone(),
            };
            group.spawn(job.run()).await?;
        }
        group.join().await
    }
}

struct SyncBug {
    bug: Bug,
    community_id: BugId,
    dev: Arc<dyn BugTracker>,
    community: Arc<dyn BugTracker>,
}

impl SyncBug {
    async fn run(self) -> ItemResult {
        let bug = &self.bug;

        let community_bug = self.community.bug(self.community_id).await.map_err(|source| {
            logged(SyncError::Lookup {
                record: RecordRef::CommunityBug(self.community_id),
                source,
            })
        })?;

        debug!(
            bug = %bug.id,
            mirrored = bug.cf_community_status.as_deref().unwrap_or("<unset>"),
            community_status = %community_bug.status,
            "comparing community status"
        );

        let Some(update) = mapper::status_sync_update(bug, &community_bug) else {
            return Ok(ItemOutcome::Unchanged);
        };

        info!(
            bug = %bug.id,
            community_bug = %community_bug.id,
            "Updating tracker bug {} with status {} to community status {} from community bug {}",
            bug.id,
            bug.cf_community_status.as_deref().unwrap_or("<unset>"),
            community_bug.status,
            community_bug.id
        );

        self.dev.update_bug(bug.id, &update).await.map_err(|source| {
            logged(SyncError::StatusUpdate {
                bug: bug.id,
                status: community_bug.status.clone(),
                source,
            })
        })?;

        Ok(ItemOutcome::Updated {
            bug: bug.id,
            from: bug.cf_community_status.clone(),
            to: community_bug.status,
        })
    }
}
