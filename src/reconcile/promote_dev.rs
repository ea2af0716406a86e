use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ItemOutcome, ItemResult, Pass, PassReport, Reconciler, SkipReason, TaskGroup, logged};
use crate::errors::SyncError;
use crate::mapper::{self, RT_CANDIDATE_QUERY};
use crate::tracker::{BugTracker, RecordRef, RequestTracker, TicketId};

impl Reconciler {
    /// Create a dev tracker bug for every RT ticket that is in development
    /// and has no dev tracker reference yet.
    pub async fn promote_to_dev(&self) -> Result<PassReport, SyncError> {
        let pass = Pass::PromoteToDev;
        let hits = self
            .rt
            .search_tickets(RT_CANDIDATE_QUERY)
            .await
            .map_err(|source| {
                logged(SyncError::Search {
                    pass,
                    tracker: "RT".to_string(),
                    source,
                })
            })?;

        let mut group = TaskGroup::new(pass, self.settings.max_concurrency, hits.len());
        for hit in hits {
            if group.is_cancelled() {
                group.record(ItemOutcome::Aborted);
                continue;
            }
            info!(ticket = %hit.id, "{} => {}", hit.id, hit.subject);
            let job = PromoteTicket {
                ticket: hit.id,
                rt: self.rt.clone(),
                dev: self.dev.clone(),
                assignee: self.settings.assignee.clone(),
                delay: self.settings.throttle.next_delay(),
                cancel: group.token(),
            };
            group.spawn(job.run()).await?;
        }
        group.join().await
    }
}

struct PromoteTicket {
    ticket: TicketId,
    rt: Arc<dyn RequestTracker>,
    dev: Arc<dyn BugTracker>,
    assignee: String,
    delay: Duration,
    cancel: CancellationToken,
}

impl PromoteTicket {
    async fn run(self) -> ItemResult {
        let origin = RecordRef::Ticket(self.ticket);

        // Spread ticket fetches out so RT is not hit in a burst
        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(ItemOutcome::Aborted),
            _ = tokio::time::sleep(self.delay) => {}
        }

        let ticket = self
            .rt
            .ticket(self.ticket)
            .await
            .map_err(|source| logged(SyncError::Lookup { record: origin, source }))?;

        // The search index can lag behind live ticket state
        if !ticket.needs_dev_tracker() {
            debug!(ticket = %ticket.id, "ticket no longer needs a dev tracker bug");
            return Ok(ItemOutcome::Skipped(SkipReason::NoLongerEligible));
        }

        if self.cancel.is_cancelled() {
            return Ok(ItemOutcome::Aborted);
        }

        let payload = mapper::dev_bug_for_ticket(&ticket, &self.assignee);
        let bug_id = self
            .dev
            .create_bug(&payload)
            .await
            .map_err(|source| logged(SyncError::Creation { origin, source }))?;
        let created = RecordRef::DevBug(bug_id);
        info!(
            ticket = %ticket.id,
            bug = %bug_id,
            product = %payload.product,
            component = %payload.component,
            "created dev tracker bug"
        );

        self.rt
            .update_ticket(ticket.id, &mapper::rt_backlink(bug_id))
            .await
            .map_err(|source| {
                logged(SyncError::BacklinkWrite {
                    origin,
                    created,
                    source,
                })
            })?;
        info!(ticket = %ticket.id, bug = %bug_id, "RT ticket updated with dev tracker bug");

        Ok(ItemOutcome::Created { origin, created })
    }
}
