//! In-memory trackers that record every call, for engine tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::models::CF_DEV_TRACKER_UPDATE;
use super::{
    Bug, BugId, BugQuery, BugTracker, BugUpdate, Comment, NewBug, RequestTracker, RtTicket,
    TicketFields, TicketId, TicketSummary,
};
use crate::errors::TrackerError;

fn unavailable(tracker: &str) -> TrackerError {
    TrackerError::Status {
        tracker: tracker.to_string(),
        status: 503,
        message: "Service Unavailable".to_string(),
    }
}

/// The candidate rule the RT search query expresses.
fn matches_candidate_query(ticket: &RtTicket) -> bool {
    ticket.queue == "Development"
        && ticket.workflow.as_deref() == Some(crate::mapper::IN_DEVELOPMENT)
        && ticket.needs_dev_tracker()
}

#[derive(Default)]
pub(crate) struct MemoryRt {
    tickets: Mutex<BTreeMap<TicketId, RtTicket>>,
    failing_fetches: HashSet<TicketId>,
    stale_hits: Vec<TicketSummary>,
    fail_search: bool,
    fail_updates: bool,
    pub(crate) fetches: Mutex<Vec<TicketId>>,
    pub(crate) updates: Mutex<Vec<(TicketId, TicketFields)>>,
}

impl MemoryRt {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_ticket(self, ticket: RtTicket) -> Self {
        self.tickets.lock().unwrap().insert(ticket.id, ticket);
        self
    }

    /// Add a ticket that the search still returns whatever its live state.
    pub(crate) fn with_stale_hit(mut self, ticket: RtTicket) -> Self {
        self.stale_hits.push(TicketSummary {
            id: ticket.id,
            subject: ticket.subject.clone(),
        });
        self.with_ticket(ticket)
    }

    pub(crate) fn failing_fetch(mut self, id: TicketId) -> Self {
        self.failing_fetches.insert(id);
        self
    }

    pub(crate) fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub(crate) fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub(crate) fn ticket_snapshot(&self, id: TicketId) -> RtTicket {
        self.tickets.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl RequestTracker for MemoryRt {
    async fn search_tickets(&self, _query: &str) -> Result<Vec<TicketSummary>, TrackerError> {
        if self.fail_search {
            return Err(unavailable("RT"));
        }
        let mut hits: Vec<TicketSummary> = self
            .tickets
            .lock()
            .unwrap()
            .values()
            .filter(|t| matches_candidate_query(t))
            .map(|t| TicketSummary {
                id: t.id,
                subject: t.subject.clone(),
            })
            .collect();
        hits.extend(self.stale_hits.iter().cloned());
        Ok(hits)
    }

    async fn ticket(&self, id: TicketId) -> Result<RtTicket, TrackerError> {
        self.fetches.lock().unwrap().push(id);
        if self.failing_fetches.contains(&id) {
            return Err(unavailable("RT"));
        }
        self.tickets
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("RT ticket {}", id)))
    }

    async fn update_ticket(&self, id: TicketId, fields: &TicketFields) -> Result<(), TrackerError> {
        self.updates.lock().unwrap().push((id, fields.clone()));
        if self.fail_updates {
            return Err(unavailable("RT"));
        }
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .get_mut(&id)
            .ok_or_else(|| TrackerError::NotFound(format!("RT ticket {}", id)))?;
        if let Some(value) = fields.get(CF_DEV_TRACKER_UPDATE) {
            ticket.dev_tracker = Some(value.clone());
        }
        Ok(())
    }
}

pub(crate) struct MemoryBugzilla {
    name: &'static str,
    bugs: Mutex<BTreeMap<BugId, Bug>>,
    comments: Mutex<HashMap<BugId, Vec<Comment>>>,
    next_id: Mutex<u64>,
    failing_creates: HashSet<String>,
    failing_gets: HashSet<BugId>,
    fail_search: bool,
    fail_updates: bool,
    pub(crate) searches: Mutex<Vec<BugQuery>>,
    pub(crate) creates: Mutex<Vec<NewBug>>,
    pub(crate) updates: Mutex<Vec<(BugId, BugUpdate)>>,
}

impl MemoryBugzilla {
    pub(crate) fn new(name: &'static str, first_id: u64) -> Self {
        Self {
            name,
            bugs: Mutex::new(BTreeMap::new()),
            comments: Mutex::new(HashMap::new()),
            next_id: Mutex::new(first_id),
            failing_creates: HashSet::new(),
            failing_gets: HashSet::new(),
            fail_search: false,
            fail_updates: false,
            searches: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_bug(self, bug: Bug) -> Self {
        self.bugs.lock().unwrap().insert(bug.id, bug);
        self
    }

    pub(crate) fn with_comment(self, id: BugId, text: &str) -> Self {
        self.comments.lock().unwrap().entry(id).or_default().push(Comment {
            text: text.to_string(),
            creator: "dev@example.org".to_string(),
            time: None,
        });
        self
    }

    /// Reject creation of bugs with this summary.
    pub(crate) fn failing_create(mut self, summary: &str) -> Self {
        self.failing_creates.insert(summary.to_string());
        self
    }

    pub(crate) fn failing_get(mut self, id: BugId) -> Self {
        self.failing_gets.insert(id);
        self
    }

    pub(crate) fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub(crate) fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub(crate) fn bug_snapshot(&self, id: BugId) -> Bug {
        self.bugs.lock().unwrap()[&id].clone()
    }

    pub(crate) fn bug_count(&self) -> usize {
        self.bugs.lock().unwrap().len()
    }

    pub(crate) fn created_summaries(&self) -> Vec<String> {
        self.creates
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.summary.clone())
            .collect()
    }
}

#[async_trait]
impl BugTracker for MemoryBugzilla {
    async fn search_bugs(&self, query: &BugQuery) -> Result<Vec<Bug>, TrackerError> {
        self.searches.lock().unwrap().push(query.clone());
        if self.fail_search {
            return Err(unavailable(self.name));
        }
        Ok(self
            .bugs
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.status == query.status)
            .cloned()
            .collect())
    }

    async fn bug(&self, id: BugId) -> Result<Bug, TrackerError> {
        if self.failing_gets.contains(&id) {
            return Err(unavailable(self.name));
        }
        self.bugs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("{} bug {}", self.name, id)))
    }

    async fn create_bug(&self, new_bug: &NewBug) -> Result<BugId, TrackerError> {
        self.creates.lock().unwrap().push(new_bug.clone());
        if self.failing_creates.contains(&new_bug.summary) {
            return Err(unavailable(self.name));
        }
        let id = {
            let mut next = self.next_id.lock().unwrap();
            let id = BugId(*next);
            *next += 1;
            id
        };
        let bug = Bug {
            id,
            product: new_bug.product.clone(),
            component: new_bug.component.clone(),
            version: new_bug.version.clone(),
            assigned_to: new_bug.assigned_to.clone(),
            summary: new_bug.summary.clone(),
            status: new_bug.status.clone().unwrap_or_else(|| "NEW".to_string()),
            cf_rt_ticket: new_bug.cf_rt_ticket.clone(),
            cf_community_bug: None,
            cf_community_status: None,
        };
        self.bugs.lock().unwrap().insert(id, bug);
        self.comments.lock().unwrap().insert(
            id,
            vec![Comment {
                text: new_bug.description.clone(),
                creator: new_bug.assigned_to.clone(),
                time: None,
            }],
        );
        Ok(id)
    }

    async fn update_bug(&self, id: BugId, update: &BugUpdate) -> Result<(), TrackerError> {
        self.updates.lock().unwrap().push((id, update.clone()));
        if self.fail_updates {
            return Err(unavailable(self.name));
        }
        let mut bugs = self.bugs.lock().unwrap();
        let bug = bugs
            .get_mut(&id)
            .ok_or_else(|| TrackerError::NotFound(format!("{} bug {}", self.name, id)))?;
        if let Some(summary) = &update.summary {
            bug.summary = summary.clone();
        }
        if let Some(link) = &update.cf_community_bug {
            bug.cf_community_bug = Some(link.clone());
        }
        if let Some(status) = &update.cf_community_status {
            bug.cf_community_status = Some(status.clone());
        }
        Ok(())
    }

    async fn comments(&self, id: BugId) -> Result<Vec<Comment>, TrackerError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}
