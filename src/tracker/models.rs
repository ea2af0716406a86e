//! Records exchanged with RT and the Bugzilla trackers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const CF_WORKFLOW: &str = "CF.{Workflow}";
pub const CF_DEVELOPMENT_TYPE: &str = "CF.{Development Type}";
pub const CF_WORK_TO_BE_DONE: &str = "CF.{Work to be done}";
pub const CF_DEV_TRACKER: &str = "CF.{Dev Tracker}";

/// Field name RT expects when the dev tracker reference is written back.
pub const CF_DEV_TRACKER_UPDATE: &str = "CF-Dev Tracker";

/// Field updates sent to RT, keyed by RT field name.
pub type TicketFields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TicketId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TicketId)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BugId(pub u64);

impl fmt::Display for BugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BugId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BugId)
    }
}

/// Identifies a record in one of the three trackers, for logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Ticket(TicketId),
    DevBug(BugId),
    CommunityBug(BugId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Ticket(id) => write!(f, "RT#{}", id),
            RecordRef::DevBug(id) => write!(f, "dev bug {}", id),
            RecordRef::CommunityBug(id) => write!(f, "community bug {}", id),
        }
    }
}

/// One line of an RT search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSummary {
    pub id: TicketId,
    pub subject: String,
}

/// An RT ticket with the custom fields the reconciliation reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtTicket {
    pub id: TicketId,
    pub subject: String,
    pub queue: String,
    pub workflow: Option<String>,
    pub development_type: Option<String>,
    pub work_to_be_done: Option<String>,
    pub dev_tracker: Option<String>,
}

impl RtTicket {
    /// Build a ticket from the `Key: value` fields RT returns.
    pub fn from_fields(id: TicketId, fields: &BTreeMap<String, String>) -> Self {
        let text = |key: &str| fields.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            id,
            subject: text("Subject").unwrap_or_default(),
            queue: text("Queue").unwrap_or_default(),
            workflow: text(CF_WORKFLOW),
            development_type: text(CF_DEVELOPMENT_TYPE),
            work_to_be_done: text(CF_WORK_TO_BE_DONE),
            dev_tracker: text(CF_DEV_TRACKER),
        }
    }

    /// The two conditions re-checked against live ticket state before promotion.
    pub fn needs_dev_tracker(&self) -> bool {
        self.work_to_be_done.is_some() && self.dev_tracker.is_none()
    }
}

/// A community cross-reference that is neither empty, the sentinel, nor a bug id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid community bug reference '{0}'")]
pub struct InvalidLink(pub String);

/// State of a dev bug's community cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityLink {
    Unlinked,
    /// Intentionally kept away from the community tracker.
    Exempt,
    Linked(BugId),
}

impl CommunityLink {
    pub const EXEMPT_SENTINEL: &'static str = "0";

    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidLink> {
        let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(CommunityLink::Unlinked);
        };
        if raw == Self::EXEMPT_SENTINEL {
            return Ok(CommunityLink::Exempt);
        }
        raw.parse::<BugId>()
            .map(CommunityLink::Linked)
            .map_err(|_| InvalidLink(raw.to_string()))
    }
}

/// A Bugzilla bug, either on the dev tracker or the community tracker.
///
/// The `cf_*` fields only exist on the dev tracker; Bugzilla reports custom
/// free-text fields as strings, but numbers and nulls are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Bug {
    pub id: BugId,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cf_rt_ticket: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cf_community_bug: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cf_community_status: Option<String>,
}

impl Bug {
    pub fn community_link(&self) -> Result<CommunityLink, InvalidLink> {
        CommunityLink::parse(self.cf_community_bug.as_deref())
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A bug comment; the first one holds the bug description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// Payload for creating a bug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewBug {
    pub product: String,
    pub component: String,
    pub version: String,
    pub assigned_to: String,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_sys: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep_platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_rt_ticket: Option<String>,
}

/// Partial update of a dev tracker bug. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BugUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_community_bug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_community_status: Option<String>,
}

/// Bugzilla search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugQuery {
    pub status: String,
}

impl BugQuery {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![("status", self.status.clone())]
    }
}
