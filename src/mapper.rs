//! Field mapping between trackers.
//!
//! Everything here is pure: given source records, build the payloads the
//! reconciliation passes send to the target tracker.

use crate::reconcile::SkipReason;
use crate::tracker::{
    Bug, BugId, BugUpdate, Comment, CommunityLink, NewBug, RtTicket, TicketFields,
    models::CF_DEV_TRACKER_UPDATE,
};

pub const IN_DEVELOPMENT: &str = "In Development";
pub const SUBMITTED_TO_COMMUNITY: &str = "Submitted to Community";

pub const DEFAULT_ASSIGNEE: &str = "jesse@bywatersolutions.com";

/// TicketSQL selecting RT tickets that still need a dev tracker bug.
pub const RT_CANDIDATE_QUERY: &str = "Queue = 'Development' AND CF.{Workflow} LIKE 'In Development' AND 'CF.{Work to be done}' IS NOT NULL AND 'CF.{Dev Tracker}' IS NULL";

/// Only dev bugs for this product and component go upstream.
pub const PROMOTABLE_PRODUCT: &str = "Koha";
pub const PROMOTABLE_COMPONENT: &str = "General";

pub const COMMUNITY_PRODUCT: &str = "Koha";
pub const COMMUNITY_COMPONENT: &str = "Architecture, internals, and plumbing";
pub const COMMUNITY_VERSION: &str = "master";

const DEFAULT_PRODUCT: &str = "Koha";
const DEFAULT_COMPONENT: &str = "General";
const DEFAULT_VERSION: &str = "unspecified";

/// Product, component and version for a new dev tracker bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub product: String,
    pub component: String,
    pub version: String,
}

struct ClassificationRule {
    development_type: &'static str,
    product: &'static str,
    component: &'static str,
    version: &'static str,
}

const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        development_type: "Koha",
        product: "Koha",
        component: "General",
        version: "unspecified",
    },
    ClassificationRule {
        development_type: "Libki",
        product: "Libki",
        component: "General",
        version: "Libki 2",
    },
    // Mis-capitalized in RT
    ClassificationRule {
        development_type: "LibKi",
        product: "Libki",
        component: "General",
        version: "Libki 2",
    },
];

/// Map an RT development type to its dev tracker classification.
///
/// Types without a rule are Koha work filed under a component of the same
/// name (e.g. "Koha Reports").
pub fn classify(development_type: Option<&str>) -> Classification {
    let development_type = development_type.map(str::trim).filter(|t| !t.is_empty());
    let Some(development_type) = development_type else {
        return Classification {
            product: DEFAULT_PRODUCT.to_string(),
            component: DEFAULT_COMPONENT.to_string(),
            version: DEFAULT_VERSION.to_string(),
        };
    };

    match CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.development_type == development_type)
    {
        Some(rule) => Classification {
            product: rule.product.to_string(),
            component: rule.component.to_string(),
            version: rule.version.to_string(),
        },
        None => Classification {
            product: DEFAULT_PRODUCT.to_string(),
            component: development_type.to_string(),
            version: DEFAULT_VERSION.to_string(),
        },
    }
}

/// Creation payload for the dev tracker bug backing an RT ticket.
pub fn dev_bug_for_ticket(ticket: &RtTicket, assignee: &str) -> NewBug {
    let Classification {
        product,
        component,
        version,
    } = classify(ticket.development_type.as_deref());

    NewBug {
        product,
        component,
        version,
        assigned_to: assignee.to_string(),
        summary: ticket.subject.clone(),
        description: ticket.work_to_be_done.clone().unwrap_or_default(),
        op_sys: Some("All".to_string()),
        rep_platform: Some("All".to_string()),
        status: Some(IN_DEVELOPMENT.to_string()),
        cf_rt_ticket: Some(ticket.id.to_string()),
    }
}

/// RT field update pointing a ticket at its dev tracker bug.
pub fn rt_backlink(bug: BugId) -> TicketFields {
    let mut fields = TicketFields::new();
    fields.insert(CF_DEV_TRACKER_UPDATE.to_string(), bug.to_string());
    fields
}

/// Decide whether a dev bug may be promoted to the community tracker.
pub fn community_eligibility(bug: &Bug) -> Result<(), SkipReason> {
    match bug.community_link() {
        Ok(CommunityLink::Unlinked) => {}
        Ok(CommunityLink::Exempt) => return Err(SkipReason::Exempt),
        Ok(CommunityLink::Linked(_)) | Err(_) => return Err(SkipReason::AlreadyLinked),
    }
    if bug.product != PROMOTABLE_PRODUCT {
        return Err(SkipReason::OtherProduct(bug.product.clone()));
    }
    if bug.component != PROMOTABLE_COMPONENT {
        return Err(SkipReason::OtherComponent(bug.component.clone()));
    }
    Ok(())
}

/// Creation payload for the community bug mirroring a dev bug.
pub fn community_bug_for(bug: &Bug, description: &Comment) -> NewBug {
    NewBug {
        product: COMMUNITY_PRODUCT.to_string(),
        component: COMMUNITY_COMPONENT.to_string(),
        version: COMMUNITY_VERSION.to_string(),
        assigned_to: bug.assigned_to.clone(),
        summary: bug.summary.clone(),
        description: description.text.clone(),
        ..Default::default()
    }
}

/// Dev bug update recording its community bug.
pub fn community_backlink(community_bug: BugId) -> BugUpdate {
    BugUpdate {
        cf_community_bug: Some(community_bug.to_string()),
        ..Default::default()
    }
}

/// Update mirroring the community bug onto the dev bug, or `None` when the
/// mirrored status already matches.
pub fn status_sync_update(dev_bug: &Bug, community_bug: &Bug) -> Option<BugUpdate> {
    if dev_bug.cf_community_status.as_deref() == Some(community_bug.status.as_str()) {
        return None;
    }
    Some(BugUpdate {
        summary: Some(community_bug.summary.clone()),
        cf_community_status: Some(community_bug.status.clone()),
        ..Default::default()
    })
}
