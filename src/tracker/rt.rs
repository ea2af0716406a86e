//! Best Practical RT client over the REST 1.0 interface.
//!
//! REST 1.0 answers in plain text: a status line such as `RT/4.4.3 200 Ok`,
//! a blank line, then either `id: subject` lines (search) or `Key: value`
//! lines with indented continuation lines (ticket show).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use super::models::{RtTicket, TicketFields, TicketId, TicketSummary};
use super::{RequestTracker, transport_error};
use crate::config::Endpoint;
use crate::errors::TrackerError;

const TRACKER: &str = "RT";

pub struct RtClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl RtClient {
    pub fn new(endpoint: &Endpoint, timeout: Duration) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tracker-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| transport_error(TRACKER, timeout, source))?;
        Ok(Self {
            http,
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            username: endpoint.username.clone(),
            password: endpoint.password.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/REST/1.0/{}", self.base_url, path)
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(user) = &self.username {
            params.push(("user", user.clone()));
        }
        if let Some(pass) = &self.password {
            params.push(("pass", pass.clone()));
        }
        params
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, TrackerError> {
        let response = request
            .query(&self.credentials())
            .send()
            .await
            .map_err(|source| transport_error(TRACKER, self.timeout, source))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| transport_error(TRACKER, self.timeout, source))?;
        if !status.is_success() {
            return Err(TrackerError::Status {
                tracker: TRACKER.to_string(),
                status: status.as_u16(),
                message: body.lines().next().unwrap_or_default().to_string(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl RequestTracker for RtClient {
    async fn search_tickets(&self, query: &str) -> Result<Vec<TicketSummary>, TrackerError> {
        let request = self.http.get(self.url("search/ticket")).query(&[
            ("query", query),
            ("orderby", "+id"),
            ("format", "s"),
        ]);
        let body = self.send(request).await?;
        parse_search(payload(&body)?)
    }

    async fn ticket(&self, id: TicketId) -> Result<RtTicket, TrackerError> {
        let request = self.http.get(self.url(&format!("ticket/{}/show", id)));
        let body = self.send(request).await?;
        let payload = payload(&body)?;
        if is_missing(payload) {
            return Err(TrackerError::NotFound(format!("RT ticket {}", id)));
        }
        Ok(RtTicket::from_fields(id, &parse_fields(payload)))
    }

    async fn update_ticket(&self, id: TicketId, fields: &TicketFields) -> Result<(), TrackerError> {
        let request = self
            .http
            .post(self.url(&format!("ticket/{}/edit", id)))
            .form(&[("content", encode_content(fields))]);
        let body = self.send(request).await?;
        edit_outcome(id, payload(&body)?)
    }
}

/// Check the `RT/x.y.z <code> <reason>` status line and return what follows it.
pub fn payload(body: &str) -> Result<&str, TrackerError> {
    let body = body.trim_start();
    let (status_line, rest) = body.split_once('\n').unwrap_or((body, ""));
    let mut parts = status_line.trim().splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("RT/") {
        return Err(TrackerError::Decode {
            tracker: TRACKER.to_string(),
            message: format!("unexpected status line '{}'", status_line.trim()),
        });
    }
    let code: u16 = parts.next().and_then(|c| c.parse().ok()).ok_or_else(|| {
        TrackerError::Decode {
            tracker: TRACKER.to_string(),
            message: format!("missing status code in '{}'", status_line.trim()),
        }
    })?;
    let reason = parts.next().unwrap_or_default().trim();
    if code != 200 {
        return Err(TrackerError::Status {
            tracker: TRACKER.to_string(),
            status: code,
            message: reason.to_string(),
        });
    }
    Ok(rest)
}

fn is_missing(payload: &str) -> bool {
    payload
        .lines()
        .any(|line| line.starts_with('#') && line.contains("does not exist"))
}

/// RT answers every edit with `200 Ok`; only a `# Ticket <id> updated.` line
/// confirms the change. Any other `#` line is the rejection reason.
pub fn edit_outcome(id: TicketId, payload: &str) -> Result<(), TrackerError> {
    let confirmation = format!("Ticket {} updated.", id);
    let mut messages = payload
        .lines()
        .filter_map(|line| line.trim().strip_prefix('#'))
        .map(str::trim);
    if messages.clone().any(|message| message == confirmation) {
        return Ok(());
    }
    if is_missing(payload) {
        return Err(TrackerError::NotFound(format!("RT ticket {}", id)));
    }
    Err(TrackerError::Api {
        tracker: TRACKER.to_string(),
        message: messages
            .find(|message| !message.is_empty())
            .unwrap_or("edit was not confirmed")
            .to_string(),
        code: None,
    })
}

/// Parse `format=s` search output: one `id: subject` line per ticket.
pub fn parse_search(payload: &str) -> Result<Vec<TicketSummary>, TrackerError> {
    let mut tickets = Vec::new();
    for line in payload.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line == "No matching results." {
            continue;
        }
        let (id, subject) = line.split_once(':').ok_or_else(|| TrackerError::Decode {
            tracker: TRACKER.to_string(),
            message: format!("unexpected search line '{}'", line),
        })?;
        let id = id.trim().parse().map_err(|_| TrackerError::Decode {
            tracker: TRACKER.to_string(),
            message: format!("invalid ticket id in '{}'", line),
        })?;
        tickets.push(TicketSummary {
            id,
            subject: subject.trim().to_string(),
        });
    }
    Ok(tickets)
}

/// Parse `Key: value` ticket output. Indented lines continue the previous value.
pub fn parse_fields(payload: &str) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in payload.lines() {
        if line.trim().is_empty() || line.starts_with('#') {
            current = None;
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            if let Some(key) = &current
                && let Some(value) = fields.get_mut(key)
            {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            fields.insert(key.clone(), value.trim().to_string());
            current = Some(key);
        }
    }

    fields
}

/// Encode field updates as the `content` body of a REST 1.0 edit.
pub fn encode_content(fields: &TicketFields) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}
