//! Bugzilla REST client, used for both the dev tracker and the community tracker.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::models::{Bug, BugId, BugQuery, BugUpdate, Comment, NewBug};
use super::{BugTracker, transport_error};
use crate::config::Endpoint;
use crate::errors::TrackerError;

#[derive(Debug, Deserialize)]
struct BugsEnvelope {
    #[serde(default)]
    bugs: Vec<Bug>,
}

#[derive(Debug, Deserialize)]
struct CreatedEnvelope {
    id: BugId,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
    bugs: HashMap<String, BugComments>,
}

#[derive(Debug, Deserialize)]
struct BugComments {
    #[serde(default)]
    comments: Vec<Comment>,
}

/// Error body Bugzilla returns alongside (or instead of) an HTTP error status.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

pub struct BugzillaClient {
    name: String,
    http: reqwest::Client,
    base_url: String,
    login: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl BugzillaClient {
    /// `name` labels the instance in logs and errors ("dev tracker", "community tracker").
    pub fn new(name: &str, endpoint: &Endpoint, timeout: Duration) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tracker-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| transport_error(name, timeout, source))?;
        Ok(Self {
            name: name.to_string(),
            http,
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            login: endpoint.username.clone(),
            password: endpoint.password.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(login) = &self.login {
            params.push(("login", login.clone()));
        }
        if let Some(password) = &self.password {
            params.push(("password", password.clone()));
        }
        params
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, TrackerError> {
        let response = request
            .header("Accept", "application/json")
            .query(&self.credentials())
            .send()
            .await
            .map_err(|source| transport_error(&self.name, self.timeout, source))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| transport_error(&self.name, self.timeout, source))?;
        decode_body(&self.name, status, &body)
    }
}

/// Decode a Bugzilla response body, surfacing `{"error": true}` bodies first.
fn decode_body<T: DeserializeOwned>(tracker: &str, status: u16, body: &str) -> Result<T, TrackerError> {
    if let Ok(api) = serde_json::from_str::<ApiError>(body)
        && api.error
    {
        return Err(TrackerError::Api {
            tracker: tracker.to_string(),
            message: api.message.unwrap_or_else(|| "unknown error".to_string()),
            code: api.code,
        });
    }
    if !(200..300).contains(&status) {
        return Err(TrackerError::Status {
            tracker: tracker.to_string(),
            status,
            message: body.chars().take(200).collect(),
        });
    }
    serde_json::from_str(body).map_err(|e| TrackerError::Decode {
        tracker: tracker.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl BugTracker for BugzillaClient {
    async fn search_bugs(&self, query: &BugQuery) -> Result<Vec<Bug>, TrackerError> {
        let request = self.http.get(self.url("bug")).query(&query.to_params());
        let envelope: BugsEnvelope = self.send(request).await?;
        Ok(envelope.bugs)
    }

    async fn bug(&self, id: BugId) -> Result<Bug, TrackerError> {
        let request = self.http.get(self.url(&format!("bug/{}", id)));
        let envelope: BugsEnvelope = self.send(request).await?;
        envelope
            .bugs
            .into_iter()
            .find(|bug| bug.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("{} bug {}", self.name, id)))
    }

    async fn create_bug(&self, bug: &NewBug) -> Result<BugId, TrackerError> {
        let request = self.http.post(self.url("bug")).json(bug);
        let created: CreatedEnvelope = self.send(request).await?;
        Ok(created.id)
    }

    async fn update_bug(&self, id: BugId, update: &BugUpdate) -> Result<(), TrackerError> {
        let request = self.http.put(self.url(&format!("bug/{}", id))).json(update);
        let _: serde_json::Value = self.send(request).await?;
        Ok(())
    }

    async fn comments(&self, id: BugId) -> Result<Vec<Comment>, TrackerError> {
        let request = self.http.get(self.url(&format!("bug/{}/comment", id)));
        let mut envelope: CommentsEnvelope = self.send(request).await?;
        Ok(envelope
            .bugs
            .remove(&id.to_string())
            .map(|bug| bug.comments)
            .unwrap_or_default())
    }
}
