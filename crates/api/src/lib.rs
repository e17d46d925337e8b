//! Strata typed façade.
//!
//! [`Platform`] wraps an authenticated [`Session`] and exposes one method
//! per operation the control plane supports, grouped by resource kind.
//! Every operation that acts on a single resource resolves its identifier
//! against a fresh listing first (match exactly one, or fail loudly), then
//! acts on the resolved id only; raw patterns never reach the wire.

#![forbid(unsafe_code)]

mod catalog;
mod collab;
mod deployment;
mod error;
mod job;
mod project;
mod session;
mod shape;
mod user;

pub use catalog::SampleCloneOpts;
pub use deployment::{deployment_open_url, DeploymentStartOpts, LogKind};
pub use error::{ApiError, ApiResult};
pub use job::{JobCreateOpts, JobPatchOpts};
pub use project::{ActivityOpts, ProjectCreateOpts, ProjectPatchOpts};
pub use session::{session_open_url, SessionStartOpts};

pub use strata_client::{ClientError, Realm, Session, SessionConfig};
pub use strata_core::{Record, RecordList, ResourceKind};
pub use strata_ident::{FieldFilter, Identifier, MatchOutcome, ResolveError};

use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Seconds a wait/poll loop may run before surfacing a timeout.
fn wait_secs() -> u64 {
    std::env::var("STRATA_WAIT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(600)
}

/// User-realm façade over the control plane.
pub struct Platform {
    session: Session,
}

impl Platform {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn hostname(&self) -> &str {
        self.session.hostname()
    }

    pub fn username(&self) -> &str {
        self.session.username()
    }

    /// Force authentication now instead of on the first operation.
    pub async fn login(&self) -> ApiResult<()> {
        self.session.authorize().await?;
        Ok(())
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.session.disconnect().await?;
        Ok(())
    }

    /// Generic API passthrough for experimentation and private deployment
    /// endpoints (which share the platform's authentication).
    pub async fn call(
        &self,
        method: &str,
        path: &str,
        subdomain: Option<&str>,
    ) -> ApiResult<Value> {
        Ok(self.session.call(method, path, subdomain).await?)
    }

    /// Fetch and unwrap a listing endpoint without shaping.
    pub(crate) async fn fetch_items(&self, path: &str) -> ApiResult<Vec<Value>> {
        Ok(shape::unwrap_records(self.session.get(path).await?))
    }

    /// Live listing for an identifier-addressable kind. Always a fresh
    /// fetch; resolution trades latency for consistency with remote state.
    pub async fn list(&self, kind: ResourceKind) -> ApiResult<RecordList> {
        match kind {
            ResourceKind::Project => self.project_list(&[], false).await,
            ResourceKind::Session => self.session_list(&[]).await,
            ResourceKind::Deployment => self.deployment_list(&[], false).await,
            ResourceKind::Job => self.job_list(&[]).await,
            ResourceKind::Run => self.run_list(&[]).await,
            ResourceKind::Endpoint => self.endpoint_list(&[]).await,
            ResourceKind::ResourceProfile => self.resource_profile_list(&[]).await,
            ResourceKind::Editor => self.editor_list(&[]).await,
            ResourceKind::Sample => self.sample_list(&[]).await,
            other => Err(ApiError::invalid(format!(
                "{} records are not directly listable",
                other.label()
            ))),
        }
    }

    /// Parse + list + resolve-unique. The workhorse behind every `info`
    /// and mutating operation.
    pub async fn resolve(
        &self,
        kind: ResourceKind,
        raw: &str,
        filters: &[FieldFilter],
    ) -> ApiResult<Record> {
        let ident = Identifier::parse(raw, kind)?;
        self.resolve_pattern(&ident, filters).await
    }

    pub(crate) async fn resolve_pattern(
        &self,
        ident: &Identifier,
        filters: &[FieldFilter],
    ) -> ApiResult<Record> {
        let started = Instant::now();
        metrics::counter!("api_resolutions_total", 1u64, "kind" => ident.kind().to_string());
        let table = self.list(ident.kind()).await?;
        let rec = strata_ident::resolve_unique(ident, &table, filters)?;
        debug!(
            kind = %ident.kind(),
            ident = %ident,
            glob = ident.has_glob(),
            id = rec.id(),
            took_ms = %started.elapsed().as_millis(),
            "identifier resolved"
        );
        Ok(rec)
    }

    /// Poll a project action (create/start) until it finishes, reading its
    /// progress off the project's activity feed.
    pub(crate) async fn wait_action(&self, response: &mut Value, what: &str) -> ApiResult<()> {
        let project_id = response
            .get("project_id")
            .or_else(|| response.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::shape(format!("{what}: response carries no project id")))?
            .to_string();
        let action_id = response
            .pointer("/action/id")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::shape(format!("{what}: response carries no action")))?
            .to_string();
        let deadline = Instant::now() + Duration::from_secs(wait_secs());
        let mut page_size = 1usize;
        loop {
            let done = response.pointer("/action/done").and_then(Value::as_bool).unwrap_or(false);
            let errored = response
                .pointer("/action/error")
                .map(|e| !matches!(e, Value::Null | Value::Bool(false)))
                .unwrap_or(false);
            if done || errored {
                break;
            }
            if Instant::now() >= deadline {
                return Err(ApiError::WaitTimeout { seconds: wait_secs(), what: what.to_string() });
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            let query = [
                ("sort", "-updated".to_string()),
                ("page[size]", page_size.to_string()),
            ];
            let activity = self
                .session
                .get_with_query(&format!("projects/{project_id}/activity"), &query)
                .await?;
            let found = shape::unwrap_records(activity)
                .into_iter()
                .find(|s| s.get("id").and_then(Value::as_str) == Some(action_id.as_str()));
            match found {
                Some(status) => {
                    if let Some(slot) = response.get_mut("action") {
                        *slot = status;
                    }
                }
                None => page_size += 1,
            }
        }
        let errored = response
            .pointer("/action/error")
            .map(|e| !matches!(e, Value::Null | Value::Bool(false)))
            .unwrap_or(false);
        if errored {
            let message = response
                .pointer("/action/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ApiError::ActionFailed { what: what.to_string(), message });
        }
        info!(what, "action completed");
        Ok(())
    }
}

/// Admin-realm façade (identity service): user management.
pub struct AdminPlatform {
    session: Session,
}

impl AdminPlatform {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn login(&self) -> ApiResult<()> {
        self.session.authorize().await?;
        Ok(())
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.session.disconnect().await?;
        Ok(())
    }
}
