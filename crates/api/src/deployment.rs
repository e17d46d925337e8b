//! Deployment operations, including static endpoints.

use crate::error::{ApiError, ApiResult};
use crate::project::{apply_filters, remote_error};
use crate::shape;
use crate::Platform;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use strata_client::ClientError;
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::FieldFilter;
use tracing::{info, warn};

static ENDPOINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9-]+$").expect("endpoint pattern is valid")
});

#[derive(Debug, Clone, Default)]
pub struct DeploymentStartOpts {
    /// Deployment name; autogenerated by the platform when omitted.
    pub name: Option<String>,
    /// Static endpoint (subdomain). A generated one is used when omitted.
    pub endpoint: Option<String>,
    /// Command from the revision's manifest; its first command by default.
    pub command: Option<String>,
    /// Defaults to the project's resource profile.
    pub resource_profile: Option<String>,
    pub public: bool,
    /// Initial read-only collaborator list, applied right after creation.
    pub collaborators: Vec<Value>,
    pub wait: bool,
    /// Tear the deployment down again if it fails to reach `started`.
    pub stop_on_error: bool,
    /// Restart path: the endpoint was live moments ago, skip the probe.
    pub skip_endpoint_test: bool,
}

/// Which stream of a deployment's log bundle to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    App,
    Events,
    Proxy,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::App => "app",
            LogKind::Events => "events",
            LogKind::Proxy => "proxy",
        }
    }
}

impl Platform {
    pub async fn deployment_list(
        &self,
        filters: &[FieldFilter],
        collaborators: bool,
    ) -> ApiResult<RecordList> {
        let items = self.fetch_items("deployments").await?;
        let mut records = shape::shape_deployments(items)?;
        if collaborators {
            for rec in &mut records {
                self.join_collaborators("deployments", rec).await?;
            }
        }
        let table = RecordList::from_records(ResourceKind::Deployment, records);
        Ok(apply_filters(table, filters))
    }

    pub async fn deployment_info(
        &self,
        ident: &str,
        filters: &[FieldFilter],
        collaborators: bool,
    ) -> ApiResult<Record> {
        let mut rec = self.resolve(ResourceKind::Deployment, ident, filters).await?;
        if collaborators {
            self.join_collaborators("deployments", &mut rec).await?;
        }
        Ok(rec)
    }

    /// Deploy one revision of a project. The identifier addresses the
    /// project (`:qualifier` picks the revision, defaulting to latest).
    pub async fn deployment_start(
        &self,
        ident: &str,
        opts: DeploymentStartOpts,
    ) -> ApiResult<Record> {
        let pattern = strata_ident::Identifier::parse(ident, ResourceKind::Project)?;
        let (prec, rrec, raw_rev) = self.resolve_revision(&pattern).await?;
        let command = match opts.command {
            Some(cmd) => cmd,
            None => first_command(&raw_rev).ok_or_else(|| {
                ApiError::invalid(format!(
                    "project {} has no configured commands; supply one",
                    prec.name()
                ))
            })?,
        };
        let resource_profile =
            opts.resource_profile.unwrap_or_else(|| prec.render("resource_profile"));
        let mut body = json!({
            "source": rrec.render("url"),
            "revision": rrec.name(),
            "resource_profile": resource_profile,
            "command": command,
            "public": opts.public,
            "target": "deploy",
        });
        if let Some(name) = &opts.name {
            body["name"] = json!(name);
        }
        if let Some(endpoint) = &opts.endpoint {
            if !ENDPOINT_RE.is_match(endpoint) {
                return Err(ApiError::invalid(format!("invalid endpoint: {endpoint}")));
            }
            if !opts.skip_endpoint_test {
                self.ensure_endpoint_free(endpoint).await?;
            }
            body["static_endpoint"] = json!(endpoint.to_ascii_lowercase());
        }
        let response = self
            .session()
            .post(&format!("projects/{}/deployments", prec.id()), Some(&body))
            .await?;
        if let Some(message) = remote_error(&response) {
            return Err(ApiError::ActionFailed { what: "deployment start".into(), message });
        }
        let id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::shape("deployment start returned no id"))?
            .to_string();
        if !opts.collaborators.is_empty() {
            self.deployment_collaborator_set_by_id(&id, opts.collaborators).await?;
        }
        let mut latest = response;
        if opts.wait || opts.stop_on_error {
            latest = self.wait_deployment_started(&id, opts.stop_on_error).await?;
        }
        info!(id, "deployment started");
        let shaped = shape::shape_deployments(vec![latest])?;
        shaped
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::shape("deployment start returned no record"))
    }

    /// The deployment state machine passes through `initial`/`starting`
    /// before settling. Anything other than `started` at the end is a
    /// failure, surfaced with the platform's own status text.
    async fn wait_deployment_started(&self, id: &str, stop_on_error: bool) -> ApiResult<Value> {
        let deadline = Instant::now() + Duration::from_secs(super::wait_secs());
        loop {
            let current = self.session().get(&format!("deployments/{id}")).await?;
            let state = current.get("state").and_then(Value::as_str).unwrap_or("");
            if state != "initial" && state != "starting" {
                if state != "started" {
                    let message = current
                        .get("status_text")
                        .and_then(Value::as_str)
                        .unwrap_or(state)
                        .to_string();
                    if stop_on_error {
                        warn!(id, state, "deployment failed; stopping it");
                        let _ = self.session().delete(&format!("deployments/{id}")).await;
                    }
                    return Err(ApiError::ActionFailed {
                        what: "deployment start".into(),
                        message,
                    });
                }
                return Ok(current);
            }
            if Instant::now() >= deadline {
                return Err(ApiError::WaitTimeout {
                    seconds: super::wait_secs(),
                    what: format!("deployment {id} to start"),
                });
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    /// Probe the endpoint's subdomain; a served response means something
    /// already answers there.
    async fn ensure_endpoint_free(&self, endpoint: &str) -> ApiResult<()> {
        match self.session().call("head", "/_errors/404.html", Some(endpoint)).await {
            Ok(_) => Err(ApiError::invalid(format!("endpoint {endpoint:?} is already in use"))),
            Err(ClientError::Unexpected { .. }) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    /// Stop and redeploy with the previous endpoint, command, profile,
    /// visibility, and collaborator list.
    pub async fn deployment_restart(
        &self,
        ident: &str,
        wait: bool,
        stop_on_error: bool,
    ) -> ApiResult<Record> {
        let drec = self.resolve(ResourceKind::Deployment, ident, &[]).await?;
        let collabs: Vec<Value> = self
            .collaborator_list_by_id("deployments", drec.id())
            .await?
            .iter()
            .map(|c| {
                json!({
                    "id": c.id(),
                    "type": c.render("type"),
                    "permission": c.render("permission"),
                })
            })
            .collect();
        // A generated endpoint is the tail of the deployment id; only a
        // claimed static endpoint is worth carrying over.
        let endpoint = match drec.get_str("endpoint") {
            Some(ep) if !ep.is_empty() && !drec.id().ends_with(ep) => Some(ep.to_string()),
            _ => None,
        };
        let project_id = drec.render("project_id");
        self.session().delete(&format!("deployments/{}", drec.id())).await?;
        self.deployment_start(
            &project_id,
            DeploymentStartOpts {
                name: None,
                endpoint,
                command: Some(drec.render("command")),
                resource_profile: Some(drec.render("resource_profile")),
                public: drec.get("public").and_then(Value::as_bool).unwrap_or(false),
                collaborators: collabs,
                wait,
                stop_on_error,
                skip_endpoint_test: true,
            },
        )
        .await
    }

    pub async fn deployment_patch(&self, ident: &str, public: Option<bool>) -> ApiResult<Record> {
        let drec = self.resolve(ResourceKind::Deployment, ident, &[]).await?;
        let Some(public) = public else { return Ok(drec) };
        let id = drec.id().to_string();
        self.session().patch(&format!("deployments/{id}"), &json!({"public": public})).await?;
        self.resolve(ResourceKind::Deployment, &id, &[]).await
    }

    pub async fn deployment_stop(&self, ident: &str) -> ApiResult<()> {
        let id = self.resolve(ResourceKind::Deployment, ident, &[]).await?.id().to_string();
        self.session().delete(&format!("deployments/{id}")).await?;
        info!(id, "deployment stopped");
        Ok(())
    }

    /// Log bundle of a deployment: the app stream, scheduler events, and
    /// the proxy's log, keyed by stream name.
    pub async fn deployment_logs(
        &self,
        ident: &str,
        which: Option<LogKind>,
    ) -> ApiResult<Value> {
        let id = self.resolve(ResourceKind::Deployment, ident, &[]).await?.id().to_string();
        let logs = self.session().get(&format!("deployments/{id}/logs")).await?;
        match which {
            None => Ok(logs),
            Some(kind) => logs
                .get(kind.as_str())
                .cloned()
                .ok_or_else(|| ApiError::shape(format!("log bundle has no {:?} stream", kind.as_str()))),
        }
    }

    /// Bearer token granting access to a private deployment.
    pub async fn deployment_token(&self, ident: &str) -> ApiResult<String> {
        let id = self.resolve(ResourceKind::Deployment, ident, &[]).await?.id().to_string();
        let response = self.session().post(&format!("deployments/{id}/token"), None).await?;
        match response.get("token").and_then(Value::as_str) {
            Some(token) => Ok(token.to_string()),
            None => match response {
                Value::String(token) => Ok(token),
                other => Err(ApiError::shape(format!("token response was {other}"))),
            },
        }
    }

    // ---- static endpoints ----

    pub async fn endpoint_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let raw = self.session().get("/platform/deploy/api/v1/apps/static-endpoints").await?;
        let items = shape::unwrap_records(raw);
        let deployments = self.deployment_list(&[], false).await?;
        let projects = self.project_list(&[], false).await?;
        let records = shape::shape_endpoints(items, &deployments, &projects)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::Endpoint, records), filters))
    }

    pub async fn endpoint_info(&self, ident: &str) -> ApiResult<Record> {
        self.resolve(ResourceKind::Endpoint, ident, &[]).await
    }
}

/// First command id of a raw revision payload.
fn first_command(raw_revision: &Value) -> Option<String> {
    raw_revision
        .get("commands")?
        .as_array()?
        .first()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Browser URL for a deployment: the platform detail view when framed,
/// the deployment's own URL otherwise.
pub fn deployment_open_url(rec: &Record, frame: bool) -> Option<String> {
    if frame {
        let project_url = rec.get_str("project_url")?;
        let (scheme, rest) = project_url.split_once("//")?;
        let host = rest.split('/').next()?;
        Some(format!("{scheme}//{host}/deployments/detail/{}/view", rec.id()))
    } else {
        rec.get_str("url").map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_command_reads_the_manifest_order() {
        let raw = json!({"commands": [{"id": "serve"}, {"id": "worker"}]});
        assert_eq!(first_command(&raw).unwrap(), "serve");
        assert!(first_command(&json!({"commands": []})).is_none());
    }

    #[test]
    fn endpoint_names_are_validated() {
        assert!(ENDPOINT_RE.is_match("my-app-1"));
        assert!(!ENDPOINT_RE.is_match("my app"));
        assert!(!ENDPOINT_RE.is_match("app.dot"));
        assert!(!ENDPOINT_RE.is_match(""));
    }

    #[test]
    fn open_urls_for_deployments() {
        let hex = "00000000000000000000000000000002";
        let rec = Record::from_value(
            ResourceKind::Deployment,
            json!({
                "id": format!("a2-{hex}"),
                "url": "https://app1.strata.example.com/",
                "project_url": "https://strata.example.com/api/v2/projects/abc",
            }),
        )
        .unwrap();
        assert_eq!(
            deployment_open_url(&rec, true).unwrap(),
            format!("https://strata.example.com/deployments/detail/a2-{hex}/view")
        );
        assert_eq!(deployment_open_url(&rec, false).unwrap(), "https://app1.strata.example.com/");
    }
}
