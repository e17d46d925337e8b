//! Record normalization hooks.
//!
//! The API returns a different envelope and field mix per endpoint; each
//! hook here flattens one kind into its canonical record shape. Hooks are
//! pure functions over raw JSON so they stay testable without a server.
//! Joins that need sibling listings (sessions wanting project names,
//! endpoints wanting deployments) take those listings as arguments; the
//! fetching stays in the operation methods.

use crate::error::{ApiError, ApiResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use strata_core::{Record, RecordList, ResourceKind};

/// Strip the response envelope: `{"data": [...]}`, a bare array, a single
/// object, or an empty body.
pub fn unwrap_records(raw: Value) -> Vec<Value> {
    match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![Value::Object(obj)],
        },
        other => vec![other],
    }
}

/// Shape records with no kind-specific processing.
pub fn shape_generic(kind: ResourceKind, items: Vec<Value>) -> ApiResult<Vec<Record>> {
    items
        .into_iter()
        .map(|v| Record::from_value(kind, v).map_err(|e| ApiError::shape(e.to_string())))
        .collect()
}

/// Derive `a0-<hex>` from a project URL whose last segment is the bare hex.
fn project_id_from_url(url: &str) -> Option<String> {
    let tail = url.rsplit('/').next()?;
    if tail.is_empty() {
        return None;
    }
    Some(format!("a0-{tail}"))
}

/// First DNS label of a URL's host: `https://app1.host.com/x` -> `app1`.
fn subdomain_of(url: &str) -> Option<String> {
    let rest = url.split("//").nth(1)?;
    let host = rest.split('/').next()?;
    let label = host.split('.').next()?;
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

pub fn shape_projects(items: Vec<Value>) -> ApiResult<Vec<Record>> {
    shape_generic(ResourceKind::Project, items)
}

/// Sessions come back named after their internal id stub; the useful name
/// is the owning project's. Rewires `name`/`session_name` and synthesizes
/// `project_id`.
pub fn shape_sessions(items: Vec<Value>, projects: &RecordList) -> ApiResult<Vec<Record>> {
    let by_id: HashMap<&str, &Record> = projects.iter().map(|p| (p.id(), p)).collect();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut rec = Record::from_value(ResourceKind::Session, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        let pid = rec
            .get_str("project_url")
            .and_then(project_id_from_url)
            .unwrap_or_default();
        let session_name = rec.name().to_string();
        let project_name = by_id.get(pid.as_str()).map(|p| p.name().to_string()).unwrap_or_default();
        rec.set("session_name", json!(session_name));
        rec.set("name", json!(project_name));
        rec.set("project_id", json!(pid));
        out.push(rec);
    }
    Ok(out)
}

/// Deployments gain `project_id` and the `endpoint` label carved out of
/// their serving URL.
pub fn shape_deployments(items: Vec<Value>) -> ApiResult<Vec<Record>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut rec = Record::from_value(ResourceKind::Deployment, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        if let Some(pid) = rec.get_str("project_url").and_then(project_id_from_url) {
            rec.set("project_id", json!(pid));
        }
        if let Some(endpoint) = rec.get_str("url").and_then(subdomain_of) {
            rec.set("endpoint", json!(endpoint));
        }
        out.push(rec);
    }
    Ok(out)
}

/// Revisions: mark the first (newest) as `latest`, flatten the command
/// list to a comma string, and synthesize `project_id` from the revision
/// URL (`.../projects/<hex>/revisions/<name>`).
pub fn shape_revisions(items: Vec<Value>) -> ApiResult<Vec<Record>> {
    let mut out = Vec::with_capacity(items.len());
    let mut first = true;
    for item in items {
        let mut rec = Record::from_value(ResourceKind::Revision, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        if let Some(pid) = rec
            .get_str("url")
            .and_then(|url| {
                let parts: Vec<&str> = url.rsplitn(4, '/').collect();
                parts.get(2).map(|hex| format!("a0-{hex}"))
            })
        {
            rec.set("project_id", json!(pid));
        }
        rec.set("latest", json!(first));
        first = false;
        let joined = command_ids(&rec);
        rec.set("commands", json!(joined));
        out.push(rec);
    }
    Ok(out)
}

fn command_ids(rec: &Record) -> String {
    rec.get("commands")
        .and_then(Value::as_array)
        .map(|cmds| {
            cmds.iter()
                .filter_map(|c| c.get("id").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Shape the command objects of one raw revision payload.
pub fn shape_commands(raw_revision: &Value) -> ApiResult<Vec<Record>> {
    let cmds = raw_revision
        .get("commands")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    shape_generic(ResourceKind::Command, cmds)
}

/// Static endpoints are bare `{id}` rows; everything interesting comes
/// from joining deployments (active claim) and projects (owning project).
/// Rows whose project is unknown are dropped, matching the platform UI.
pub fn shape_endpoints(
    items: Vec<Value>,
    deployments: &RecordList,
    projects: &RecordList,
) -> ApiResult<Vec<Record>> {
    let by_endpoint: HashMap<&str, &Record> = deployments
        .iter()
        .filter(|d| !d.render("endpoint").is_empty())
        .map(|d| (d.get_str("endpoint").unwrap_or(""), d))
        .collect();
    let by_project: HashMap<&str, &Record> = projects.iter().map(|p| (p.id(), p)).collect();
    let mut out = Vec::new();
    for item in items {
        let mut rec = Record::from_value(ResourceKind::Endpoint, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        if let Some(drec) = by_endpoint.get(rec.id()) {
            rec.set("name", json!(drec.name()));
            rec.set("deployment_id", json!(drec.id()));
            rec.set("project_url", json!(drec.get_str("project_url").unwrap_or("")));
            rec.set("owner", json!(drec.owner()));
        } else {
            rec.set("name", json!(""));
            rec.set("deployment_id", json!(""));
        }
        let pid = rec.get_str("project_url").and_then(project_id_from_url).unwrap_or_default();
        rec.set("project_id", json!(pid));
        let Some(prec) = by_project.get(pid.as_str()) else { continue };
        rec.set("project_name", json!(prec.name()));
        if rec.owner().is_empty() {
            rec.set("owner", json!(prec.owner()));
        }
        out.push(rec);
    }
    Ok(out)
}

/// Resource profiles encode their size in the description suffix:
/// `Large instance (cpu: 4, memory: 16 GB, gpu: 1)`.
pub fn shape_resource_profiles(items: Vec<Value>) -> ApiResult<Vec<Record>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut rec = Record::from_value(ResourceKind::ResourceProfile, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        let description = rec.render("description");
        if let Some((desc, params)) = description.rsplit_once(" (") {
            rec.set("description", json!(desc));
            for param in params.trim_end_matches(')').split(", ") {
                if let Some((k, v)) = param.split_once(": ") {
                    rec.set(&k.to_ascii_lowercase(), json!(v));
                }
            }
        }
        if rec.get("gpu").is_none() {
            rec.set("gpu", json!(0));
        }
        out.push(rec);
    }
    Ok(out)
}

pub fn shape_editors(items: Vec<Value>) -> ApiResult<Vec<Record>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut rec = Record::from_value(ResourceKind::Editor, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        if let Some(packages) = rec.get("packages").and_then(Value::as_array) {
            let joined = packages
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            rec.set("packages", json!(joined));
        }
        out.push(rec);
    }
    Ok(out)
}

/// Template listings carry `is_default`; sample listings do not. Presence
/// of the key is what distinguishes a template from a plain sample.
pub fn shape_samples(items: Vec<Value>) -> ApiResult<Vec<Record>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut rec = Record::from_value(ResourceKind::Sample, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        let is_template = rec.get("is_default").is_some();
        rec.set("is_template", json!(is_template));
        if rec.get("is_default").is_none() {
            rec.set("is_default", json!(false));
        }
        out.push(rec);
    }
    Ok(out)
}

/// Users gain `lastLogin` from the identity service's login events
/// (millisecond timestamps), defaulting to the epoch when never seen.
pub fn shape_users(items: Vec<Value>, last_logins: &HashMap<String, i64>) -> ApiResult<Vec<Record>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let mut rec = Record::from_value(ResourceKind::User, item)
            .map_err(|e| ApiError::shape(e.to_string()))?;
        if rec.get("lastLogin").is_none() {
            let ts = last_logins.get(rec.id()).copied().unwrap_or(0);
            rec.set("lastLogin", json!(ts));
        }
        out.push(rec);
    }
    Ok(out)
}

/// `sessions/{id}/changes/{which}` returns `{files: [...], branches: {...}}`.
pub fn shape_changes(raw: &Value) -> ApiResult<Vec<Record>> {
    let files = raw.get("files").and_then(Value::as_array).cloned().unwrap_or_default();
    shape_generic(ResourceKind::Change, files)
}

pub fn shape_branches(raw: &Value) -> ApiResult<Vec<Record>> {
    let branches = raw
        .get("branches")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let items = branches
        .into_iter()
        .map(|(branch, sha1)| json!({"branch": branch, "sha1": sha1}))
        .collect();
    shape_generic(ResourceKind::Branch, items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "00000000000000000000000000000001";

    #[test]
    fn unwraps_all_envelope_shapes() {
        assert_eq!(unwrap_records(json!({"data": [1, 2]})).len(), 2);
        assert_eq!(unwrap_records(json!([1, 2, 3])).len(), 3);
        assert_eq!(unwrap_records(json!({"id": "x"})).len(), 1);
        assert!(unwrap_records(Value::Null).is_empty());
    }

    #[test]
    fn sessions_take_their_project_name() {
        let projects = RecordList::from_records(
            ResourceKind::Project,
            shape_projects(vec![json!({
                "id": format!("a0-{HEX}"), "name": "myproj", "owner": "alice"
            })])
            .unwrap(),
        );
        let shaped = shape_sessions(
            vec![json!({
                "id": format!("a1-{HEX}"),
                "name": HEX,
                "owner": "alice",
                "project_url": format!("https://strata.example.com/api/v2/projects/{HEX}"),
            })],
            &projects,
        )
        .unwrap();
        let rec = &shaped[0];
        assert_eq!(rec.name(), "myproj");
        assert_eq!(rec.get_str("session_name"), Some(HEX));
        assert_eq!(rec.get_str("project_id"), Some(format!("a0-{HEX}").as_str()));
    }

    #[test]
    fn deployments_extract_their_endpoint() {
        let shaped = shape_deployments(vec![json!({
            "id": format!("a2-{HEX}"),
            "name": "dep1",
            "owner": "alice",
            "url": "https://app1.strata.example.com/",
            "project_url": format!("https://strata.example.com/api/v2/projects/{HEX}"),
        })])
        .unwrap();
        assert_eq!(shaped[0].get_str("endpoint"), Some("app1"));
        assert_eq!(shaped[0].get_str("project_id"), Some(format!("a0-{HEX}").as_str()));
    }

    #[test]
    fn revisions_flag_latest_and_join_commands() {
        let url = format!("https://h/api/v2/projects/{HEX}/revisions/0.1.0");
        let shaped = shape_revisions(vec![
            json!({"name": "0.2.0", "url": url, "commands": [{"id": "default"}, {"id": "worker"}]}),
            json!({"name": "0.1.0", "url": url, "commands": []}),
        ])
        .unwrap();
        assert_eq!(shaped[0].get("latest"), Some(&json!(true)));
        assert_eq!(shaped[1].get("latest"), Some(&json!(false)));
        assert_eq!(shaped[0].get_str("commands"), Some("default, worker"));
        assert_eq!(shaped[0].get_str("project_id"), Some(format!("a0-{HEX}").as_str()));
    }

    #[test]
    fn endpoints_join_deployments_and_projects() {
        let projects = RecordList::from_records(
            ResourceKind::Project,
            shape_projects(vec![json!({"id": format!("a0-{HEX}"), "name": "myproj", "owner": "alice"})])
                .unwrap(),
        );
        let deployments = RecordList::from_records(
            ResourceKind::Deployment,
            shape_deployments(vec![json!({
                "id": format!("a2-{HEX}"),
                "name": "dep1",
                "owner": "alice",
                "url": "https://app1.strata.example.com/",
                "project_url": format!("https://h/api/v2/projects/{HEX}"),
            })])
            .unwrap(),
        );
        let shaped = shape_endpoints(
            vec![
                json!({"id": "app1", "project_url": format!("https://h/api/v2/projects/{HEX}")}),
                json!({"id": "orphan", "project_url": "https://h/api/v2/projects/ffff"}),
            ],
            &deployments,
            &projects,
        )
        .unwrap();
        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].get_str("name"), Some("dep1"));
        assert_eq!(shaped[0].get_str("deployment_id"), Some(format!("a2-{HEX}").as_str()));
        assert_eq!(shaped[0].get_str("project_name"), Some("myproj"));
    }

    #[test]
    fn resource_profiles_parse_size_suffix() {
        let shaped = shape_resource_profiles(vec![json!({
            "name": "large",
            "description": "Large instance (cpu: 4, memory: 16 GB, gpu: 1)",
        })])
        .unwrap();
        let rec = &shaped[0];
        assert_eq!(rec.get_str("description"), Some("Large instance"));
        assert_eq!(rec.get_str("cpu"), Some("4"));
        assert_eq!(rec.get_str("memory"), Some("16 GB"));
        assert_eq!(rec.get_str("gpu"), Some("1"));

        let no_gpu = shape_resource_profiles(vec![json!({
            "name": "small",
            "description": "Small (cpu: 1, memory: 2 GB)",
        })])
        .unwrap();
        assert_eq!(no_gpu[0].get("gpu"), Some(&json!(0)));
    }

    #[test]
    fn samples_distinguish_templates() {
        let shaped = shape_samples(vec![
            json!({"name": "tpl", "id": "t1", "is_default": true}),
            json!({"name": "plain", "id": "s1"}),
        ])
        .unwrap();
        assert_eq!(shaped[0].get("is_template"), Some(&json!(true)));
        assert_eq!(shaped[1].get("is_template"), Some(&json!(false)));
        assert_eq!(shaped[1].get("is_default"), Some(&json!(false)));
    }

    #[test]
    fn users_join_last_login() {
        let mut logins = HashMap::new();
        logins.insert("u1".to_string(), 1_700_000_000_000i64);
        let shaped = shape_users(
            vec![json!({"id": "u1", "username": "alice"}), json!({"id": "u2", "username": "bob"})],
            &logins,
        )
        .unwrap();
        // coerced to the canonical timestamp rendering by the column rules
        assert_eq!(shaped[0].get_str("lastLogin"), Some("2023-11-14T22:13:20Z"));
        assert_eq!(shaped[1].get_str("lastLogin"), Some("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn branches_flatten_the_map() {
        let raw = json!({"branches": {"master": "abc", "local": "def"}, "files": []});
        let shaped = shape_branches(&raw).unwrap();
        assert_eq!(shaped.len(), 2);
        assert!(shaped.iter().any(|r| r.get_str("branch") == Some("master")));
    }
}
