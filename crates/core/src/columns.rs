//! Canonical column sets and scalar coercion.
//!
//! Column labels prefixed with `?` are deferred: they are not part of an
//! empty table's header, because they only exist when the producing option
//! was requested (e.g. project listings only carry `collaborators` when the
//! collaborator join ran). This keeps headers consistent for empty output.

use crate::kind::ResourceKind;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Canonical column order per kind. Source fields not listed here render
/// after the canonical set, in arrival order.
pub fn registry(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Project => &[
            "name", "owner", "?collaborators", "editor", "resource_profile", "id", "created",
            "updated", "project_create_status", "url",
        ],
        ResourceKind::Revision => &["name", "latest", "owner", "commands", "created", "updated", "id", "url"],
        ResourceKind::Command => &["id", "supports_http_options", "unix", "windows", "env_spec"],
        ResourceKind::Collaborator => &["id", "permission", "type", "first_name", "last_name", "email"],
        ResourceKind::Session => &[
            "name", "owner", "resource_profile", "id", "created", "updated", "state", "project_id",
            "session_name", "project_branch", "url", "project_url",
        ],
        ResourceKind::ResourceProfile => &["name", "description", "cpu", "memory", "gpu", "id"],
        ResourceKind::Editor => &["name", "id", "is_default", "packages"],
        ResourceKind::Sample => &[
            "name", "id", "is_template", "is_default", "description", "download_url", "owner",
            "created", "updated",
        ],
        ResourceKind::Deployment => &[
            "endpoint", "name", "owner", "public", "?collaborators", "command", "revision",
            "resource_profile", "id", "created", "updated", "state", "project_id", "project_name",
            "project_owner",
        ],
        ResourceKind::Job | ResourceKind::Run => &[
            "name", "owner", "command", "revision", "resource_profile", "id", "created", "updated",
            "state", "project_id", "project_name",
        ],
        ResourceKind::Branch => &["branch", "sha1"],
        ResourceKind::Change => &["path", "change_type", "modified", "conflicted", "id"],
        ResourceKind::User => &["username", "firstName", "lastName", "lastLogin", "email", "id"],
        ResourceKind::Activity => &[
            "type", "status", "message", "done", "owner", "id", "description", "created", "updated",
        ],
        ResourceKind::Endpoint => &[
            "id", "owner", "name", "project_name", "deployment_id", "project_id", "project_url",
        ],
    }
}

/// Canonical columns minus deferred entries; the header of an empty table.
pub fn base_columns(kind: ResourceKind) -> Vec<&'static str> {
    registry(kind).iter().filter(|c| !c.starts_with('?')).copied().collect()
}

/// Final column order for a non-empty table: canonical columns present in
/// the data, then remaining fields of the first record in arrival order.
pub fn column_order(kind: ResourceKind, records: &[crate::Record]) -> Vec<String> {
    let first = match records.first() {
        Some(rec) => rec,
        None => return base_columns(kind).into_iter().map(String::from).collect(),
    };
    let canonical: Vec<&str> = registry(kind).iter().map(|c| c.trim_start_matches('?')).collect();
    let mut out: Vec<String> = canonical
        .iter()
        .filter(|c| first.get(c).is_some())
        .map(|c| (*c).to_string())
        .collect();
    for name in first.field_names() {
        if !canonical.contains(&name) {
            out.push(name.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    /// ISO-8601 string from the API.
    DateTime,
    /// Integer milliseconds since the epoch.
    TimestampMs,
    /// Integer seconds since the epoch.
    TimestampS,
}

fn dtype_for(field: &str) -> Option<Dtype> {
    match field {
        "created" | "updated" | "since" | "mtime" | "timestamp" => Some(Dtype::DateTime),
        "createdTimestamp" | "lastLogin" | "time" => Some(Dtype::TimestampMs),
        "notBefore" => Some(Dtype::TimestampS),
        _ => None,
    }
}

/// Coerce a field to its canonical representation. Timestamps of all three
/// source encodings render as RFC 3339 UTC with second precision; values
/// that fail to parse pass through untouched.
pub fn coerce(field: &str, value: Value) -> Value {
    let dtype = match dtype_for(field) {
        Some(d) => d,
        None => return value,
    };
    match (dtype, &value) {
        (Dtype::DateTime, Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Value::String(canonical(dt.with_timezone(&Utc))),
            Err(_) => value,
        },
        (Dtype::TimestampMs, Value::Number(n)) => match n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
            Some(dt) => Value::String(canonical(dt)),
            None => value,
        },
        (Dtype::TimestampS, Value::Number(n)) => match n.as_i64().and_then(|s| Utc.timestamp_opt(s, 0).single()) {
            Some(dt) => Value::String(canonical(dt)),
            None => value,
        },
        _ => value,
    }
}

fn canonical(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use serde_json::json;

    #[test]
    fn coerces_iso_datetimes_to_utc_seconds() {
        let v = coerce("created", json!("2023-04-05T06:07:08.123456+02:00"));
        assert_eq!(v, json!("2023-04-05T04:07:08Z"));
    }

    #[test]
    fn coerces_epoch_millis() {
        let v = coerce("lastLogin", json!(1_700_000_000_000i64));
        assert_eq!(v, json!("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn unparseable_values_pass_through() {
        assert_eq!(coerce("created", json!("yesterday")), json!("yesterday"));
        assert_eq!(coerce("name", json!("2023-04-05T06:07:08Z")), json!("2023-04-05T06:07:08Z"));
    }

    #[test]
    fn column_order_prefers_canonical_then_extras() {
        let rec = Record::from_value(
            ResourceKind::Job,
            json!({"zzz": 1, "id": "a3-0123456789abcdef0123456789abcdef", "name": "j", "owner": "alice"}),
        )
        .unwrap();
        let cols = column_order(ResourceKind::Job, &[rec]);
        assert_eq!(cols[..3], ["name".to_string(), "owner".to_string(), "id".to_string()]);
        assert_eq!(cols.last().unwrap(), "zzz");
    }

    #[test]
    fn deferred_columns_appear_only_when_present() {
        let with = Record::from_value(
            ResourceKind::Project,
            json!({"name": "p", "owner": "alice", "id": "a0-0123456789abcdef0123456789abcdef", "collaborators": "bob"}),
        )
        .unwrap();
        let cols = column_order(ResourceKind::Project, std::slice::from_ref(&with));
        assert!(cols.contains(&"collaborators".to_string()));

        let without = Record::from_value(
            ResourceKind::Project,
            json!({"name": "p", "owner": "alice", "id": "a0-0123456789abcdef0123456789abcdef"}),
        )
        .unwrap();
        let cols = column_order(ResourceKind::Project, &[without]);
        assert!(!cols.contains(&"collaborators".to_string()));
    }
}
