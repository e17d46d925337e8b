//! Project operations: listing, lifecycle, activity, and revisions.

use crate::error::{ApiError, ApiResult};
use crate::shape;
use crate::Platform;
use serde_json::{json, Map, Value};
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::{FieldFilter, Identifier};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ProjectPatchOpts {
    pub name: Option<String>,
    pub editor: Option<String>,
    pub resource_profile: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectCreateOpts {
    /// Source URL (git repository or archive) the platform pulls from.
    pub source: String,
    /// Project name; derived from the source URL's basename when omitted.
    pub name: Option<String>,
    pub tag: Option<String>,
    /// Let the platform uniquify a colliding name. Defaults to true when
    /// the name was derived rather than given.
    pub make_unique: Option<bool>,
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityOpts {
    pub limit: Option<i64>,
    pub all: bool,
    pub latest: bool,
}

impl Platform {
    pub async fn project_list(
        &self,
        filters: &[FieldFilter],
        collaborators: bool,
    ) -> ApiResult<RecordList> {
        let items = self.fetch_items("projects").await?;
        let mut records = shape::shape_projects(items)?;
        if collaborators {
            for rec in &mut records {
                self.join_collaborators("projects", rec).await?;
            }
        }
        let table = RecordList::from_records(ResourceKind::Project, records);
        Ok(apply_filters(table, filters))
    }

    pub async fn project_info(
        &self,
        ident: &str,
        filters: &[FieldFilter],
        collaborators: bool,
    ) -> ApiResult<Record> {
        let mut rec = self.resolve(ResourceKind::Project, ident, filters).await?;
        if collaborators {
            self.join_collaborators("projects", &mut rec).await?;
        }
        Ok(rec)
    }

    pub async fn project_patch(&self, ident: &str, opts: ProjectPatchOpts) -> ApiResult<Record> {
        let rec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let mut data = Map::new();
        if let Some(name) = opts.name {
            data.insert("name".into(), json!(name));
        }
        if let Some(editor) = opts.editor {
            data.insert("editor".into(), json!(editor));
        }
        if let Some(profile) = opts.resource_profile {
            data.insert("resource_profile".into(), json!(profile));
        }
        if data.is_empty() {
            return Ok(rec);
        }
        let id = rec.id().to_string();
        self.session().patch(&format!("projects/{id}"), &Value::Object(data)).await?;
        self.resolve(ResourceKind::Project, &id, &[]).await
    }

    pub async fn project_delete(&self, ident: &str) -> ApiResult<()> {
        let id = self.resolve(ResourceKind::Project, ident, &[]).await?.id().to_string();
        self.session().delete(&format!("projects/{id}")).await?;
        info!(id, "project deleted");
        Ok(())
    }

    pub async fn project_create(&self, opts: ProjectCreateOpts) -> ApiResult<Record> {
        let derived = opts.name.is_none();
        let name = match opts.name {
            Some(name) => name,
            None => name_from_source(&opts.source).ok_or_else(|| {
                ApiError::invalid(format!(
                    "cannot derive a project name from {:?}; supply one",
                    opts.source
                ))
            })?,
        };
        let make_unique = opts.make_unique.unwrap_or(derived);
        let mut body = json!({
            "name": name,
            "source": opts.source,
            "make_unique": make_unique,
        });
        if let Some(tag) = opts.tag {
            body["tag"] = json!(tag);
        }
        let mut response = self.session().post("projects", Some(&body)).await?;
        if let Some(err) = remote_error(&response) {
            return Err(ApiError::ActionFailed { what: "project creation".into(), message: err });
        }
        if opts.wait {
            self.wait_action(&mut response, "project creation").await?;
        }
        let id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::shape("project creation returned no id"))?
            .to_string();
        self.resolve(ResourceKind::Project, &id, &[]).await
    }

    pub async fn project_sessions(&self, ident: &str) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let items = self.fetch_items(&format!("projects/{}/sessions", prec.id())).await?;
        let projects = RecordList::from_records(ResourceKind::Project, vec![prec]);
        let records = shape::shape_sessions(items, &projects)?;
        Ok(RecordList::from_records(ResourceKind::Session, records))
    }

    pub async fn project_deployments(&self, ident: &str) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let items = self.fetch_items(&format!("projects/{}/deployments", prec.id())).await?;
        let records = shape::shape_deployments(items)?;
        Ok(RecordList::from_records(ResourceKind::Deployment, records))
    }

    pub async fn project_jobs(&self, ident: &str) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let items = self.fetch_items(&format!("projects/{}/jobs", prec.id())).await?;
        let records = shape::shape_generic(ResourceKind::Job, items)?;
        Ok(RecordList::from_records(ResourceKind::Job, records))
    }

    pub async fn project_runs(&self, ident: &str) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let items = self.fetch_items(&format!("projects/{}/runs", prec.id())).await?;
        let records = shape::shape_generic(ResourceKind::Run, items)?;
        Ok(RecordList::from_records(ResourceKind::Run, records))
    }

    pub async fn project_activity(&self, ident: &str, opts: ActivityOpts) -> ApiResult<RecordList> {
        if opts.all && opts.latest {
            return Err(ApiError::invalid("cannot request both all and latest activity"));
        }
        let limit = match opts.limit {
            None => {
                if opts.latest {
                    1
                } else if opts.all {
                    999_999
                } else {
                    10
                }
            }
            Some(n) if opts.all && n > 0 => {
                return Err(ApiError::invalid(format!("cannot request both all and limit={n}")))
            }
            Some(n) if opts.latest && n > 1 => {
                return Err(ApiError::invalid(format!("cannot request both latest and limit={n}")))
            }
            Some(n) if n <= 0 => 999_999,
            Some(n) => n,
        };
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let query = [("sort", "-updated".to_string()), ("page[size]", limit.to_string())];
        let raw = self
            .session()
            .get_with_query(&format!("projects/{}/activity", prec.id()), &query)
            .await?;
        let records = shape::shape_generic(ResourceKind::Activity, shape::unwrap_records(raw))?;
        Ok(RecordList::from_records(ResourceKind::Activity, records))
    }

    // ---- revisions ----

    /// All revisions of one project, newest first. A `:qualifier` on the
    /// project identifier narrows to matching revision tags.
    pub async fn revision_list(&self, ident: &str) -> ApiResult<RecordList> {
        let ident = Identifier::parse(ident, ResourceKind::Project)?;
        let (_prec, table, _raw) = self.revisions_of(&ident).await?;
        match ident.revision() {
            None | Some("*") => Ok(table),
            Some("latest") => {
                let first = table.iter().next().cloned();
                Ok(RecordList::from_records(ResourceKind::Revision, first.into_iter().collect()))
            }
            Some(tag) => {
                let pattern = Identifier::parse(tag, ResourceKind::Revision)?;
                Ok(strata_ident::select(&pattern, &table, &[]))
            }
        }
    }

    pub async fn revision_info(&self, ident: &str) -> ApiResult<Record> {
        let ident = Identifier::parse(ident, ResourceKind::Project)?;
        let (_prec, rev, _raw) = self.resolve_revision(&ident).await?;
        Ok(rev)
    }

    /// Commands defined by a revision (the deployable/runnable entry
    /// points from the project's manifest).
    pub async fn revision_commands(&self, ident: &str) -> ApiResult<RecordList> {
        let ident = Identifier::parse(ident, ResourceKind::Project)?;
        let (_prec, _rev, raw) = self.resolve_revision(&ident).await?;
        let records = shape::shape_commands(&raw)?;
        Ok(RecordList::from_records(ResourceKind::Command, records))
    }

    /// Resolve the project *and* one revision of it: the identifier's
    /// qualifier picks a tag, defaulting to the latest revision.
    pub(crate) async fn resolve_revision(
        &self,
        ident: &Identifier,
    ) -> ApiResult<(Record, Record, Value)> {
        let (prec, table, raw_items) = self.revisions_of(ident).await?;
        let rev = match ident.revision() {
            None | Some("latest") => table.iter().next().cloned().ok_or_else(|| {
                strata_ident::ResolveError::NotFound {
                    kind: ResourceKind::Revision,
                    ident: ident.to_string(),
                }
            })?,
            Some(tag) => {
                let pattern = Identifier::parse(tag, ResourceKind::Revision)?;
                strata_ident::resolve_unique(&pattern, &table, &[])?
            }
        };
        let raw = raw_items
            .into_iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(rev.id()))
            .ok_or_else(|| ApiError::shape("revision listing lost the resolved revision"))?;
        Ok((prec, rev, raw))
    }

    async fn revisions_of(
        &self,
        ident: &Identifier,
    ) -> ApiResult<(Record, RecordList, Vec<Value>)> {
        let prec = self.resolve_pattern(ident, &[]).await?;
        let raw_items = self.fetch_items(&format!("projects/{}/revisions", prec.id())).await?;
        let records = shape::shape_revisions(raw_items.clone())?;
        let table = RecordList::from_records(ResourceKind::Revision, records);
        Ok((prec, table, raw_items))
    }
}

/// Retain only records passing every filter, keeping the column set.
pub(crate) fn apply_filters(table: RecordList, filters: &[FieldFilter]) -> RecordList {
    if filters.is_empty() {
        return table;
    }
    let kind = table.kind();
    let records: Vec<Record> =
        table.into_iter().filter(|rec| filters.iter().all(|f| f.matches(rec))).collect();
    if records.is_empty() {
        RecordList::empty(kind)
    } else {
        RecordList::from_records(kind, records)
    }
}

/// `https://host/path/name.tar.gz` -> `name`
fn name_from_source(source: &str) -> Option<String> {
    let base = source.rsplit('/').next()?;
    let name = base.split('.').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// An embedded `{"error": {"message": ...}}` in an otherwise-200 response.
pub(crate) fn remote_error(response: &Value) -> Option<String> {
    let err = response.get("error")?;
    if matches!(err, Value::Null | Value::Bool(false)) {
        return None;
    }
    Some(
        err.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_project_names_from_sources() {
        assert_eq!(name_from_source("https://h/files/demo.tar.gz").unwrap(), "demo");
        assert_eq!(name_from_source("https://github.com/org/repo").unwrap(), "repo");
        assert!(name_from_source("https://h/files/").is_none());
    }

    #[test]
    fn remote_errors_extract_messages() {
        assert_eq!(
            remote_error(&json!({"error": {"message": "boom"}})).unwrap(),
            "boom"
        );
        assert!(remote_error(&json!({"id": "x"})).is_none());
        assert!(remote_error(&json!({"error": null})).is_none());
    }
}
