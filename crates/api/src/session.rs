//! Interactive session operations.

use crate::error::{ApiError, ApiResult};
use crate::project::{apply_filters, remote_error};
use crate::shape;
use crate::Platform;
use serde_json::{json, Map, Value};
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::FieldFilter;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct SessionStartOpts {
    /// Patch the project's editor before starting, when different.
    pub editor: Option<String>,
    /// Patch the project's resource profile before starting.
    pub resource_profile: Option<String>,
    pub wait: bool,
}

impl Platform {
    pub async fn session_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let projects = self.project_list(&[], false).await?;
        let items = self.fetch_items("sessions").await?;
        let records = shape::shape_sessions(items, &projects)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::Session, records), filters))
    }

    pub async fn session_info(&self, ident: &str, filters: &[FieldFilter]) -> ApiResult<Record> {
        self.resolve(ResourceKind::Session, ident, filters).await
    }

    /// Start a session for a project. The identifier addresses the
    /// *project*, wildcards and all; it must resolve to exactly one.
    pub async fn session_start(&self, ident: &str, opts: SessionStartOpts) -> ApiResult<Record> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        let mut patches = Map::new();
        if let Some(editor) = &opts.editor {
            if prec.get_str("editor") != Some(editor.as_str()) {
                patches.insert("editor".into(), json!(editor));
            }
        }
        if let Some(profile) = &opts.resource_profile {
            if prec.get_str("resource_profile") != Some(profile.as_str()) {
                patches.insert("resource_profile".into(), json!(profile));
            }
        }
        if !patches.is_empty() {
            self.session()
                .patch(&format!("projects/{}", prec.id()), &Value::Object(patches))
                .await?;
        }
        let mut response =
            self.session().post(&format!("projects/{}/sessions", prec.id()), None).await?;
        if let Some(message) = remote_error(&response) {
            return Err(ApiError::ActionFailed { what: "session start".into(), message });
        }
        if opts.wait {
            self.wait_action(&mut response, "session start").await?;
        }
        info!(project = prec.id(), "session started");
        let projects = RecordList::from_records(ResourceKind::Project, vec![prec]);
        let shaped = shape::shape_sessions(vec![response], &projects)?;
        shaped
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::shape("session start returned no record"))
    }

    pub async fn session_stop(&self, ident: &str) -> ApiResult<()> {
        let id = self.resolve(ResourceKind::Session, ident, &[]).await?.id().to_string();
        self.session().delete(&format!("sessions/{id}")).await?;
        info!(id, "session stopped");
        Ok(())
    }

    /// Stop and start again. Editor/profile settings are deliberately not
    /// carried over, so a patch applied before restart takes effect.
    pub async fn session_restart(&self, ident: &str, wait: bool) -> ApiResult<Record> {
        let srec = self.resolve(ResourceKind::Session, ident, &[]).await?;
        let project_id = srec.render("project_id");
        self.session().delete(&format!("sessions/{}", srec.id())).await?;
        self.session_start(&project_id, SessionStartOpts { wait, ..Default::default() }).await
    }

    pub async fn session_branches(&self, ident: &str) -> ApiResult<RecordList> {
        let srec = self.resolve(ResourceKind::Session, ident, &[]).await?;
        // master is the cheaper side: no changed-file scan
        let raw = self.session().get(&format!("sessions/{}/changes/master", srec.id())).await?;
        let records = shape::shape_branches(&raw)?;
        Ok(RecordList::from_records(ResourceKind::Branch, records))
    }

    pub async fn session_changes(&self, ident: &str, master: bool) -> ApiResult<RecordList> {
        let srec = self.resolve(ResourceKind::Session, ident, &[]).await?;
        let which = if master { "master" } else { "local" };
        let raw = self.session().get(&format!("sessions/{}/changes/{which}", srec.id())).await?;
        let records = shape::shape_changes(&raw)?;
        Ok(RecordList::from_records(ResourceKind::Change, records))
    }
}

/// Browser URL for a session: the project detail view when framed, the
/// session's own subdomain otherwise.
pub fn session_open_url(rec: &Record, frame: bool) -> Option<String> {
    if frame {
        let project_url = rec.get_str("project_url")?;
        let (scheme, rest) = project_url.split_once("//")?;
        let host = rest.split('/').next()?;
        let hex = project_url.rsplit('/').next()?;
        Some(format!("{scheme}//{host}/projects/detail/a0-{hex}/view"))
    } else {
        let url = rec.get_str("url")?;
        let (scheme, rest) = url.split_once("//")?;
        let host = rest.split('/').next()?;
        let session_id = url.trim_end_matches('/').rsplit('/').next()?;
        Some(format!("{scheme}//{session_id}.{host}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_record() -> Record {
        let hex = "00000000000000000000000000000001";
        Record::from_value(
            ResourceKind::Session,
            json!({
                "id": format!("a1-{hex}"),
                "url": format!("https://strata.example.com/api/v2/sessions/{hex}"),
                "project_url": format!("https://strata.example.com/api/v2/projects/{hex}"),
            }),
        )
        .unwrap()
    }

    #[test]
    fn framed_url_points_at_the_project_view() {
        let url = session_open_url(&session_record(), true).unwrap();
        assert_eq!(
            url,
            "https://strata.example.com/projects/detail/a0-00000000000000000000000000000001/view"
        );
    }

    #[test]
    fn frameless_url_is_the_session_subdomain() {
        let url = session_open_url(&session_record(), false).unwrap();
        assert_eq!(url, "https://00000000000000000000000000000001.strata.example.com/");
    }
}
