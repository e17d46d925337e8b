//! Catalog listings: resource profiles, editors, and sample projects.

use crate::error::{ApiError, ApiResult};
use crate::project::{apply_filters, ProjectCreateOpts};
use crate::shape;
use crate::Platform;
use serde_json::Value;
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::FieldFilter;

#[derive(Debug, Clone, Default)]
pub struct SampleCloneOpts {
    /// New project name; defaults to the sample's own name, uniquified.
    pub name: Option<String>,
    pub tag: Option<String>,
    pub make_unique: Option<bool>,
    pub wait: bool,
}

impl Platform {
    /// Profiles and editors ride along on the project-create action
    /// descriptor rather than having endpoints of their own.
    async fn create_action(&self) -> ApiResult<Value> {
        let query = [("q", "create_action".to_string())];
        let raw = self.session().get_with_query("projects/actions", &query).await?;
        shape::unwrap_records(raw)
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::shape("create action descriptor is empty"))
    }

    pub async fn resource_profile_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let action = self.create_action().await?;
        let items = action
            .get("resource_profiles")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let records = shape::shape_resource_profiles(items)?;
        Ok(apply_filters(
            RecordList::from_records(ResourceKind::ResourceProfile, records),
            filters,
        ))
    }

    pub async fn resource_profile_info(&self, ident: &str) -> ApiResult<Record> {
        self.resolve(ResourceKind::ResourceProfile, ident, &[]).await
    }

    pub async fn editor_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let action = self.create_action().await?;
        let items = action.get("editors").and_then(Value::as_array).cloned().unwrap_or_default();
        let records = shape::shape_editors(items)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::Editor, records), filters))
    }

    pub async fn editor_info(&self, ident: &str) -> ApiResult<Record> {
        self.resolve(ResourceKind::Editor, ident, &[]).await
    }

    /// Templates and samples come from two endpoints but form one catalog.
    pub async fn sample_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let mut items = self.fetch_items("template_projects").await?;
        items.extend(self.fetch_items("sample_projects").await?);
        let records = shape::shape_samples(items)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::Sample, records), filters))
    }

    pub async fn sample_info(&self, ident: &str) -> ApiResult<Record> {
        self.resolve(ResourceKind::Sample, ident, &[]).await
    }

    /// Clone a sample into a fresh project via its download URL.
    pub async fn sample_clone(&self, ident: &str, opts: SampleCloneOpts) -> ApiResult<Record> {
        let sample = self.resolve(ResourceKind::Sample, ident, &[]).await?;
        let source = sample
            .get_str("download_url")
            .ok_or_else(|| ApiError::shape(format!("sample {} has no download url", sample.name())))?
            .to_string();
        let derived = opts.name.is_none();
        let name = opts.name.unwrap_or_else(|| sample.name().to_string());
        let make_unique = opts.make_unique.or(if derived { Some(true) } else { None });
        self.project_create(ProjectCreateOpts {
            source,
            name: Some(name),
            tag: opts.tag,
            make_unique,
            wait: opts.wait,
        })
        .await
    }
}
