//! Collaborator management, shared by projects and deployments.

use crate::error::{ApiError, ApiResult};
use crate::project::remote_error;
use crate::shape;
use crate::Platform;
use serde_json::{json, Value};
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::Identifier;

impl Platform {
    /// Fold a parent's collaborator ids into its record as a comma list.
    pub(crate) async fn join_collaborators(&self, parent: &str, rec: &mut Record) -> ApiResult<()> {
        let items = self.fetch_items(&format!("{parent}/{}/collaborators", rec.id())).await?;
        let ids: Vec<&str> =
            items.iter().filter_map(|c| c.get("id").and_then(Value::as_str)).collect();
        rec.set("collaborators", json!(ids.join(", ")));
        Ok(())
    }

    pub(crate) async fn collaborator_list_by_id(
        &self,
        parent: &str,
        id: &str,
    ) -> ApiResult<RecordList> {
        let items = self.fetch_items(&format!("{parent}/{id}/collaborators")).await?;
        let records = shape::shape_generic(ResourceKind::Collaborator, items)?;
        Ok(RecordList::from_records(ResourceKind::Collaborator, records))
    }

    /// Replace the full collaborator list and return the shaped result.
    async fn collaborator_list_set(
        &self,
        parent: &str,
        id: &str,
        collabs: Vec<Value>,
    ) -> ApiResult<RecordList> {
        let result =
            self.session().put(&format!("{parent}/{id}/collaborators"), &json!(collabs)).await?;
        if let Some(message) = remote_error(&result).or_else(|| {
            result
                .pointer("/action/error")
                .filter(|e| !matches!(e, Value::Null | Value::Bool(false)))
                .map(|e| e.to_string())
        }) {
            return Err(ApiError::ActionFailed { what: "collaborator update".into(), message });
        }
        let items = result
            .get("collaborators")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| ApiError::shape("collaborator update returned no collaborator list"))?;
        let records = shape::shape_generic(ResourceKind::Collaborator, items)?;
        Ok(RecordList::from_records(ResourceKind::Collaborator, records))
    }

    async fn collaborator_add(
        &self,
        parent: &str,
        id: &str,
        userids: &[String],
        group: bool,
        read_only: bool,
    ) -> ApiResult<RecordList> {
        let existing = self.collaborator_list_by_id(parent, id).await?;
        let kind = if group { "group" } else { "user" };
        let permission = if read_only { "r" } else { "rw" };
        let mut collabs: Vec<Value> = existing
            .iter()
            .filter(|c| !userids.iter().any(|u| u == c.id()))
            .map(|c| {
                json!({
                    "id": c.id(),
                    "type": c.render("type"),
                    "permission": c.render("permission"),
                })
            })
            .collect();
        for userid in userids {
            collabs.push(json!({"id": userid, "type": kind, "permission": permission}));
        }
        self.collaborator_list_set(parent, id, collabs).await
    }

    async fn collaborator_remove(
        &self,
        parent: &str,
        id: &str,
        userids: &[String],
    ) -> ApiResult<RecordList> {
        let existing = self.collaborator_list_by_id(parent, id).await?;
        let missing: Vec<&str> = userids
            .iter()
            .filter(|u| !existing.iter().any(|c| c.id() == u.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::invalid(format!(
                "collaborator(s) not found: {}",
                missing.join(", ")
            )));
        }
        let collabs: Vec<Value> = existing
            .iter()
            .filter(|c| !userids.iter().any(|u| u == c.id()))
            .map(|c| {
                json!({
                    "id": c.id(),
                    "type": c.render("type"),
                    "permission": c.render("permission"),
                })
            })
            .collect();
        self.collaborator_list_set(parent, id, collabs).await
    }

    async fn collaborator_info(
        &self,
        parent: &str,
        id: &str,
        userid: &str,
    ) -> ApiResult<Record> {
        let table = self.collaborator_list_by_id(parent, id).await?;
        let pattern = Identifier::parse(userid, ResourceKind::Collaborator)?;
        Ok(strata_ident::resolve_unique(&pattern, &table, &[])?)
    }

    // ---- project surface ----

    pub async fn project_collaborator_list(&self, ident: &str) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        self.collaborator_list_by_id("projects", prec.id()).await
    }

    pub async fn project_collaborator_info(&self, ident: &str, userid: &str) -> ApiResult<Record> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        self.collaborator_info("projects", prec.id(), userid).await
    }

    pub async fn project_collaborator_add(
        &self,
        ident: &str,
        userids: &[String],
        group: bool,
        read_only: bool,
    ) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        self.collaborator_add("projects", prec.id(), userids, group, read_only).await
    }

    pub async fn project_collaborator_remove(
        &self,
        ident: &str,
        userids: &[String],
    ) -> ApiResult<RecordList> {
        let prec = self.resolve(ResourceKind::Project, ident, &[]).await?;
        self.collaborator_remove("projects", prec.id(), userids).await
    }

    // ---- deployment surface ----

    pub async fn deployment_collaborator_list(&self, ident: &str) -> ApiResult<RecordList> {
        let drec = self.resolve(ResourceKind::Deployment, ident, &[]).await?;
        self.collaborator_list_by_id("deployments", drec.id()).await
    }

    pub async fn deployment_collaborator_info(
        &self,
        ident: &str,
        userid: &str,
    ) -> ApiResult<Record> {
        let drec = self.resolve(ResourceKind::Deployment, ident, &[]).await?;
        self.collaborator_info("deployments", drec.id(), userid).await
    }

    /// Deployment collaborators are always read-only viewers.
    pub async fn deployment_collaborator_add(
        &self,
        ident: &str,
        userids: &[String],
        group: bool,
    ) -> ApiResult<RecordList> {
        let drec = self.resolve(ResourceKind::Deployment, ident, &[]).await?;
        self.collaborator_add("deployments", drec.id(), userids, group, true).await
    }

    pub async fn deployment_collaborator_remove(
        &self,
        ident: &str,
        userids: &[String],
    ) -> ApiResult<RecordList> {
        let drec = self.resolve(ResourceKind::Deployment, ident, &[]).await?;
        self.collaborator_remove("deployments", drec.id(), userids).await
    }

    /// Used by deployment start/restart to apply an initial viewer list by
    /// deployment id, before the deployment is resolvable by name.
    pub(crate) async fn deployment_collaborator_set_by_id(
        &self,
        id: &str,
        collabs: Vec<Value>,
    ) -> ApiResult<RecordList> {
        self.collaborator_list_set("deployments", id, collabs).await
    }
}
