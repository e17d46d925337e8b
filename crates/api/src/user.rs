//! User management against the identity service admin realm.

use crate::error::ApiResult;
use crate::project::apply_filters;
use crate::shape;
use crate::AdminPlatform;
use serde_json::Value;
use std::collections::HashMap;
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::{FieldFilter, Identifier};

impl AdminPlatform {
    pub async fn user_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let items = self.session().get_paginated("users", None, &[]).await?;
        let last_logins = self.last_logins().await?;
        let records = shape::shape_users(items, &last_logins)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::User, records), filters))
    }

    pub async fn user_info(&self, ident: &str) -> ApiResult<Record> {
        let pattern = Identifier::parse(ident, ResourceKind::User)?;
        let table = self.user_list(&[]).await?;
        Ok(strata_ident::resolve_unique(&pattern, &table, &[])?)
    }

    /// Newest interactive login per user, from the platform's LOGIN events.
    /// Token-refresh logins (`response_mode` present) do not count.
    async fn last_logins(&self) -> ApiResult<HashMap<String, i64>> {
        let query = [
            ("client", "strata-platform".to_string()),
            ("type", "LOGIN".to_string()),
        ];
        let events = self.session().get_paginated("events", None, &query).await?;
        let mut out: HashMap<String, i64> = HashMap::new();
        for event in events {
            if event.pointer("/details/response_mode").is_some() {
                continue;
            }
            let Some(user_id) = event.get("userId").and_then(Value::as_str) else { continue };
            let Some(time) = event.get("time").and_then(Value::as_i64) else { continue };
            // events arrive newest first; keep the first one seen
            out.entry(user_id.to_string()).or_insert(time);
        }
        Ok(out)
    }
}
