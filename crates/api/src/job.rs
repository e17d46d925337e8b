//! Scheduled job and run operations.

use crate::error::{ApiError, ApiResult};
use crate::project::{apply_filters, remote_error};
use crate::shape;
use crate::Platform;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use strata_core::{Record, RecordList, ResourceKind};
use strata_ident::FieldFilter;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct JobCreateOpts {
    /// Cron-style schedule. Without one the job is a one-shot.
    pub schedule: Option<String>,
    /// Job name. Defaults to `<command>-<project>`, uniquified.
    pub name: Option<String>,
    pub command: Option<String>,
    pub resource_profile: Option<String>,
    /// Environment variables passed to the run.
    pub variables: Vec<(String, String)>,
    /// Trigger a run immediately. Defaults to true for unscheduled jobs.
    pub run: Option<bool>,
    /// Block until the triggered run finishes. Defaults to `cleanup`.
    pub wait: Option<bool>,
    /// Delete the job record once its run finished (one-shot semantics).
    pub cleanup: bool,
    pub make_unique: Option<bool>,
    /// Return the run record instead of the job record.
    pub show_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JobPatchOpts {
    pub name: Option<String>,
    pub command: Option<String>,
    pub schedule: Option<String>,
    pub resource_profile: Option<String>,
    pub variables: Option<Vec<(String, String)>>,
}

impl Platform {
    pub async fn job_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let items = self.fetch_items("jobs").await?;
        let records = shape::shape_generic(ResourceKind::Job, items)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::Job, records), filters))
    }

    pub async fn job_info(&self, ident: &str, filters: &[FieldFilter]) -> ApiResult<Record> {
        self.resolve(ResourceKind::Job, ident, filters).await
    }

    pub async fn job_runs(&self, ident: &str) -> ApiResult<RecordList> {
        let jrec = self.resolve(ResourceKind::Job, ident, &[]).await?;
        let items = self.fetch_items(&format!("jobs/{}/runs", jrec.id())).await?;
        let records = shape::shape_generic(ResourceKind::Run, items)?;
        Ok(RecordList::from_records(ResourceKind::Run, records))
    }

    pub async fn job_delete(&self, ident: &str) -> ApiResult<()> {
        let id = self.resolve(ResourceKind::Job, ident, &[]).await?.id().to_string();
        self.session().delete(&format!("jobs/{id}")).await?;
        info!(id, "job deleted");
        Ok(())
    }

    pub async fn job_pause(&self, ident: &str) -> ApiResult<Record> {
        let id = self.resolve(ResourceKind::Job, ident, &[]).await?.id().to_string();
        let raw = self.session().post(&format!("jobs/{id}/pause"), None).await?;
        single_record(ResourceKind::Job, raw)
    }

    pub async fn job_unpause(&self, ident: &str) -> ApiResult<Record> {
        let id = self.resolve(ResourceKind::Job, ident, &[]).await?.id().to_string();
        let raw = self.session().post(&format!("jobs/{id}/unpause"), None).await?;
        single_record(ResourceKind::Job, raw)
    }

    /// Create a job for one revision of a project, optionally running it
    /// immediately and tearing the job record down afterwards.
    pub async fn job_create(&self, ident: &str, opts: JobCreateOpts) -> ApiResult<Record> {
        let run = opts.run.unwrap_or(opts.schedule.is_none() || opts.cleanup);
        let wait = opts.wait.unwrap_or(opts.cleanup);
        if opts.cleanup && opts.schedule.is_some() {
            return Err(ApiError::invalid("cannot use cleanup with a scheduled job"));
        }
        if opts.cleanup && (!run || !wait) {
            return Err(ApiError::invalid("cleanup requires running and waiting"));
        }
        let pattern = strata_ident::Identifier::parse(ident, ResourceKind::Project)?;
        let (prec, rrec, raw_rev) = self.resolve_revision(&pattern).await?;
        let command = match opts.command {
            Some(cmd) => cmd,
            None => raw_rev
                .pointer("/commands/0/id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ApiError::invalid(format!(
                        "project {} has no configured commands; supply one",
                        prec.name()
                    ))
                })?,
        };
        let resource_profile =
            opts.resource_profile.unwrap_or_else(|| prec.render("resource_profile"));
        // The platform's default job names contain ':', which collides with
        // the identifier qualifier separator. Generate our own instead, and
        // avoid reusing the name of any job or run still on the books.
        let derived = opts.name.is_none();
        let mut name = match opts.name {
            Some(name) => name,
            None => format!("{command}-{}", prec.name()),
        };
        if opts.make_unique.unwrap_or(derived) {
            let mut taken: HashSet<String> = HashSet::new();
            for item in self.fetch_items("jobs").await? {
                if let Some(n) = item.get("name").and_then(Value::as_str) {
                    taken.insert(n.to_string());
                }
            }
            for item in self.fetch_items("runs").await? {
                if let Some(n) = item.get("name").and_then(Value::as_str) {
                    taken.insert(n.to_string());
                }
            }
            if taken.contains(&name) {
                let base = name.clone();
                for counter in 1..=taken.len() + 1 {
                    name = format!("{base}-{counter}");
                    if !taken.contains(&name) {
                        break;
                    }
                }
            }
        }
        let mut body = json!({
            "source": rrec.render("url"),
            "resource_profile": resource_profile,
            "command": command,
            "target": "deploy",
            "schedule": opts.schedule,
            "autorun": run,
            "revision": rrec.name(),
            "name": name,
        });
        if !opts.variables.is_empty() {
            let vars: Map<String, Value> =
                opts.variables.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            body["variables"] = Value::Object(vars);
        }
        let response =
            self.session().post(&format!("projects/{}/jobs", prec.id()), Some(&body)).await?;
        if let Some(message) = remote_error(&response) {
            return Err(ApiError::ActionFailed { what: "job creation".into(), message });
        }
        let job_id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::shape("job creation returned no id"))?
            .to_string();
        info!(id = job_id, name, "job created");
        if !run {
            return single_record(ResourceKind::Job, response);
        }
        let runs = self.fetch_items(&format!("jobs/{job_id}/runs")).await?;
        let mut run_rec = runs
            .into_iter()
            .last()
            .ok_or_else(|| ApiError::shape("job ran but produced no run record"))?;
        if wait {
            let run_id = run_rec
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::shape("run record has no id"))?
                .to_string();
            run_rec = self.wait_run_finished(&run_id).await?;
            if opts.cleanup {
                self.session().delete(&format!("jobs/{job_id}")).await?;
                info!(id = job_id, "job cleaned up");
            }
        }
        if opts.show_run {
            single_record(ResourceKind::Run, run_rec)
        } else {
            single_record(ResourceKind::Job, response)
        }
    }

    async fn wait_run_finished(&self, run_id: &str) -> ApiResult<Value> {
        let deadline = Instant::now() + Duration::from_secs(super::wait_secs());
        loop {
            let current = self.session().get(&format!("runs/{run_id}")).await?;
            let state = current.get("state").and_then(Value::as_str).unwrap_or("");
            if matches!(state, "completed" | "error" | "stopped") {
                return Ok(current);
            }
            if Instant::now() >= deadline {
                return Err(ApiError::WaitTimeout {
                    seconds: super::wait_secs(),
                    what: format!("run {run_id} to finish"),
                });
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    pub async fn job_patch(&self, ident: &str, opts: JobPatchOpts) -> ApiResult<Record> {
        let jrec = self.resolve(ResourceKind::Job, ident, &[]).await?;
        let mut data = Map::new();
        if let Some(name) = opts.name {
            if jrec.get_str("name") != Some(name.as_str()) {
                data.insert("name".into(), json!(name));
            }
        }
        if let Some(command) = opts.command {
            if jrec.get_str("command") != Some(command.as_str()) {
                data.insert("command".into(), json!(command));
            }
        }
        if let Some(schedule) = opts.schedule {
            if jrec.get_str("schedule") != Some(schedule.as_str()) {
                data.insert("schedule".into(), json!(schedule));
            }
        }
        if let Some(profile) = opts.resource_profile {
            if jrec.get_str("resource_profile") != Some(profile.as_str()) {
                data.insert("resource_profile".into(), json!(profile));
            }
        }
        if let Some(variables) = opts.variables {
            let vars: Map<String, Value> =
                variables.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            if jrec.get("variables") != Some(&Value::Object(vars.clone())) {
                data.insert("variables".into(), Value::Object(vars));
            }
        }
        if data.is_empty() {
            return Ok(jrec);
        }
        let id = jrec.id().to_string();
        self.session().patch(&format!("jobs/{id}"), &Value::Object(data)).await?;
        self.resolve(ResourceKind::Job, &id, &[]).await
    }

    // ---- runs ----

    pub async fn run_list(&self, filters: &[FieldFilter]) -> ApiResult<RecordList> {
        let items = self.fetch_items("runs").await?;
        let records = shape::shape_generic(ResourceKind::Run, items)?;
        Ok(apply_filters(RecordList::from_records(ResourceKind::Run, records), filters))
    }

    pub async fn run_info(&self, ident: &str, filters: &[FieldFilter]) -> ApiResult<Record> {
        self.resolve(ResourceKind::Run, ident, filters).await
    }

    /// The run's captured job output.
    pub async fn run_log(&self, ident: &str) -> ApiResult<String> {
        let id = self.resolve(ResourceKind::Run, ident, &[]).await?.id().to_string();
        let logs = self.session().get(&format!("runs/{id}/logs")).await?;
        logs.get("job")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::shape("run log bundle has no job stream"))
    }

    pub async fn run_stop(&self, ident: &str) -> ApiResult<Record> {
        let id = self.resolve(ResourceKind::Run, ident, &[]).await?.id().to_string();
        let raw = self.session().post(&format!("runs/{id}/stop"), None).await?;
        single_record(ResourceKind::Run, raw)
    }

    pub async fn run_delete(&self, ident: &str) -> ApiResult<()> {
        let id = self.resolve(ResourceKind::Run, ident, &[]).await?.id().to_string();
        self.session().delete(&format!("runs/{id}")).await?;
        info!(id, "run deleted");
        Ok(())
    }
}

fn single_record(kind: ResourceKind, raw: Value) -> ApiResult<Record> {
    Record::from_value(kind, raw).map_err(|e| ApiError::shape(e.to_string()))
}
