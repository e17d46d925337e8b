//! Scheduled job commands.

use crate::commands::project::FilterArgs;
use crate::context::{confirm, parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::{bail, Result};
use clap::Subcommand;
use strata_api::{JobCreateOpts, JobPatchOpts};
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum JobCmd {
    /// List available jobs
    List {
        /// Identifier pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve information about a single job
    Info {
        ident: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Create a job for a project revision
    Create {
        /// Project identifier; a `:tag` qualifier picks the revision
        ident: String,
        /// Cron-style schedule; without one the job runs once
        #[arg(long)]
        schedule: Option<String>,
        /// Job name; autogenerated and uniquified when omitted
        #[arg(long)]
        name: Option<String>,
        /// Append a counter to a supplied name if needed to make it unique
        #[arg(long)]
        make_unique: bool,
        /// The command to run
        #[arg(long)]
        command: Option<String>,
        /// The resource profile to use
        #[arg(long)]
        resource_profile: Option<String>,
        /// KEY=VALUE environment variable for the run (repeatable)
        #[arg(long = "variable", value_name = "KEY=VALUE")]
        variables: Vec<String>,
        /// Trigger a run now (default for unscheduled jobs)
        #[arg(long)]
        run: bool,
        /// Wait for the triggered run to finish
        #[arg(long)]
        wait: bool,
        /// Delete the job record once its run finished; implies --run --wait
        #[arg(long)]
        cleanup: bool,
        /// Print the run record instead of the job record
        #[arg(long)]
        show_run: bool,
    },
    /// Change a job's name, command, schedule, profile, or variables
    Patch {
        ident: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        schedule: Option<String>,
        #[arg(long)]
        resource_profile: Option<String>,
        #[arg(long = "variable", value_name = "KEY=VALUE")]
        variables: Vec<String>,
    },
    /// Delete a job
    Delete {
        ident: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Pause a scheduled job
    Pause { ident: String },
    /// Resume a paused job
    Unpause { ident: String },
    /// List the job's runs
    Runs { ident: String },
}

fn parse_variables(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|v| match v.split_once('=') {
            Some((k, val)) if !k.is_empty() => Ok((k.to_string(), val.to_string())),
            _ => bail!("invalid variable {v:?}: expected KEY=VALUE"),
        })
        .collect()
}

pub async fn run(ctx: &Context, cmd: JobCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        JobCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.job_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Job)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        JobCmd::Info { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            print_record(&platform.job_info(&ident, &filters).await?, ctx.format())
        }
        JobCmd::Create {
            ident,
            schedule,
            name,
            make_unique,
            command,
            resource_profile,
            variables,
            run,
            wait,
            cleanup,
            show_run,
        } => {
            let rec = platform
                .job_create(
                    &ident,
                    JobCreateOpts {
                        schedule,
                        name,
                        command,
                        resource_profile,
                        variables: parse_variables(&variables)?,
                        run: if run || cleanup { Some(true) } else { None },
                        wait: if wait || cleanup { Some(true) } else { None },
                        cleanup,
                        make_unique: if make_unique { Some(true) } else { None },
                        show_run,
                    },
                )
                .await?;
            print_record(&rec, ctx.format())
        }
        JobCmd::Patch { ident, name, command, schedule, resource_profile, variables } => {
            let vars =
                if variables.is_empty() { None } else { Some(parse_variables(&variables)?) };
            let rec = platform
                .job_patch(
                    &ident,
                    JobPatchOpts { name, command, schedule, resource_profile, variables: vars },
                )
                .await?;
            print_record(&rec, ctx.format())
        }
        JobCmd::Delete { ident, yes } => {
            if confirm(&format!("Delete job {ident}?"), yes)? {
                platform.job_delete(&ident).await?;
                eprintln!("Deleted.");
            }
            Ok(())
        }
        JobCmd::Pause { ident } => {
            print_record(&platform.job_pause(&ident).await?, ctx.format())
        }
        JobCmd::Unpause { ident } => {
            print_record(&platform.job_unpause(&ident).await?, ctx.format())
        }
        JobCmd::Runs { ident } => print_table(&platform.job_runs(&ident).await?, ctx.format()),
    }
}
