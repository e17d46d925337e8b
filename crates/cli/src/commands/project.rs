//! Project commands, including the collaborator and revision sub-groups.

use crate::context::{confirm, parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::{Args, Subcommand};
use strata_api::{ActivityOpts, ProjectCreateOpts, ProjectPatchOpts};
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Additional FIELD=VALUE / FIELD!=VALUE predicates (repeatable)
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCmd {
    /// List available projects
    List {
        /// Identifier pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Include collaborators (one extra API call per project)
        #[arg(long)]
        collaborators: bool,
    },
    /// Retrieve information about a single project
    Info {
        /// Identifier; must match exactly one project
        ident: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        collaborators: bool,
    },
    /// Change a project's name, editor, or resource profile
    Patch {
        ident: String,
        /// A new name for the project
        #[arg(long)]
        name: Option<String>,
        /// The editor to use for future sessions
        #[arg(long)]
        editor: Option<String>,
        /// The resource profile to use for future sessions
        #[arg(long)]
        resource_profile: Option<String>,
    },
    /// Delete a project
    Delete {
        ident: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Create a project from a source URL
    Create {
        /// Git repository or archive URL
        source: String,
        /// Project name; derived from the URL when omitted
        #[arg(long)]
        name: Option<String>,
        /// Commit tag for the initial revision
        #[arg(long)]
        tag: Option<String>,
        /// Append a counter to the name if needed to make it unique
        #[arg(long)]
        make_unique: bool,
        /// Do not wait for creation to complete before exiting
        #[arg(long)]
        no_wait: bool,
    },
    /// List the project's active sessions
    Sessions { ident: String },
    /// List the project's deployments
    Deployments { ident: String },
    /// List the project's jobs
    Jobs { ident: String },
    /// List the project's runs
    Runs { ident: String },
    /// Show the project's activity log
    Activity {
        ident: String,
        /// Limit the output to N records
        #[arg(long)]
        limit: Option<i64>,
        /// Retrieve all possible records
        #[arg(long)]
        all: bool,
        /// Return only the latest record
        #[arg(long)]
        latest: bool,
    },
    /// Manage project collaborators
    #[command(subcommand)]
    Collaborator(CollaboratorCmd),
    /// Inspect project revisions
    #[command(subcommand)]
    Revision(RevisionCmd),
}

#[derive(Subcommand, Debug)]
pub enum CollaboratorCmd {
    /// List the project's collaborators
    List { ident: String },
    /// Retrieve one collaborator entry
    Info { ident: String, userid: String },
    /// Add or update collaborators
    Add {
        ident: String,
        /// User or group ids
        #[arg(required = true)]
        userids: Vec<String>,
        /// The ids are group names rather than users
        #[arg(long)]
        group: bool,
        /// Grant read-only access
        #[arg(long)]
        read_only: bool,
    },
    /// Remove collaborators
    Remove {
        ident: String,
        #[arg(required = true)]
        userids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RevisionCmd {
    /// List revisions (a `:tag` qualifier on the identifier narrows them)
    List { ident: String },
    /// Retrieve one revision; defaults to the latest
    Info { ident: String },
    /// List the commands a revision exposes
    Commands { ident: String },
}

pub async fn run(ctx: &Context, cmd: ProjectCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        ProjectCmd::List { ident, filter, collaborators } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.project_list(&filters, collaborators).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Project)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        ProjectCmd::Info { ident, filter, collaborators } => {
            let filters = parse_filters(&filter.filters)?;
            let rec = platform.project_info(&ident, &filters, collaborators).await?;
            print_record(&rec, ctx.format())
        }
        ProjectCmd::Patch { ident, name, editor, resource_profile } => {
            let rec = platform
                .project_patch(&ident, ProjectPatchOpts { name, editor, resource_profile })
                .await?;
            print_record(&rec, ctx.format())
        }
        ProjectCmd::Delete { ident, yes } => {
            if confirm(&format!("Delete project {ident}?"), yes)? {
                platform.project_delete(&ident).await?;
                eprintln!("Deleted.");
            }
            Ok(())
        }
        ProjectCmd::Create { source, name, tag, make_unique, no_wait } => {
            let rec = platform
                .project_create(ProjectCreateOpts {
                    source,
                    name,
                    tag,
                    make_unique: if make_unique { Some(true) } else { None },
                    wait: !no_wait,
                })
                .await?;
            print_record(&rec, ctx.format())
        }
        ProjectCmd::Sessions { ident } => {
            print_table(&platform.project_sessions(&ident).await?, ctx.format())
        }
        ProjectCmd::Deployments { ident } => {
            print_table(&platform.project_deployments(&ident).await?, ctx.format())
        }
        ProjectCmd::Jobs { ident } => {
            print_table(&platform.project_jobs(&ident).await?, ctx.format())
        }
        ProjectCmd::Runs { ident } => {
            print_table(&platform.project_runs(&ident).await?, ctx.format())
        }
        ProjectCmd::Activity { ident, limit, all, latest } => {
            let table =
                platform.project_activity(&ident, ActivityOpts { limit, all, latest }).await?;
            match (latest, table.records().first()) {
                (true, Some(rec)) => print_record(rec, ctx.format()),
                _ => print_table(&table, ctx.format()),
            }
        }
        ProjectCmd::Collaborator(cmd) => run_collaborator(ctx, &platform, cmd).await,
        ProjectCmd::Revision(cmd) => run_revision(ctx, &platform, cmd).await,
    }
}

async fn run_collaborator(
    ctx: &Context,
    platform: &strata_api::Platform,
    cmd: CollaboratorCmd,
) -> Result<()> {
    match cmd {
        CollaboratorCmd::List { ident } => {
            print_table(&platform.project_collaborator_list(&ident).await?, ctx.format())
        }
        CollaboratorCmd::Info { ident, userid } => {
            let rec = platform.project_collaborator_info(&ident, &userid).await?;
            print_record(&rec, ctx.format())
        }
        CollaboratorCmd::Add { ident, userids, group, read_only } => {
            let table =
                platform.project_collaborator_add(&ident, &userids, group, read_only).await?;
            print_table(&table, ctx.format())
        }
        CollaboratorCmd::Remove { ident, userids } => {
            let table = platform.project_collaborator_remove(&ident, &userids).await?;
            print_table(&table, ctx.format())
        }
    }
}

async fn run_revision(
    ctx: &Context,
    platform: &strata_api::Platform,
    cmd: RevisionCmd,
) -> Result<()> {
    match cmd {
        RevisionCmd::List { ident } => {
            print_table(&platform.revision_list(&ident).await?, ctx.format())
        }
        RevisionCmd::Info { ident } => {
            print_record(&platform.revision_info(&ident).await?, ctx.format())
        }
        RevisionCmd::Commands { ident } => {
            print_table(&platform.revision_commands(&ident).await?, ctx.format())
        }
    }
}
