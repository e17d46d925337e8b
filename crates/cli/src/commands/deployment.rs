//! Deployment commands, including the collaborator sub-group.

use crate::commands::project::FilterArgs;
use crate::context::{confirm, parse_filters, Context};
use crate::output::{print_record, print_table, print_value};
use anyhow::Result;
use clap::Subcommand;
use strata_api::{deployment_open_url, DeploymentStartOpts, LogKind};
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum DeploymentCmd {
    /// List available deployments
    List {
        /// Identifier pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Include collaborators (one extra API call per deployment)
        #[arg(long)]
        collaborators: bool,
    },
    /// Retrieve information about a single deployment
    Info {
        /// Identifier; must match exactly one deployment
        ident: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        collaborators: bool,
    },
    /// Start a deployment for a project
    Start {
        /// Project identifier; a `:tag` qualifier picks the revision
        ident: String,
        /// Deployment name; autogenerated from the project when omitted
        #[arg(long)]
        name: Option<String>,
        /// Static endpoint name; a generated subdomain is used when omitted
        #[arg(long)]
        endpoint: Option<String>,
        /// The command to deploy; the revision's first command by default
        #[arg(long)]
        command: Option<String>,
        /// The resource profile to use
        #[arg(long)]
        resource_profile: Option<String>,
        /// Make the deployment public
        #[arg(long, conflicts_with = "private")]
        public: bool,
        /// Make the deployment private (the default)
        #[arg(long)]
        private: bool,
        /// Wait for the deployment to complete initialization
        #[arg(long)]
        wait: bool,
        /// Stop the deployment if it fails to start; implies --wait
        #[arg(long)]
        stop_on_error: bool,
        /// Open a browser upon initialization; implies --wait
        #[arg(long)]
        open: bool,
        /// Include the platform banner when opening
        #[arg(long)]
        frame: bool,
    },
    /// Stop a deployment
    Stop {
        ident: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Stop a deployment and deploy the same settings again
    Restart {
        ident: String,
        #[arg(long)]
        wait: bool,
        #[arg(long)]
        stop_on_error: bool,
        #[arg(long)]
        open: bool,
        #[arg(long)]
        frame: bool,
    },
    /// Change a deployment's public/private status
    Patch {
        ident: String,
        #[arg(long, conflicts_with = "private")]
        public: bool,
        #[arg(long)]
        private: bool,
    },
    /// Open a deployment in the default browser
    Open {
        ident: String,
        /// Include the platform banner
        #[arg(long)]
        frame: bool,
    },
    /// Retrieve a bearer token for accessing a private deployment
    Token { ident: String },
    /// Retrieve a deployment's log bundle
    Logs {
        ident: String,
        /// Only this stream: app, events, or proxy
        #[arg(long, value_parser = parse_log_kind)]
        which: Option<LogKind>,
    },
    /// Manage deployment collaborators
    #[command(subcommand)]
    Collaborator(CollaboratorCmd),
}

#[derive(Subcommand, Debug)]
pub enum CollaboratorCmd {
    /// List the deployment's collaborators
    List { ident: String },
    /// Retrieve one collaborator entry
    Info { ident: String, userid: String },
    /// Add read-only collaborators
    Add {
        ident: String,
        #[arg(required = true)]
        userids: Vec<String>,
        /// The ids are group names rather than users
        #[arg(long)]
        group: bool,
    },
    /// Remove collaborators
    Remove {
        ident: String,
        #[arg(required = true)]
        userids: Vec<String>,
    },
}

fn parse_log_kind(s: &str) -> Result<LogKind, String> {
    match s {
        "app" => Ok(LogKind::App),
        "events" => Ok(LogKind::Events),
        "proxy" => Ok(LogKind::Proxy),
        other => Err(format!("unknown log stream {other:?}; expected app, events, or proxy")),
    }
}

pub async fn run(ctx: &Context, cmd: DeploymentCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        DeploymentCmd::List { ident, filter, collaborators } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.deployment_list(&filters, collaborators).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Deployment)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        DeploymentCmd::Info { ident, filter, collaborators } => {
            let filters = parse_filters(&filter.filters)?;
            let rec = platform.deployment_info(&ident, &filters, collaborators).await?;
            print_record(&rec, ctx.format())
        }
        DeploymentCmd::Start {
            ident,
            name,
            endpoint,
            command,
            resource_profile,
            public,
            private: _,
            wait,
            stop_on_error,
            open,
            frame,
        } => {
            let rec = platform
                .deployment_start(
                    &ident,
                    DeploymentStartOpts {
                        name,
                        endpoint,
                        command,
                        resource_profile,
                        public,
                        wait: wait || open,
                        stop_on_error,
                        ..Default::default()
                    },
                )
                .await?;
            if open {
                open_in_browser(&rec, frame)?;
            }
            print_record(&rec, ctx.format())
        }
        DeploymentCmd::Stop { ident, yes } => {
            if confirm(&format!("Stop deployment {ident}?"), yes)? {
                platform.deployment_stop(&ident).await?;
                eprintln!("Stopped.");
            }
            Ok(())
        }
        DeploymentCmd::Restart { ident, wait, stop_on_error, open, frame } => {
            let rec =
                platform.deployment_restart(&ident, wait || open, stop_on_error).await?;
            if open {
                open_in_browser(&rec, frame)?;
            }
            print_record(&rec, ctx.format())
        }
        DeploymentCmd::Patch { ident, public, private } => {
            let flag = if public {
                Some(true)
            } else if private {
                Some(false)
            } else {
                None
            };
            print_record(&platform.deployment_patch(&ident, flag).await?, ctx.format())
        }
        DeploymentCmd::Open { ident, frame } => {
            let rec = platform.deployment_info(&ident, &[], false).await?;
            open_in_browser(&rec, frame)
        }
        DeploymentCmd::Token { ident } => {
            println!("{}", platform.deployment_token(&ident).await?);
            Ok(())
        }
        DeploymentCmd::Logs { ident, which } => {
            let logs = platform.deployment_logs(&ident, which).await?;
            print_value(&logs)
        }
        DeploymentCmd::Collaborator(cmd) => run_collaborator(ctx, &platform, cmd).await,
    }
}

async fn run_collaborator(
    ctx: &Context,
    platform: &strata_api::Platform,
    cmd: CollaboratorCmd,
) -> Result<()> {
    match cmd {
        CollaboratorCmd::List { ident } => {
            print_table(&platform.deployment_collaborator_list(&ident).await?, ctx.format())
        }
        CollaboratorCmd::Info { ident, userid } => {
            let rec = platform.deployment_collaborator_info(&ident, &userid).await?;
            print_record(&rec, ctx.format())
        }
        CollaboratorCmd::Add { ident, userids, group } => {
            let table = platform.deployment_collaborator_add(&ident, &userids, group).await?;
            print_table(&table, ctx.format())
        }
        CollaboratorCmd::Remove { ident, userids } => {
            let table = platform.deployment_collaborator_remove(&ident, &userids).await?;
            print_table(&table, ctx.format())
        }
    }
}

fn open_in_browser(rec: &strata_core::Record, frame: bool) -> Result<()> {
    let Some(url) = deployment_open_url(rec, frame) else {
        anyhow::bail!("deployment record carries no usable URL");
    };
    if webbrowser::open(&url).is_err() {
        println!("{url}");
    }
    Ok(())
}
