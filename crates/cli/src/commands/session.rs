//! Interactive session commands.

use crate::commands::project::FilterArgs;
use crate::context::{confirm, parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_api::{session_open_url, SessionStartOpts};
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum SessionCmd {
    /// List active sessions
    List {
        /// Identifier pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve information about a single session
    Info {
        /// Identifier; must match exactly one session
        ident: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Start a session for a project
    Start {
        /// Project identifier; must match exactly one project
        ident: String,
        /// Use this editor, patching the project if needed
        #[arg(long)]
        editor: Option<String>,
        /// Use this resource profile, patching the project if needed
        #[arg(long)]
        resource_profile: Option<String>,
        /// Wait for the session to complete initialization
        #[arg(long)]
        wait: bool,
        /// Open a browser upon initialization; implies --wait
        #[arg(long)]
        open: bool,
        /// Include the platform banner when opening
        #[arg(long)]
        frame: bool,
    },
    /// Stop a session
    Stop {
        ident: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Stop a session and start a fresh one for the same project
    Restart {
        ident: String,
        #[arg(long)]
        wait: bool,
        #[arg(long)]
        open: bool,
        #[arg(long)]
        frame: bool,
    },
    /// Open a session in the default browser
    Open {
        ident: String,
        /// Skip the platform banner frame
        #[arg(long)]
        no_frame: bool,
    },
    /// List the branches of the session's working tree
    Branches { ident: String },
    /// List changed files in the session's working tree
    Changes {
        ident: String,
        /// Compare against the master branch instead of the local one
        #[arg(long)]
        master: bool,
    },
}

pub async fn run(ctx: &Context, cmd: SessionCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        SessionCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.session_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Session)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        SessionCmd::Info { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            print_record(&platform.session_info(&ident, &filters).await?, ctx.format())
        }
        SessionCmd::Start { ident, editor, resource_profile, wait, open, frame } => {
            let rec = platform
                .session_start(
                    &ident,
                    SessionStartOpts { editor, resource_profile, wait: wait || open },
                )
                .await?;
            if open {
                open_in_browser(&rec, frame)?;
            }
            print_record(&rec, ctx.format())
        }
        SessionCmd::Stop { ident, yes } => {
            if confirm(&format!("Stop session {ident}?"), yes)? {
                platform.session_stop(&ident).await?;
                eprintln!("Stopped.");
            }
            Ok(())
        }
        SessionCmd::Restart { ident, wait, open, frame } => {
            let rec = platform.session_restart(&ident, wait || open).await?;
            if open {
                open_in_browser(&rec, frame)?;
            }
            print_record(&rec, ctx.format())
        }
        SessionCmd::Open { ident, no_frame } => {
            let rec = platform.session_info(&ident, &[]).await?;
            open_in_browser(&rec, !no_frame)
        }
        SessionCmd::Branches { ident } => {
            print_table(&platform.session_branches(&ident).await?, ctx.format())
        }
        SessionCmd::Changes { ident, master } => {
            print_table(&platform.session_changes(&ident, master).await?, ctx.format())
        }
    }
}

fn open_in_browser(rec: &strata_core::Record, frame: bool) -> Result<()> {
    let Some(url) = session_open_url(rec, frame) else {
        anyhow::bail!("session record carries no usable URL");
    };
    if webbrowser::open(&url).is_err() {
        // No browser available (headless host); the URL is still useful.
        println!("{url}");
    }
    Ok(())
}
