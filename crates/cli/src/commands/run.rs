//! Job run commands.

use crate::commands::project::FilterArgs;
use crate::context::{confirm, parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum RunCmd {
    /// List available runs
    List {
        /// Identifier pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve information about a single run
    Info {
        ident: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print a run's captured output
    Log { ident: String },
    /// Stop a run in progress
    Stop {
        ident: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Delete a run record
    Delete {
        ident: String,
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(ctx: &Context, cmd: RunCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        RunCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.run_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Run)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        RunCmd::Info { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            print_record(&platform.run_info(&ident, &filters).await?, ctx.format())
        }
        RunCmd::Log { ident } => {
            print!("{}", platform.run_log(&ident).await?);
            Ok(())
        }
        RunCmd::Stop { ident, yes } => {
            if confirm(&format!("Stop run {ident}?"), yes)? {
                let rec = platform.run_stop(&ident).await?;
                print_record(&rec, ctx.format())?;
            }
            Ok(())
        }
        RunCmd::Delete { ident, yes } => {
            if confirm(&format!("Delete run {ident}?"), yes)? {
                platform.run_delete(&ident).await?;
                eprintln!("Deleted.");
            }
            Ok(())
        }
    }
}
