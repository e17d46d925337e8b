//! Sample project commands.

use crate::commands::project::FilterArgs;
use crate::context::{parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_api::SampleCloneOpts;
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum SampleCmd {
    /// List the cluster's sample and template projects
    List {
        /// Name pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve a single sample project
    Info { ident: String },
    /// Clone a sample into a new project
    Clone {
        ident: String,
        /// Name for the new project; the sample's name by default
        #[arg(long)]
        name: Option<String>,
        /// Commit tag for the initial revision
        #[arg(long)]
        tag: Option<String>,
        /// Append a counter to the name if needed to make it unique
        #[arg(long)]
        make_unique: bool,
        /// Do not wait for the clone to complete before exiting
        #[arg(long)]
        no_wait: bool,
    },
}

pub async fn run(ctx: &Context, cmd: SampleCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        SampleCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.sample_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Sample)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        SampleCmd::Info { ident } => {
            print_record(&platform.sample_info(&ident).await?, ctx.format())
        }
        SampleCmd::Clone { ident, name, tag, make_unique, no_wait } => {
            let rec = platform
                .sample_clone(
                    &ident,
                    SampleCloneOpts {
                        name,
                        tag,
                        make_unique: if make_unique { Some(true) } else { None },
                        wait: !no_wait,
                    },
                )
                .await?;
            print_record(&rec, ctx.format())
        }
    }
}
