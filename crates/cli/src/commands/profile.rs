//! Resource profile commands.

use crate::commands::project::FilterArgs;
use crate::context::{parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum ResourceProfileCmd {
    /// List the cluster's resource profiles
    List {
        /// Name pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve a single resource profile
    Info { ident: String },
}

pub async fn run(ctx: &Context, cmd: ResourceProfileCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        ResourceProfileCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.resource_profile_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::ResourceProfile)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        ResourceProfileCmd::Info { ident } => {
            print_record(&platform.resource_profile_info(&ident).await?, ctx.format())
        }
    }
}
