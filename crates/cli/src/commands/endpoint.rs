//! Static endpoint commands.

use crate::commands::project::FilterArgs;
use crate::context::{parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum EndpointCmd {
    /// List static endpoints and their claims
    List {
        /// Identifier pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve information about a single endpoint
    Info { ident: String },
}

pub async fn run(ctx: &Context, cmd: EndpointCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        EndpointCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.endpoint_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Endpoint)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        EndpointCmd::Info { ident } => {
            print_record(&platform.endpoint_info(&ident).await?, ctx.format())
        }
    }
}
