//! Editor commands.

use crate::commands::project::FilterArgs;
use crate::context::{parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum EditorCmd {
    /// List the cluster's available editors
    List {
        /// Name pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve a single editor
    Info { ident: String },
}

pub async fn run(ctx: &Context, cmd: EditorCmd) -> Result<()> {
    let platform = ctx.platform()?;
    match cmd {
        EditorCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = platform.editor_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::Editor)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        EditorCmd::Info { ident } => {
            print_record(&platform.editor_info(&ident).await?, ctx.format())
        }
    }
}
