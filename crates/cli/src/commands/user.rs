//! User management commands (admin realm).

use crate::commands::project::FilterArgs;
use crate::context::{parse_filters, Context};
use crate::output::{print_record, print_table};
use anyhow::Result;
use clap::Subcommand;
use strata_core::ResourceKind;
use strata_ident::Identifier;

#[derive(Subcommand, Debug)]
pub enum UserCmd {
    /// List platform users
    List {
        /// Username pattern to narrow the listing; may include wildcards
        ident: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Retrieve a single user
    Info { ident: String },
}

pub async fn run(ctx: &Context, cmd: UserCmd) -> Result<()> {
    let admin = ctx.admin()?;
    match cmd {
        UserCmd::List { ident, filter } => {
            let filters = parse_filters(&filter.filters)?;
            let mut table = admin.user_list(&filters).await?;
            if let Some(raw) = ident {
                let pattern = Identifier::parse(&raw, ResourceKind::User)?;
                table = strata_ident::select(&pattern, &table, &[]);
            }
            print_table(&table, ctx.format())
        }
        UserCmd::Info { ident } => print_record(&admin.user_info(&ident).await?, ctx.format()),
    }
}
