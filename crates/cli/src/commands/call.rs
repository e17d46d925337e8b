//! Generic API passthrough.

use crate::context::Context;
use crate::output::print_value;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct CallArgs {
    /// URL path. With a leading slash it is host-absolute; otherwise it is
    /// relative to the control-plane API prefix. When --endpoint is given
    /// the path is served by that deployment's subdomain instead.
    pub path: String,

    /// Deployment endpoint (subdomain) to call instead of the API
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Issue a POST instead of a GET
    #[arg(long)]
    pub post: bool,
}

pub async fn call(ctx: &Context, args: CallArgs) -> Result<()> {
    let platform = ctx.platform()?;
    let method = if args.post { "post" } else { "get" };
    let path = if args.endpoint.is_some() && !args.path.starts_with('/') {
        format!("/{}", args.path)
    } else {
        args.path.clone()
    };
    let value = platform.call(method, &path, args.endpoint.as_deref()).await?;
    print_value(&value)
}
