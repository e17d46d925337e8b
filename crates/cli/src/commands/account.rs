//! Login/logout. Strictly speaking `login` is never required: any other
//! command authenticates on demand. It exists to validate credentials and
//! to warm the persisted session.

use crate::context::Context;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Log into the identity service admin realm instead
    #[arg(long)]
    pub admin: bool,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Log out of the identity service admin realm instead
    #[arg(long)]
    pub admin: bool,
}

pub async fn login(ctx: &Context, args: LoginArgs) -> Result<()> {
    if args.admin {
        ctx.admin()?.login().await?;
    } else {
        ctx.platform()?.login().await?;
    }
    eprintln!("Login successful.");
    Ok(())
}

pub async fn logout(ctx: &Context, args: LogoutArgs) -> Result<()> {
    if args.admin {
        ctx.admin()?.logout().await?;
    } else {
        ctx.platform()?.logout().await?;
    }
    eprintln!("Logged out.");
    Ok(())
}
