//! Global options and lazy session construction.

use anyhow::{bail, Context as _, Result};
use clap::Args;
use strata_api::{AdminPlatform, Platform};
use strata_client::{Realm, Session, SessionConfig};
use strata_ident::FieldFilter;

use crate::output::OutputFormat;

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(
        short = 'o',
        long = "format",
        value_enum,
        global = true,
        default_value_t = OutputFormat::Table
    )]
    pub format: OutputFormat,

    /// Hostname of the cluster
    #[arg(long, global = true, env = "STRATA_HOSTNAME")]
    pub hostname: Option<String>,

    /// Username for user-realm operations
    #[arg(long, global = true, env = "STRATA_USERNAME")]
    pub username: Option<String>,

    /// Password for user-realm operations
    #[arg(long, global = true, env = "STRATA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Username for admin-realm operations
    #[arg(long, global = true, env = "STRATA_ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Password for admin-realm operations
    #[arg(long, global = true, env = "STRATA_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Accept the cluster's certificate without verification
    #[arg(long, global = true, env = "STRATA_INSECURE")]
    pub insecure: bool,

    /// Do not load or save session tokens on disk
    #[arg(long, global = true)]
    pub no_persist: bool,
}

pub struct Context {
    opts: GlobalOpts,
}

impl Context {
    pub fn new(opts: GlobalOpts) -> Self {
        Self { opts }
    }

    pub fn format(&self) -> OutputFormat {
        self.opts.format
    }

    fn hostname(&self) -> Result<String> {
        match &self.opts.hostname {
            Some(h) => Ok(h.clone()),
            None => bail!("no hostname specified; use --hostname or STRATA_HOSTNAME"),
        }
    }

    /// User-realm façade, authenticating lazily on first use.
    pub fn platform(&self) -> Result<Platform> {
        let username = match &self.opts.username {
            Some(u) => u.clone(),
            None => bail!("no username specified; use --username or STRATA_USERNAME"),
        };
        let session = Session::connect(SessionConfig {
            hostname: self.hostname()?,
            username,
            password: self.opts.password.clone(),
            realm: Realm::User,
            persist: !self.opts.no_persist,
            insecure: self.opts.insecure,
        })
        .context("establishing user session")?;
        Ok(Platform::new(session))
    }

    /// Admin-realm façade for user management.
    pub fn admin(&self) -> Result<AdminPlatform> {
        let username = match &self.opts.admin_username {
            Some(u) => u.clone(),
            None => bail!("no admin username specified; use --admin-username or STRATA_ADMIN_USERNAME"),
        };
        let session = Session::connect(SessionConfig {
            hostname: self.hostname()?,
            username,
            password: self.opts.admin_password.clone(),
            realm: Realm::Admin,
            persist: !self.opts.no_persist,
            insecure: self.opts.insecure,
        })
        .context("establishing admin session")?;
        Ok(AdminPlatform::new(session))
    }
}

/// Parse repeated `--filter FIELD[!]=VALUE` options.
pub fn parse_filters(raw: &[String]) -> Result<Vec<FieldFilter>> {
    raw.iter().map(|f| FieldFilter::parse(f).map_err(Into::into)).collect()
}

/// Ask for confirmation on destructive operations unless `--yes` was given.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    eprint!("{prompt} [y/N] ");
    use std::io::Write;
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}
