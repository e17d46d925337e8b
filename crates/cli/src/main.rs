use anyhow::Result;
use clap::{Parser, Subcommand};
use std::str::FromStr;

mod commands;
mod context;
mod output;

use context::{Context, GlobalOpts};

#[derive(Parser, Debug)]
#[command(
    name = "stratactl",
    version,
    about = "Strata platform CLI",
    after_help = "Type \"stratactl <command> --help\" for help on a specific command."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log into the cluster (any command logs in on demand)
    Login(commands::account::LoginArgs),
    /// Log out and discard the persisted session
    Logout(commands::account::LogoutArgs),
    /// Make a generic API call
    Call(commands::call::CallArgs),
    /// Commands related to projects
    #[command(subcommand)]
    Project(commands::project::ProjectCmd),
    /// Commands related to interactive sessions
    #[command(subcommand)]
    Session(commands::session::SessionCmd),
    /// Commands related to deployments
    #[command(subcommand)]
    Deployment(commands::deployment::DeploymentCmd),
    /// Commands related to scheduled jobs
    #[command(subcommand)]
    Job(commands::job::JobCmd),
    /// Commands related to job runs
    #[command(subcommand)]
    Run(commands::run::RunCmd),
    /// Commands related to static endpoints
    #[command(subcommand)]
    Endpoint(commands::endpoint::EndpointCmd),
    /// Commands related to resource profiles
    #[command(subcommand, name = "resource-profile")]
    ResourceProfile(commands::profile::ResourceProfileCmd),
    /// Commands related to editors
    #[command(subcommand)]
    Editor(commands::editor::EditorCmd),
    /// Commands related to sample projects
    #[command(subcommand)]
    Sample(commands::sample::SampleCmd),
    /// Commands related to platform users (admin)
    #[command(subcommand)]
    User(commands::user::UserCmd),
}

fn init_tracing() {
    let env = std::env::var("STRATA_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("STRATA_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid STRATA_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.global);
    match cli.command {
        Commands::Login(args) => commands::account::login(&ctx, args).await,
        Commands::Logout(args) => commands::account::logout(&ctx, args).await,
        Commands::Call(args) => commands::call::call(&ctx, args).await,
        Commands::Project(cmd) => commands::project::run(&ctx, cmd).await,
        Commands::Session(cmd) => commands::session::run(&ctx, cmd).await,
        Commands::Deployment(cmd) => commands::deployment::run(&ctx, cmd).await,
        Commands::Job(cmd) => commands::job::run(&ctx, cmd).await,
        Commands::Run(cmd) => commands::run::run(&ctx, cmd).await,
        Commands::Endpoint(cmd) => commands::endpoint::run(&ctx, cmd).await,
        Commands::ResourceProfile(cmd) => commands::profile::run(&ctx, cmd).await,
        Commands::Editor(cmd) => commands::editor::run(&ctx, cmd).await,
        Commands::Sample(cmd) => commands::sample::run(&ctx, cmd).await,
        Commands::User(cmd) => commands::user::run(&ctx, cmd).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use crate::output::OutputFormat;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_project_list_with_pattern_and_filters() {
        let cli = Cli::parse_from([
            "stratactl",
            "project",
            "list",
            "alice/proj*",
            "--filter",
            "editor=jupyterlab",
            "-o",
            "json",
        ]);
        assert_eq!(cli.global.format, OutputFormat::Json);
        match cli.command {
            Commands::Project(commands::project::ProjectCmd::List { ident, filter, .. }) => {
                assert_eq!(ident.as_deref(), Some("alice/proj*"));
                assert_eq!(filter.filters, vec!["editor=jupyterlab".to_string()]);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parse_deployment_start_options() {
        let cli = Cli::parse_from([
            "stratactl",
            "deployment",
            "start",
            "alice/proj1:0.1.0",
            "--endpoint",
            "app1",
            "--public",
            "--wait",
        ]);
        match cli.command {
            Commands::Deployment(commands::deployment::DeploymentCmd::Start {
                ident,
                endpoint,
                public,
                wait,
                ..
            }) => {
                assert_eq!(ident, "alice/proj1:0.1.0");
                assert_eq!(endpoint.as_deref(), Some("app1"));
                assert!(public);
                assert!(wait);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn global_options_reach_subcommands() {
        let cli = Cli::parse_from([
            "stratactl",
            "session",
            "list",
            "--hostname",
            "strata.example.com",
            "--username",
            "alice",
        ]);
        assert_eq!(cli.global.hostname.as_deref(), Some("strata.example.com"));
        assert_eq!(cli.global.username.as_deref(), Some("alice"));
    }
}
