//! yarnctl - deploy YARN compute clusters onto a dockman appliance.

mod commands;
mod config;
mod deploy;
mod error;
mod readiness;
mod session;
mod spec;

use std::error::Error as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yarnctl_dockman::HttpDockman;

use crate::commands::CommandKind;
use crate::config::{RunOptions, Settings};
use crate::error::CliResult;
use crate::session::Session;

#[derive(Parser)]
#[command(name = "yarnctl")]
#[command(about = "Create, inspect and tear down YARN compute clusters")]
#[command(version)]
struct Cli {
    /// Management API password
    #[arg(short, long, env = "YARNCTL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// YARN image name inside the tenant registry
    #[arg(short = 'i', long, hide = true)]
    yarn_image: Option<String>,

    /// Log API traffic to stderr
    #[arg(short, long, hide = true)]
    debug: bool,

    /// Print step banners and request payloads
    #[arg(short, long, hide = true)]
    verbose: bool,

    /// Settings file (defaults to yarnctl.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address of the management API
    api_address: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the compute cluster
    Create {
        /// Number of node managers
        instances: u32,
    },

    /// Show the resource manager address
    Show,

    /// Remove the compute cluster
    Delete,

    /// Run individual steps
    #[command(hide = true)]
    Manual {
        /// Number of node managers
        instances: u32,

        /// Registry the YARN image is pulled from
        registry_url: String,

        /// Image tag
        #[arg(short, long, default_value = "")]
        tag: String,

        /// Steps to run, in order
        #[arg(short, long, num_args = 0..)]
        steps: Vec<String>,
    },
}

impl Commands {
    fn kind(&self) -> CommandKind {
        match self {
            Self::Create { .. } => CommandKind::Create,
            Self::Show => CommandKind::Show,
            Self::Delete => CommandKind::Delete,
            Self::Manual { .. } => CommandKind::Manual,
        }
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("yarnctl={level},yarnctl_dockman={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> CliResult<Vec<String>> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(image) = cli.yarn_image {
        settings.cluster.yarn_image = image;
    }

    let kind = cli.command.kind();
    let mut options = RunOptions {
        verbose: cli.verbose,
        ..RunOptions::default()
    };
    let steps = match cli.command {
        Commands::Create { instances } => {
            options.instances = instances;
            kind.default_steps().to_vec()
        }
        Commands::Show | Commands::Delete => kind.default_steps().to_vec(),
        Commands::Manual {
            instances,
            registry_url,
            tag,
            steps,
        } => {
            options.instances = instances;
            options.registry_url = registry_url;
            options.tag = tag;
            options.verbose = true;
            commands::parse_steps(&steps)?
        }
    };

    if options.verbose {
        println!("Steps: {}", commands::format_steps(&steps));
    }

    let api = HttpDockman::new(settings.http_config(&cli.api_address, cli.password))?;
    tracing::debug!(base_url = %api.base_url(), "management API");
    let mut session = Session::new(Arc::new(api), settings, options);

    let ctx = commands::run(&steps, &mut session).await?;
    Ok(commands::summary(kind, &steps, &ctx))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            std::process::exit(e.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    use crate::commands::Step;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn manual_takes_step_list() {
        let cli = Cli::try_parse_from([
            "yarnctl",
            "-p",
            "secret",
            "10.0.0.1",
            "manual",
            "2",
            "registry.example.com",
            "-t",
            "2.7.1",
            "-s",
            "mk-tenant",
            "mk-images",
        ])
        .unwrap();

        assert_eq!(cli.password.as_deref(), Some("secret"));
        assert_eq!(cli.api_address, "10.0.0.1");
        match cli.command {
            Commands::Manual {
                instances,
                registry_url,
                tag,
                steps,
            } => {
                assert_eq!(instances, 2);
                assert_eq!(registry_url, "registry.example.com");
                assert_eq!(tag, "2.7.1");
                assert_eq!(steps, vec!["mk-tenant", "mk-images"]);
            }
            _ => panic!("expected manual command"),
        }
    }

    #[test]
    fn create_requires_instances() {
        assert!(Cli::try_parse_from(["yarnctl", "10.0.0.1", "create"]).is_err());
        let cli = Cli::try_parse_from(["yarnctl", "10.0.0.1", "create", "4"]).unwrap();
        assert!(matches!(cli.command, Commands::Create { instances: 4 }));
        assert_eq!(cli.command.kind(), CommandKind::Create);
    }

    #[test]
    fn create_runs_deploy_steps_then_reports_address() {
        assert_eq!(
            CommandKind::Create.default_steps(),
            [
                Step::MkConsul,
                Step::MkRm,
                Step::MkHs,
                Step::MkNm,
                Step::GetRm
            ]
        );
    }
}
