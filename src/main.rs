use clap::{Parser, Subcommand};
use mirrorsync::commands::*;
use mirrorsync::core::{error::Result, print_error};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mirrorsync")]
#[command(about = "Deploy environments and modules from cached git mirrors")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy parts of the configured deployment
    Deploy {
        #[command(subcommand)]
        target: DeployTarget,
    },
    /// Show the sync status of a working tree without fetching
    Status {
        /// Working tree to inspect
        path: PathBuf,
        /// Remote the working tree is drawn from
        #[arg(long)]
        remote: String,
        /// Ref the working tree should be at
        #[arg(long = "ref")]
        reference: String,
    },
}

#[derive(Subcommand)]
enum DeployTarget {
    /// Deploy the named modules in every (or one) environment
    Module {
        /// Module names to deploy
        #[arg(required = true)]
        modules: Vec<String>,
        /// Only update modules in this environment
        #[arg(short, long)]
        environment: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging based on --debug flag, RUST_LOG wins when set
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", if cli.debug { "debug" } else { "info" });
    }
    env_logger::init();

    match cli.command {
        Commands::Deploy {
            target:
                DeployTarget::Module {
                    modules,
                    environment,
                },
        } => {
            let options = DeployOptions {
                modules,
                environment,
            };
            match execute_deploy_module(cli.config, options) {
                Ok(true) => {}
                Ok(false) => std::process::exit(1),
                Err(e) => {
                    print_error(&e.to_string());
                    std::process::exit(1);
                }
            }
        }
        Commands::Status {
            path,
            remote,
            reference,
        } => {
            if let Err(e) = execute_status(cli.config, path, remote, reference) {
                print_error(&e.to_string());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
