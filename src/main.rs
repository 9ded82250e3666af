use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::Env;

mod build;
mod commands;
mod config;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: PagemillCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "pagemill.yaml")]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct RoutesArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "pagemill.yaml")]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "pagemill.yaml")]
    config_file: Option<PathBuf>,

    /// Only print what would be deleted
    #[arg(short, long, default_value = "false")]
    dry_run: bool,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// The port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Open the project in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file
    #[arg(short, long, default_value = "pagemill.yaml")]
    config_file: Option<PathBuf>,

    /// Whether to watch for changes and rebuild automatically
    #[arg(short, long, default_value = "true", action = clap::ArgAction::Set)]
    watch: bool,
}

#[derive(Subcommand)]
enum PagemillCommand {
    /// Initialize a new Pagemill project
    Init(InitArgs),

    /// Build every page of the site
    Build(BuildArgs),

    /// List every page with its output path and URL
    Routes(RoutesArgs),

    /// Serve the site on a local port
    Serve(ServeArgs),

    /// Delete the build output
    Clean(CleanArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        PagemillCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        PagemillCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        PagemillCommand::Routes(args) => {
            commands::routes::run(&args).await?;
        }
        PagemillCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
        PagemillCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
    }

    Ok(())
}
