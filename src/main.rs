mod assets;
mod cli;
mod commands;
mod config;
mod credentials;
mod docker;
mod env;
mod error;
mod hosted;
mod launch;
mod manifest;
mod output;
mod preflight;
mod process;
mod registry;
#[cfg(test)]
mod test_support;

use clap::Parser;
use cli::{Cli, Commands};
use error::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "opsconsole=debug" } else { "opsconsole=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match cli.command {
        Commands::Init => commands::init::run(&cwd),
        Commands::Up(args) => commands::up::run(&cwd, args, cli.verbose).await,
        Commands::Deploy(args) => commands::deploy::run(&cwd, args).await,
        Commands::List(args) => commands::list::run(args).await,
        Commands::Configure => commands::configure::run(),
        Commands::Signup => commands::signup::run(),
    }
}

#[tokio::main]
async fn main() {
    if let Ok(cwd) = std::env::current_dir() {
        env::load_env(&cwd);
    }

    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_tracing(verbose);

    if let Err(e) = dispatch(cli).await {
        if e.is_interrupted() {
            tracing::debug!("{e}");
            std::process::exit(130);
        }
        output::report(&e, verbose);
        std::process::exit(1);
    }
}
