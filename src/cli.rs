//! CLI definitions using clap derive API

use crate::config::{DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_PORT};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// TinyStacks ops console command line interface
#[derive(Parser, Debug)]
#[command(
    name = "opsconsole",
    version,
    about = "Run an ops console locally or deploy it to the hosted service",
    after_help = "Examples:\n    \
                  opsconsole init\n    \
                  opsconsole up --config-file ./example.yml\n    \
                  opsconsole up --arch arm64 --backend-port 8080\n    \
                  opsconsole configure\n    \
                  opsconsole deploy"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true, env = "VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an example template file in the current directory
    Init,

    /// Launch the ops console on local containers
    Up(UpArgs),

    /// Deploy the ops console to the hosted service
    Deploy(ConfigArgs),

    /// Show consoles deployed to the hosted service
    List(ListArgs),

    /// Store the API key used by deploy and list
    #[command(alias = "login")]
    Configure,

    /// Open the signup page in a browser
    Signup,
}

/// CPU architecture of the images to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Ia32,
    Arm,
    Arm64,
}

impl Arch {
    pub fn as_raw(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Ia32 => "ia32",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the console config file (defaults to ./config.yml)
    #[arg(long, short = 'c')]
    pub config_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UpArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Image architecture (defaults to the host's)
    #[arg(long, short = 'a', value_enum)]
    pub arch: Option<Arch>,

    /// Host port for the backend API
    #[arg(long, short = 'b', default_value_t = DEFAULT_BACKEND_PORT)]
    pub backend_port: u16,

    /// Host port for the frontend UI
    #[arg(long, short = 'f', default_value_t = DEFAULT_FRONTEND_PORT)]
    pub frontend_port: u16,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show the console with this name
    #[arg(long, short = 'n')]
    pub console_name: Option<String>,
}
