use crate::cli::UpArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::launch::shutdown::Shutdown;
use crate::launch::{Launch, LaunchOptions, Toolkit};
use std::path::Path;

pub async fn run(cwd: &Path, args: UpArgs, verbose: bool) -> Result<()> {
    let settings = Settings::from_env();
    let tools = Toolkit::system(&settings, cwd);

    let shutdown = Shutdown::new();
    let listener = shutdown.listen_for_signals();

    let opts = LaunchOptions {
        arch: args.arch.map(|a| a.as_raw().to_string()),
        config_file: args.config.config_file,
        backend_port: args.backend_port,
        frontend_port: args.frontend_port,
        verbose,
    };
    let result = Launch::new(settings, tools, shutdown, cwd.to_path_buf())
        .run(&opts)
        .await;

    listener.abort();
    result
}
