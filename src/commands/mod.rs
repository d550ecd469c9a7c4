//! Subcommand implementations.

pub mod configure;
pub mod deploy;
pub mod init;
pub mod list;
pub mod signup;
pub mod up;
