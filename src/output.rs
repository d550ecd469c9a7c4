//! User-facing status lines. Diagnostics go through `tracing` instead.

use crate::error::OpsError;
use console::Style;

pub fn success(message: &str) {
    println!("{}", Style::new().green().apply_to(format!("Success: {message}")));
}

pub fn info(message: &str) {
    println!("{}", Style::new().blue().apply_to(format!("Info: {message}")));
}

pub fn warn(message: &str) {
    eprintln!("{}", Style::new().yellow().apply_to(format!("Warning: {message}")));
}

pub fn hint(message: &str) {
    eprintln!("{}", Style::new().magenta().apply_to(format!("Hint: {message}")));
}

pub fn error(message: &str) {
    eprintln!("{}", Style::new().red().apply_to(format!("Error: {message}")));
}

/// Plain output meant for piping (JSON responses).
pub fn stdout(message: &str) {
    println!("{message}");
}

/// Report a fatal error: one error line, its hints, and the verbose hint when not verbose.
pub fn report(err: &OpsError, verbose: bool) {
    error(&err.to_string());
    for h in err.hints() {
        hint(&h);
    }
    if !verbose {
        hint("Re-run with --verbose for more details.");
    }
}
