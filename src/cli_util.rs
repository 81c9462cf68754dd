use std::io::{self, Write};
use tracing_subscriber::{fmt, EnvFilter};
use crate::error::RunError;
use crate::program::{ProgramError, sanitize};

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// filter, which only lets warnings through.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Print a run error the way the CLI reports it. `source` is the raw program
/// text; bracket errors point at the offending instruction of its sanitized
/// form.
pub fn print_run_error(source: &str, err: &RunError) {
    match err {
        RunError::Program(ProgramError::BracketImbalance { ip, kind }) => {
            let code: String = sanitize(source).iter().map(|i| i.as_char()).collect();
            let msg = format!("\nERROR: Loop brackets not balanced, {kind}");
            print_error_with_context(&msg, &code, *ip);
        }
        RunError::Input(e) => {
            eprintln!("\nERROR: {e}. Exiting...");
        }
        RunError::Interrupted => {
            eprintln!("\nERROR: Caught interrupt. Exiting...");
        }
    }
    let _ = io::stderr().flush();
}

/// Print a concise error with instruction index and a caret context window.
/// `code` is sanitized program text, so it is pure ASCII.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{prefix} at instruction {pos}");

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let start = pos.saturating_sub(WINDOW_CHARS).min(code.len());
    let end = (pos + WINDOW_CHARS + 1).min(code.len());
    eprintln!("  {}", &code[start..end]);

    // Caret under the exact position
    let underline = format!("{}^", " ".repeat(pos.saturating_sub(start)));
    eprintln!("  {}", underline);
    let _ = io::stderr().flush();
}
