//! Command-line interface: argument parsing, the reduction command and output.

pub mod commands;
pub mod output;
pub mod types;

pub use types::Cli;

use clap::CommandFactory;

use crate::cli::output::truncate;
use crate::domain::ReductionError;

const CANDIDATE_PREVIEW_CHARS: usize = 200;

/// Print `err` to stderr and exit with status 1.
///
/// Cancelled and failed reductions also report the best failing candidate
/// found so far.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let best = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ReductionError>())
        .and_then(ReductionError::best_candidate)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "best_candidate": best,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
        if let Some(best) = best {
            eprintln!(
                "Best failing candidate so far:\n{}",
                truncate(&best, CANDIDATE_PREVIEW_CHARS)
            );
        }
    }
    std::process::exit(1)
}

/// Report a missing input path the way the tool always has: usage on stderr, exit 1.
pub fn print_usage_error() -> ! {
    let mut command = Cli::command();
    eprintln!("{}", command.render_usage());
    eprintln!("error: missing required argument <FILE_PATH>");
    std::process::exit(1)
}
