//! deltamin CLI entry point.

use clap::Parser;

use deltamin::cli::{handle_error, print_usage_error, Cli};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are "errors" printed to stdout
            let code = i32::from(err.use_stderr());
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let Some(file_path) = cli.file_path.clone() else {
        print_usage_error();
    };

    if let Err(err) = deltamin::cli::commands::reduce::execute(&cli, &file_path).await {
        handle_error(err, cli.json);
    }
}
