//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::error::Error as _;

use clickbus_cli::{CliError, run};

fn main() {
    match run() {
        Ok(()) => {}
        // Clap renders help, version and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("clickbus: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}
