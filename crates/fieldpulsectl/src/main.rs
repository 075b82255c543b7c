//! fieldpulsectl - operator CLI for the fieldpulse metrics engine
//!
//! Reads a catalog dataset, keeps recorded visits in SQLite, and prints
//! pooled rollups for any node of the sales hierarchy.

use std::process::ExitCode;

use clap::Parser;
use fieldpulse_common::PulseConfig;
use fieldpulsectl::cli::Cli;
use fieldpulsectl::commands::{self, Session};
use fieldpulsectl::{errors, logging, output};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match PulseConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(cli.verbose, "warn");
            output::display_error(&format!("{:#}", e));
            return ExitCode::from(errors::EXIT_GENERAL_ERROR);
        }
    };
    logging::init(cli.verbose, &config.logging.level);

    let session = Session::new(&cli, config);
    match commands::run(&cli, &session) {
        Ok(()) => ExitCode::from(errors::EXIT_SUCCESS),
        Err(e) => {
            match errors::engine_error(&e) {
                Some(engine) if engine.is_recoverable() => {
                    output::display_error(&format!("{} ({})", engine, engine.code()));
                }
                _ => output::display_error(&format!("{:#}", e)),
            }
            ExitCode::from(errors::exit_code(&e))
        }
    }
}
