//! Entry point for the `clusterboot` controller binary.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match clusterboot::run_controller() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be up yet when configuration fails.
            let mut stderr = io::stderr().lock();
            drop(writeln!(stderr, "clusterboot: {error}"));
            ExitCode::FAILURE
        }
    }
}
