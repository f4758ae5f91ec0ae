use std::process::ExitCode;

use clap::Parser;

use perch_config::DaemonOptions;
use perchd::run_daemon;

fn main() -> ExitCode {
    let options = DaemonOptions::parse();
    match run_daemon(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("perchd: {error}");
            ExitCode::FAILURE
        }
    }
}
