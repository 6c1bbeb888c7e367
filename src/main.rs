// apexlog-extractor - main.rs
// Pulls Apex debug logs for a user; see `--help` for the optional steps

use apexlog_extractor::cli::{dispatch, parse_args};
use std::process::exit;

fn main() {
    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => exit(code),
    };

    exit(dispatch(cli));
}
