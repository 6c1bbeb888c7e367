// External process capability
// Session lookup and bulk delete both go through the sfdx CLI

use crate::errors::{ExtractorError, ExtractorResult};
use std::process::Command;
use tracing::debug;

/// Captured result of one finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external command to completion.
pub trait ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> ExtractorResult<ProcessOutput>;
}

/// Spawns real processes; arguments are passed without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> ExtractorResult<ProcessOutput> {
        debug!(program, ?args, "spawning external command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ExtractorError::process(program, format!("failed to spawn: {e}")))?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Renders a command line for log output.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
