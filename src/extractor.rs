//! Extraction pipeline
//!
//! Bootstrap → TraceFlag reconcile (optional) → retrieve → delete (optional)
//! → archive (optional), strictly in sequence. Bootstrap, reconcile and
//! retrieval failures end the run; delete, archive and limit-check failures
//! are logged and recorded in the [`RunSummary`].

use crate::api::{HttpApi, SalesforceApi};
use crate::archive::{archive_and_clear, ArchiveReport};
use crate::config::ExtractorConfig;
use crate::deleter::{DeleteOutcome, LogDeleter};
use crate::errors::{ExtractorError, ExtractorResult};
use crate::limits::{check_limits, LimitStatus};
use crate::process::ProcessRunner;
use crate::retriever::{LogRetriever, RetrievalReport};
use crate::session::Session;
use crate::trace_flag::{TraceFlagOutcome, TraceFlagReconciler};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Org login used for authentication and bulk delete
    pub target_username: String,
    /// User whose logs are traced and pulled
    pub debug_username: String,
    pub skip_trace_flag: bool,
    pub delete: bool,
    pub archive: bool,
    pub check_limits: bool,
}

impl RunOptions {
    pub fn new(target_username: impl Into<String>, debug_username: impl Into<String>) -> Self {
        Self {
            target_username: target_username.into(),
            debug_username: debug_username.into(),
            skip_trace_flag: false,
            delete: false,
            archive: false,
            check_limits: false,
        }
    }
}

/// Result of a best-effort step: done, skipped, or failed with the message logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult<T> {
    Skipped,
    Done(T),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub log_dir: PathBuf,
    pub trace_flag: Option<TraceFlagOutcome>,
    pub limits: StepResult<Vec<LimitStatus>>,
    pub retrieval: RetrievalReport,
    pub delete: StepResult<DeleteOutcome>,
    pub archive: StepResult<Option<ArchiveReport>>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Log directory: {}", self.log_dir.display())?;
        match &self.trace_flag {
            Some(outcome) => writeln!(f, "TraceFlag: {outcome}")?,
            None => writeln!(f, "TraceFlag: skipped")?,
        }
        match &self.limits {
            StepResult::Skipped => writeln!(f, "Limits: skipped")?,
            StepResult::Done(statuses) => {
                let over = statuses.iter().filter(|s| s.is_over_threshold()).count();
                let missing = statuses
                    .iter()
                    .filter(|s| matches!(s, LimitStatus::Missing { .. }))
                    .count();
                writeln!(
                    f,
                    "Limits: {} checked, {over} over threshold, {missing} not reported",
                    statuses.len()
                )?
            }
            StepResult::Failed(e) => writeln!(f, "Limits: failed ({e})")?,
        }
        writeln!(
            f,
            "Logs retrieved: {} ({} bytes)",
            self.retrieval.logs.len(),
            self.retrieval.total_bytes()
        )?;
        match &self.delete {
            StepResult::Skipped => writeln!(f, "Remote delete: skipped")?,
            StepResult::Done(DeleteOutcome::NothingToDelete) => writeln!(f, "Remote delete: nothing to delete")?,
            StepResult::Done(DeleteOutcome::Submitted { count, .. }) => {
                writeln!(f, "Remote delete: {count} logs submitted")?
            }
            StepResult::Failed(e) => writeln!(f, "Remote delete: failed ({e})")?,
        }
        match &self.archive {
            StepResult::Skipped => write!(f, "Archive: skipped"),
            StepResult::Done(None) => write!(f, "Archive: nothing to archive"),
            StepResult::Done(Some(report)) => write!(f, "Archive: {}", report.archive_path.display()),
            StepResult::Failed(e) => write!(f, "Archive: failed ({e})"),
        }
    }
}

pub struct LogExtractor<'a, R: ProcessRunner + ?Sized> {
    config: &'a ExtractorConfig,
    runner: &'a R,
}

impl<'a, R: ProcessRunner + ?Sized> LogExtractor<'a, R> {
    pub fn new(config: &'a ExtractorConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    /// Authenticates through the CLI and runs against the live org.
    pub fn run(&self, options: &RunOptions) -> ExtractorResult<RunSummary> {
        let session = Session::bootstrap(self.runner, &self.config.cli_binary, &options.target_username)?;
        let api = HttpApi::new(&session, &self.config.api_version, self.config.request_timeout())?;
        self.run_with_api(&api, options)
    }

    pub fn run_with_api<A: SalesforceApi + ?Sized>(
        &self,
        api: &A,
        options: &RunOptions,
    ) -> ExtractorResult<RunSummary> {
        if options.target_username.trim().is_empty() {
            return Err(ExtractorError::usage("a target username is required"));
        }
        if options.debug_username.trim().is_empty() {
            return Err(ExtractorError::usage("a debug username is required"));
        }

        let log_dir = self.config.log_dir_for(&options.debug_username);
        fs::create_dir_all(&log_dir)
            .map_err(|e| ExtractorError::io(format!("creating {}", log_dir.display()), e))?;
        fs::create_dir_all(&self.config.backup_dir).map_err(|e| {
            ExtractorError::io(format!("creating {}", self.config.backup_dir.display()), e)
        })?;

        let limits = if options.check_limits {
            best_effort("limit check", check_limits(api, &self.config.limits))
        } else {
            StepResult::Skipped
        };

        let trace_flag = if options.skip_trace_flag {
            info!("skipping TraceFlag setup");
            None
        } else {
            Some(TraceFlagReconciler::new(api, self.config).ensure_trace_flag(&options.debug_username)?)
        };

        let retrieval = LogRetriever::new(api, self.config, &log_dir).retrieve_logs(&options.debug_username)?;

        let delete = if options.delete {
            let deleter = LogDeleter::new(self.runner, self.config);
            best_effort(
                "log delete",
                deleter.delete_retrieved_logs(&retrieval.ids(), &options.target_username, &log_dir),
            )
        } else {
            StepResult::Skipped
        };

        let archive = if options.archive {
            best_effort(
                "log archive",
                archive_and_clear(&log_dir, &self.config.backup_dir, &options.debug_username),
            )
        } else {
            StepResult::Skipped
        };

        Ok(RunSummary {
            log_dir,
            trace_flag,
            limits,
            retrieval,
            delete,
            archive,
        })
    }
}

fn best_effort<T>(step: &str, result: ExtractorResult<T>) -> StepResult<T> {
    match result {
        Ok(value) => StepResult::Done(value),
        Err(e) => {
            error!(step, error = %e, "step failed, continuing");
            StepResult::Failed(e.to_string())
        }
    }
}
