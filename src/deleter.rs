// Remote ApexLog cleanup
// Ids go to a CSV, then `sfdx force:data:bulk:delete` removes the records.
// Deletion is best effort: callers log failures and carry on.

use crate::config::ExtractorConfig;
use crate::errors::{ExtractorError, ExtractorResult};
use crate::process::{display_command, ProcessRunner};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ID_CSV_FILE: &str = "apex-logids.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    NothingToDelete,
    Submitted {
        csv_path: PathBuf,
        count: usize,
        output: String,
    },
}

/// Writes `Id` plus one row per id.
pub fn write_id_csv(path: &Path, ids: &[String]) -> ExtractorResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| ExtractorError::csv(format!("creating {}", path.display()), e))?;
    writer.write_record(["Id"])?;
    for id in ids {
        writer.write_record([id.as_str()])?;
    }
    writer
        .flush()
        .map_err(|e| ExtractorError::io(format!("flushing {}", path.display()), e))?;
    Ok(())
}

pub struct LogDeleter<'a, R: ProcessRunner + ?Sized> {
    runner: &'a R,
    config: &'a ExtractorConfig,
}

impl<'a, R: ProcessRunner + ?Sized> LogDeleter<'a, R> {
    pub fn new(runner: &'a R, config: &'a ExtractorConfig) -> Self {
        Self { runner, config }
    }

    pub fn bulk_delete_args(&self, csv_path: &Path, target_username: &str) -> Vec<String> {
        vec![
            "force:data:bulk:delete".to_string(),
            "-s".to_string(),
            "ApexLog".to_string(),
            "-w".to_string(),
            self.config.bulk_delete_wait_minutes.to_string(),
            "-f".to_string(),
            csv_path.display().to_string(),
            format!("--targetusername={target_username}"),
        ]
    }

    pub fn delete_retrieved_logs(
        &self,
        ids: &[String],
        target_username: &str,
        csv_dir: &Path,
    ) -> ExtractorResult<DeleteOutcome> {
        if ids.is_empty() {
            info!("no retrieved logs to delete");
            return Ok(DeleteOutcome::NothingToDelete);
        }

        info!(count = ids.len(), "deleting logs from instance");
        let csv_path = csv_dir.join(ID_CSV_FILE);
        write_id_csv(&csv_path, ids)?;

        let args = self.bulk_delete_args(&csv_path, target_username);
        let command = display_command(&self.config.cli_binary, &args);
        let output = self.runner.run(&self.config.cli_binary, &args)?;

        let stdout = output.stdout.trim().to_string();
        if !output.success() {
            warn!(%command, exit_code = output.exit_code, stderr = %output.stderr.trim(), "bulk delete failed");
            return Err(ExtractorError::process(
                command,
                format!("exit code {}: {}", output.exit_code, output.stderr.trim()),
            ));
        }

        info!(output = %stdout, "bulk delete finished");
        Ok(DeleteOutcome::Submitted {
            csv_path,
            count: ids.len(),
            output: stdout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_header_and_ids_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ID_CSV_FILE);
        let ids = vec!["07L2".to_string(), "07L1".to_string()];

        write_id_csv(&path, &ids).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["Id", "07L2", "07L1"]);
    }

    #[test]
    fn bulk_delete_arguments_match_cli_contract() {
        struct NoRunner;
        impl ProcessRunner for NoRunner {
            fn run(&self, _: &str, _: &[String]) -> ExtractorResult<crate::process::ProcessOutput> {
                unreachable!()
            }
        }

        let cfg = ExtractorConfig::default();
        let deleter = LogDeleter::new(&NoRunner, &cfg);
        let args = deleter.bulk_delete_args(Path::new("/tmp/ids.csv"), "admin@example.com");
        assert_eq!(
            display_command("sfdx", &args),
            "sfdx force:data:bulk:delete -s ApexLog -w 5 -f /tmp/ids.csv --targetusername=admin@example.com"
        );
    }
}
