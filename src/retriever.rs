//! ApexLog retrieval
//!
//! Pulls every log of the debug user, newest first, and writes each body to
//! `{timestamp}-{id}.txt`. The first log without content aborts the pass;
//! ids are only recorded once their file is on disk.

use crate::api::{decode_records, soql_literal, SalesforceApi};
use crate::config::ExtractorConfig;
use crate::errors::{ExtractorError, ExtractorResult};
use crate::models::ApexLogRecord;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info};

pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One log written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedLog {
    pub id: String,
    pub path: PathBuf,
    pub bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalReport {
    pub logs: Vec<RetrievedLog>,
}

impl RetrievalReport {
    /// Ids in retrieval order
    pub fn ids(&self) -> Vec<String> {
        self.logs.iter().map(|l| l.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Bytes written across all retrieved logs
    pub fn total_bytes(&self) -> usize {
        self.logs.iter().map(|l| l.bytes).sum()
    }
}

/// `{timestamp in tz}-{id}.txt`
pub fn log_file_name(last_modified: DateTime<Utc>, tz: Tz, id: &str) -> String {
    format!(
        "{}-{}.txt",
        last_modified.with_timezone(&tz).format(FILENAME_TIMESTAMP_FORMAT),
        id
    )
}

pub struct LogRetriever<'a, A: SalesforceApi + ?Sized> {
    api: &'a A,
    config: &'a ExtractorConfig,
    destination: PathBuf,
}

impl<'a, A: SalesforceApi + ?Sized> LogRetriever<'a, A> {
    pub fn new(api: &'a A, config: &'a ExtractorConfig, destination: impl Into<PathBuf>) -> Self {
        Self {
            api,
            config,
            destination: destination.into(),
        }
    }

    pub fn retrieve_logs(&self, username: &str) -> ExtractorResult<RetrievalReport> {
        info!(username, "retrieving logs");
        let tz = self.config.reference_timezone()?;

        let records = self.log_records(username)?;
        if records.is_empty() {
            info!(username, "no logs found");
            return Ok(RetrievalReport::default());
        }
        info!(count = records.len(), "found logs");

        fs::create_dir_all(&self.destination).map_err(|e| {
            ExtractorError::io(format!("creating {}", self.destination.display()), e)
        })?;

        let mut report = RetrievalReport::default();
        for record in records {
            let file_name = log_file_name(record.last_modified_date, tz, &record.id);
            debug!(log_id = %record.id, file = %file_name, "fetching log body");

            let body = self.api.log_body(&record.id).map_err(|e| {
                error!(log_id = %record.id, file = %file_name, error = %e, "error saving log");
                e
            })?;
            if body.is_empty() {
                error!(log_id = %record.id, file = %file_name, "no log content");
                return Err(ExtractorError::EmptyLogBody { id: record.id });
            }

            let path = self.destination.join(&file_name);
            fs::write(&path, body.as_bytes())
                .map_err(|e| ExtractorError::io(format!("writing {}", path.display()), e))?;

            report.logs.push(RetrievedLog {
                id: record.id,
                path,
                bytes: body.len(),
            });
        }

        info!(count = report.logs.len(), dir = %self.destination.display(), "logs written");
        Ok(report)
    }

    fn log_records(&self, username: &str) -> ExtractorResult<Vec<ApexLogRecord>> {
        let soql = format!(
            "SELECT Application,DurationMilliseconds,Id,LastModifiedDate,Location,LogLength,\
             LogUserId,Operation,Request,StartTime,Status,SystemModstamp FROM ApexLog \
             WHERE LogUser.UserName = {} ORDER BY LastModifiedDate DESC",
            soql_literal(username)
        );
        let response = decode_records::<ApexLogRecord>(self.api.tooling_query(&soql)?, "ApexLog query")?;
        if response.total_size == 0 {
            return Ok(Vec::new());
        }
        if !response.done {
            debug!(
                total = response.total_size,
                returned = response.records.len(),
                "query has more pages, only the first is retrieved"
            );
        }
        Ok(response.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_uses_reference_timezone() {
        let ts = Utc.with_ymd_and_hms(2020, 8, 1, 17, 4, 5).unwrap();
        assert_eq!(
            log_file_name(ts, chrono_tz::America::Los_Angeles, "07L1"),
            "20200801-100405-07L1.txt"
        );
        assert_eq!(log_file_name(ts, chrono_tz::UTC, "07L1"), "20200801-170405-07L1.txt");
    }

    #[test]
    fn file_name_handles_standard_time() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 15, 8, 0, 0).unwrap();
        assert_eq!(
            log_file_name(ts, chrono_tz::America::Los_Angeles, "07L2"),
            "20200115-000000-07L2.txt"
        );
    }
}
