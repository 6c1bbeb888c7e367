// Extractor configuration
// All fixed policy (API version, windows, verbosity tables, timezone) lives here

use crate::errors::{ExtractorError, ExtractorResult};
use crate::models::{CategoryLevels, VerbosityLevel};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// REST API version without the leading `v`
    pub api_version: String,
    /// External CLI used for session lookup and bulk delete
    pub cli_binary: String,
    /// DeveloperName of the DebugLevel this tool owns
    pub debug_level_name: String,
    /// A USER_DEBUG flag that expired less than this long ago is left alone
    pub active_guard_minutes: i64,
    /// Length of a freshly created or refreshed trace window
    pub trace_window_minutes: i64,
    /// IANA zone used for log filenames
    pub timezone: String,
    pub request_timeout_secs: u64,
    pub bulk_delete_wait_minutes: u32,
    pub log_root: PathBuf,
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default = "default_debug_level_levels")]
    pub debug_level_levels: CategoryLevels,
    #[serde(default = "default_trace_flag_levels")]
    pub trace_flag_levels: CategoryLevels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Used fraction above which a limit is reported as a warning
    pub warn_threshold: f64,
    pub names: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            warn_threshold: 0.50,
            names: vec![
                "DailyApiRequests".to_string(),
                "DailyAsyncApexExecutions".to_string(),
                "DailyBulkApiRequests".to_string(),
                "DailyStreamingApiEvents".to_string(),
            ],
        }
    }
}

fn default_debug_level_levels() -> CategoryLevels {
    CategoryLevels::uniform(VerbosityLevel::Finest)
}

fn default_trace_flag_levels() -> CategoryLevels {
    CategoryLevels {
        apex_code: VerbosityLevel::Finest,
        apex_profiling: VerbosityLevel::Finest,
        callout: VerbosityLevel::Finest,
        database: VerbosityLevel::Finest,
        system: VerbosityLevel::Fine,
        validation: VerbosityLevel::Info,
        visualforce: VerbosityLevel::Finer,
        workflow: VerbosityLevel::Finer,
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            api_version: "49.0".to_string(),
            cli_binary: "sfdx".to_string(),
            debug_level_name: "SFDXDebugLevel".to_string(),
            active_guard_minutes: 15,
            trace_window_minutes: 30,
            timezone: "America/Los_Angeles".to_string(),
            request_timeout_secs: 60,
            bulk_delete_wait_minutes: 5,
            log_root: PathBuf::from("logs"),
            backup_dir: PathBuf::from("backup"),
            limits: LimitsConfig::default(),
            debug_level_levels: default_debug_level_levels(),
            trace_flag_levels: default_trace_flag_levels(),
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> ExtractorResult<()> {
        if self.api_version.trim().is_empty() {
            return Err(ExtractorError::config("api_version cannot be empty"));
        }
        if self.debug_level_name.trim().is_empty() {
            return Err(ExtractorError::config("debug_level_name cannot be empty"));
        }
        if self.cli_binary.trim().is_empty() {
            return Err(ExtractorError::config("cli_binary cannot be empty"));
        }
        if self.trace_window_minutes <= 0 {
            return Err(ExtractorError::config("trace_window_minutes must be positive"));
        }
        if self.active_guard_minutes < 0 {
            return Err(ExtractorError::config("active_guard_minutes cannot be negative"));
        }
        if !(0.0..=1.0).contains(&self.limits.warn_threshold) {
            return Err(ExtractorError::config("limits.warn_threshold must be within 0..=1"));
        }
        self.reference_timezone()?;
        Ok(())
    }

    pub fn reference_timezone(&self) -> ExtractorResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ExtractorError::config(format!("unknown timezone {}: {}", self.timezone, e)))
    }

    pub fn active_guard(&self) -> Duration {
        Duration::minutes(self.active_guard_minutes)
    }

    pub fn trace_window(&self) -> Duration {
        Duration::minutes(self.trace_window_minutes)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// `{log_root}/{debug_username}`
    pub fn log_dir_for(&self, debug_username: &str) -> PathBuf {
        self.log_root.join(debug_username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ExtractorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.trace_window(), Duration::minutes(30));
        assert_eq!(cfg.active_guard(), Duration::minutes(15));
        assert_eq!(cfg.reference_timezone().unwrap(), chrono_tz::America::Los_Angeles);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let cfg = ExtractorConfig {
            timezone: "Mars/Olympus_Mons".into(),
            ..ExtractorConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("unknown timezone"));
    }

    #[test]
    fn zero_window_is_rejected() {
        let cfg = ExtractorConfig {
            trace_window_minutes: 0,
            ..ExtractorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn log_dir_is_per_debug_user() {
        let cfg = ExtractorConfig::default();
        assert_eq!(
            cfg.log_dir_for("debug@example.com"),
            PathBuf::from("logs").join("debug@example.com")
        );
    }
}
