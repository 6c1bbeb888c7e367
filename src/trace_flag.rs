//! TraceFlag reconciliation
//!
//! Makes sure the debug user has a USER_DEBUG trace flag covering the next
//! trace window. The org allows one active USER_DEBUG flag per user, so an
//! existing flag that is still active (or expired within the guard period)
//! is never touched. Otherwise the tool's own flag is refreshed in place, or
//! a new one is created against the tool's DebugLevel, which is itself
//! created on first use.

use crate::api::{decode_records, soql_literal, SalesforceApi};
use crate::config::ExtractorConfig;
use crate::errors::{ExtractorError, ExtractorResult};
use crate::models::{
    DebugLevelPayload, IdRecord, LogType, TraceFlagCreatePayload, TraceFlagPatchPayload,
    TraceFlagRecord,
};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info, warn};

pub const TRACE_FLAG_SOBJECT: &str = "TraceFlag";
pub const DEBUG_LEVEL_SOBJECT: &str = "DebugLevel";

/// What the reconciler decided from the existing flags alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFlagPlan {
    /// A USER_DEBUG flag is still inside its window plus the guard
    LeaveActive {
        trace_flag_id: String,
        debug_level_name: Option<String>,
        expires: DateTime<Utc>,
    },
    /// The tool's own flag exists and gets a new window
    Refresh { trace_flag_id: String },
    Create,
}

/// Outcome of a successful reconciliation. Failures surface as
/// [`ExtractorError::DebugLevelCreate`] or [`ExtractorError::TraceFlagSubmit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFlagOutcome {
    LeftUntouched {
        trace_flag_id: String,
        expires: DateTime<Utc>,
    },
    Created {
        trace_flag_id: Option<String>,
        debug_level_id: String,
        expires: DateTime<Utc>,
    },
    Patched {
        trace_flag_id: String,
        expires: DateTime<Utc>,
    },
}

impl fmt::Display for TraceFlagOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceFlagOutcome::LeftUntouched { trace_flag_id, expires } => {
                write!(f, "left untouched (active flag {trace_flag_id} expires {expires})")
            }
            TraceFlagOutcome::Created { trace_flag_id, expires, .. } => write!(
                f,
                "created {} (expires {expires})",
                trace_flag_id.as_deref().unwrap_or("new trace flag")
            ),
            TraceFlagOutcome::Patched { trace_flag_id, expires } => {
                write!(f, "patched {trace_flag_id} (expires {expires})")
            }
        }
    }
}

/// Pure decision over the flags returned for the debug user.
pub fn plan(records: &[TraceFlagRecord], now: DateTime<Utc>, config: &ExtractorConfig) -> TraceFlagPlan {
    let guard = config.active_guard();

    if let Some(active) = records
        .iter()
        .find(|r| r.log_type == LogType::UserDebug && now - r.expiration_date < guard)
    {
        return TraceFlagPlan::LeaveActive {
            trace_flag_id: active.id.clone(),
            debug_level_name: active.debug_level_name().map(str::to_string),
            expires: active.expiration_date,
        };
    }

    match records
        .iter()
        .find(|r| r.debug_level_name() == Some(config.debug_level_name.as_str()))
    {
        Some(own) => TraceFlagPlan::Refresh {
            trace_flag_id: own.id.clone(),
        },
        None => TraceFlagPlan::Create,
    }
}

pub struct TraceFlagReconciler<'a, A: SalesforceApi + ?Sized> {
    api: &'a A,
    config: &'a ExtractorConfig,
}

impl<'a, A: SalesforceApi + ?Sized> TraceFlagReconciler<'a, A> {
    pub fn new(api: &'a A, config: &'a ExtractorConfig) -> Self {
        Self { api, config }
    }

    pub fn ensure_trace_flag(&self, username: &str) -> ExtractorResult<TraceFlagOutcome> {
        self.ensure_trace_flag_at(username, Utc::now())
    }

    /// Reconcile as if the current time were `now`.
    pub fn ensure_trace_flag_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> ExtractorResult<TraceFlagOutcome> {
        if username.trim().is_empty() {
            return Err(ExtractorError::usage("debug username is required for trace flag setup"));
        }

        let records = self.existing_trace_flags(username)?;
        debug!(username, count = records.len(), "existing trace flags");

        let expires = now + self.config.trace_window();

        match plan(&records, now, self.config) {
            TraceFlagPlan::LeaveActive {
                trace_flag_id,
                debug_level_name,
                expires,
            } => {
                info!(
                    username,
                    trace_flag_id = %trace_flag_id,
                    debug_level = debug_level_name.as_deref().unwrap_or("unknown"),
                    %expires,
                    "TraceFlag still active, not resetting"
                );
                Ok(TraceFlagOutcome::LeftUntouched { trace_flag_id, expires })
            }
            TraceFlagPlan::Refresh { trace_flag_id } => {
                info!(username, trace_flag_id = %trace_flag_id, "refreshing TraceFlag window");
                let payload = TraceFlagPatchPayload {
                    start_date: now,
                    expiration_date: expires,
                };
                let body = serde_json::to_value(&payload)?;

                match self
                    .api
                    .patch_tooling_record(TRACE_FLAG_SOBJECT, &trace_flag_id, &body)
                {
                    Ok(None) => {}
                    Ok(Some(result)) if result.is_success() => {}
                    Ok(Some(result)) => {
                        return Err(ExtractorError::TraceFlagSubmit {
                            username: username.to_string(),
                            response: format!("{result:?}"),
                        })
                    }
                    Err(e) => {
                        return Err(ExtractorError::TraceFlagSubmit {
                            username: username.to_string(),
                            response: e.to_string(),
                        })
                    }
                }

                info!(username, trace_flag_id = %trace_flag_id, %expires, "TraceFlag refreshed");
                Ok(TraceFlagOutcome::Patched { trace_flag_id, expires })
            }
            TraceFlagPlan::Create => {
                info!(username, "no TraceFlag found, checking DebugLevel {}", self.config.debug_level_name);
                let debug_level_id = self.ensure_debug_level()?;
                let traced_entity_id = self.user_id(username)?;

                let payload = TraceFlagCreatePayload {
                    start_date: now,
                    expiration_date: expires,
                    levels: self.config.trace_flag_levels.clone(),
                    debug_level_id: debug_level_id.clone(),
                    traced_entity_id,
                    log_type: LogType::UserDebug,
                };
                let body = serde_json::to_value(&payload)?;

                let result = self
                    .api
                    .create_tooling_record(TRACE_FLAG_SOBJECT, &body)
                    .map_err(|e| ExtractorError::TraceFlagSubmit {
                        username: username.to_string(),
                        response: e.to_string(),
                    })?;
                if !result.is_success() {
                    return Err(ExtractorError::TraceFlagSubmit {
                        username: username.to_string(),
                        response: format!("{result:?}"),
                    });
                }

                info!(username, trace_flag_id = ?result.id, %expires, "TraceFlag set");
                Ok(TraceFlagOutcome::Created {
                    trace_flag_id: result.id,
                    debug_level_id,
                    expires,
                })
            }
        }
    }

    fn existing_trace_flags(&self, username: &str) -> ExtractorResult<Vec<TraceFlagRecord>> {
        let soql = format!(
            "SELECT Id, ApexCode, ApexProfiling, Callout, Database, DebugLevel.DeveloperName, \
             ExpirationDate, StartDate, System, TracedEntity.UserName, Validation, Visualforce, \
             Workflow, LogType FROM TraceFlag WHERE TracedEntity.UserName={}",
            soql_literal(username)
        );
        let response = self.api.tooling_query(&soql)?;
        Ok(decode_records::<TraceFlagRecord>(response, "TraceFlag query")?.records)
    }

    /// Id of the tool's DebugLevel, creating it when the org has none.
    fn ensure_debug_level(&self) -> ExtractorResult<String> {
        let name = &self.config.debug_level_name;
        let soql = format!(
            "SELECT Id FROM DebugLevel WHERE DeveloperName = {}",
            soql_literal(name)
        );
        let found = decode_records::<IdRecord>(self.api.tooling_query(&soql)?, "DebugLevel query")?;

        if let Some(existing) = found.records.into_iter().next() {
            debug!(debug_level_id = %existing.id, "found DebugLevel");
            return Ok(existing.id);
        }

        info!("DebugLevel {name} not found, creating");
        let payload = DebugLevelPayload {
            developer_name: name.clone(),
            master_label: name.clone(),
            levels: self.config.debug_level_levels.clone(),
        };
        let body = serde_json::to_value(&payload)?;

        let result = self
            .api
            .create_tooling_record(DEBUG_LEVEL_SOBJECT, &body)
            .map_err(|e| ExtractorError::DebugLevelCreate {
                name: name.clone(),
                response: e.to_string(),
            })?;

        match (result.is_success(), result.id.clone()) {
            (true, Some(id)) => {
                info!(debug_level_id = %id, "created DebugLevel {name}");
                Ok(id)
            }
            _ => Err(ExtractorError::DebugLevelCreate {
                name: name.clone(),
                response: format!("{result:?}"),
            }),
        }
    }

    /// User id for the username; empty when the org has no such user, which
    /// the TraceFlag create call then rejects.
    fn user_id(&self, username: &str) -> ExtractorResult<String> {
        let soql = format!("SELECT Id FROM User WHERE username={}", soql_literal(username));
        let users = decode_records::<IdRecord>(self.api.data_query(&soql)?, "User query")?;

        match users.records.into_iter().last() {
            Some(user) => Ok(user.id),
            None => {
                warn!(username, "no User found, TraceFlag will have no traced entity");
                Ok(String::new())
            }
        }
    }
}
