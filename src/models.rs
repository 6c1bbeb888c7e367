//! Wire types for the Salesforce REST and Tooling APIs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Verbosity of one debug-log category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerbosityLevel {
    None,
    Error,
    Warn,
    Info,
    Debug,
    Fine,
    Finer,
    Finest,
}

/// Per-category verbosity, serialized with the field names the API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryLevels {
    pub apex_code: VerbosityLevel,
    pub apex_profiling: VerbosityLevel,
    pub callout: VerbosityLevel,
    pub database: VerbosityLevel,
    pub system: VerbosityLevel,
    pub validation: VerbosityLevel,
    pub visualforce: VerbosityLevel,
    pub workflow: VerbosityLevel,
}

impl CategoryLevels {
    /// Every category at the same level
    pub fn uniform(level: VerbosityLevel) -> Self {
        Self {
            apex_code: level,
            apex_profiling: level,
            callout: level,
            database: level,
            system: level,
            validation: level,
            visualforce: level,
            workflow: level,
        }
    }
}

/// Response envelope shared by the data and tooling query endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    pub total_size: u64,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

fn default_done() -> bool {
    true
}

/// Any record where only the id is of interest (User, DebugLevel lookups).
#[derive(Debug, Clone, Deserialize)]
pub struct IdRecord {
    #[serde(rename = "Id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    #[serde(rename = "USER_DEBUG")]
    UserDebug,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebugLevelRef {
    #[serde(rename = "DeveloperName")]
    pub developer_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracedEntityRef {
    #[serde(rename = "Username", alias = "UserName", default)]
    pub username: Option<String>,
}

/// A remote, time-bounded instruction to emit debug logs for a user.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceFlagRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ExpirationDate", with = "sf_datetime")]
    pub expiration_date: DateTime<Utc>,
    #[serde(rename = "StartDate", with = "sf_datetime::option", default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "LogType")]
    pub log_type: LogType,
    #[serde(rename = "DebugLevel", default)]
    pub debug_level: Option<DebugLevelRef>,
    #[serde(rename = "TracedEntity", default)]
    pub traced_entity: Option<TracedEntityRef>,
}

impl TraceFlagRecord {
    pub fn debug_level_name(&self) -> Option<&str> {
        self.debug_level.as_ref().map(|d| d.developer_name.as_str())
    }

    pub fn traced_username(&self) -> Option<&str> {
        self.traced_entity.as_ref().and_then(|t| t.username.as_deref())
    }
}

/// Body of a DebugLevel creation request.
#[derive(Debug, Clone, Serialize)]
pub struct DebugLevelPayload {
    #[serde(rename = "DeveloperName")]
    pub developer_name: String,
    #[serde(rename = "MasterLabel")]
    pub master_label: String,
    #[serde(flatten)]
    pub levels: CategoryLevels,
}

/// Body of a TraceFlag creation request.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFlagCreatePayload {
    #[serde(rename = "StartDate", with = "sf_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "ExpirationDate", with = "sf_datetime")]
    pub expiration_date: DateTime<Utc>,
    #[serde(flatten)]
    pub levels: CategoryLevels,
    #[serde(rename = "DebugLevelId")]
    pub debug_level_id: String,
    #[serde(rename = "TracedEntityId")]
    pub traced_entity_id: String,
    #[serde(rename = "LogType")]
    pub log_type: LogType,
}

/// Body of a TraceFlag refresh; only the window moves.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFlagPatchPayload {
    #[serde(rename = "StartDate", with = "sf_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "ExpirationDate", with = "sf_datetime")]
    pub expiration_date: DateTime<Utc>,
}

/// Result of a create or update call on an sObject resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl SaveResult {
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// Metadata of one retrievable debug log.
#[derive(Debug, Clone, Deserialize)]
pub struct ApexLogRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "LastModifiedDate", with = "sf_datetime")]
    pub last_modified_date: DateTime<Utc>,
    #[serde(rename = "LogLength", default)]
    pub log_length: Option<u64>,
    #[serde(rename = "Application", default)]
    pub application: Option<String>,
    #[serde(rename = "DurationMilliseconds", default)]
    pub duration_milliseconds: Option<u64>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "LogUserId", default)]
    pub log_user_id: Option<String>,
    #[serde(rename = "Operation", default)]
    pub operation: Option<String>,
    #[serde(rename = "Request", default)]
    pub request: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

/// One entry of the org limits resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrgLimit {
    #[serde(rename = "Max")]
    pub max: u64,
    #[serde(rename = "Remaining")]
    pub remaining: u64,
}

pub type OrgLimits = BTreeMap<String, OrgLimit>;

/// Salesforce datetime encoding: `2020-08-01T17:04:05.000+0000`.
pub mod sf_datetime {
    use chrono::{DateTime, FixedOffset, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    /// Accepts the offset with or without a colon, and plain RFC 3339.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::<FixedOffset>::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
