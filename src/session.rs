//! Session bootstrap from the sfdx CLI's cached org authorization

use crate::errors::{ExtractorError, ExtractorResult};
use crate::process::{display_command, ProcessRunner};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Authorized session for one target org. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub instance_url: String,
    pub client_id: String,
    pub username: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("instance_url", &self.instance_url)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OrgDisplayResponse {
    result: Option<OrgDisplayResult>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgDisplayResult {
    access_token: Option<String>,
    instance_url: Option<String>,
    client_id: Option<String>,
    username: Option<String>,
}

impl Session {
    /// Runs `sfdx force:org:display --targetusername=<target> --json`.
    pub fn bootstrap<R: ProcessRunner + ?Sized>(
        runner: &R,
        cli_binary: &str,
        target_username: &str,
    ) -> ExtractorResult<Session> {
        let args = vec![
            "force:org:display".to_string(),
            format!("--targetusername={target_username}"),
            "--json".to_string(),
        ];
        debug!(command = %display_command(cli_binary, &args), "retrieving org authorization");

        let output = runner
            .run(cli_binary, &args)
            .map_err(|e| ExtractorError::auth(format!("sfdx auth retrieval failed: {e}")))?;

        let session = Self::from_org_display(&output.stdout)?;
        debug!(
            instance_url = %session.instance_url,
            client_id = %session.client_id,
            username = ?session.username,
            "session established"
        );
        Ok(session)
    }

    /// Parses the JSON printed by `force:org:display --json`.
    pub fn from_org_display(stdout: &str) -> ExtractorResult<Session> {
        let response: OrgDisplayResponse = serde_json::from_str(stdout.trim())
            .map_err(|e| ExtractorError::auth(format!("unreadable org display output: {e}")))?;

        let result = response.result.ok_or_else(|| {
            ExtractorError::auth(format!(
                "no result found in response: {}",
                response.message.as_deref().unwrap_or("no message")
            ))
        })?;

        let access_token = required(result.access_token, "accessToken")?;
        let instance_url = required(result.instance_url, "instanceUrl")?;
        let client_id = required(result.client_id, "clientId")?;

        Ok(Session {
            access_token,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            client_id,
            username: result.username,
        })
    }
}

fn required(value: Option<String>, field: &str) -> ExtractorResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ExtractorError::auth(format!("no {field} found in org authorization"))),
    }
}
