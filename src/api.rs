//! Salesforce REST/Tooling API access
//!
//! [`SalesforceApi`] is the seam the reconciler, retriever and limit check
//! talk to. [`HttpApi`] is the blocking reqwest implementation used by the
//! binary; tests substitute an in-memory fake.

use crate::errors::{ExtractorError, ExtractorResult};
use crate::models::{OrgLimits, QueryResponse, SaveResult};
use crate::session::Session;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub trait SalesforceApi {
    /// SOQL against `/tooling/query/`
    fn tooling_query(&self, soql: &str) -> ExtractorResult<QueryResponse<Value>>;

    /// SOQL against the data `/query` endpoint
    fn data_query(&self, soql: &str) -> ExtractorResult<QueryResponse<Value>>;

    /// POST to `/tooling/sobjects/{sobject}`
    fn create_tooling_record(&self, sobject: &str, body: &Value) -> ExtractorResult<SaveResult>;

    /// PATCH `/tooling/sobjects/{sobject}/{id}`. `None` when the server
    /// answers 2xx without a JSON save result.
    fn patch_tooling_record(
        &self,
        sobject: &str,
        id: &str,
        body: &Value,
    ) -> ExtractorResult<Option<SaveResult>>;

    /// Raw text of one ApexLog body
    fn log_body(&self, log_id: &str) -> ExtractorResult<String>;

    fn limits(&self) -> ExtractorResult<OrgLimits>;
}

/// Typed helper on top of the untyped query methods.
pub fn decode_records<T: DeserializeOwned>(
    response: QueryResponse<Value>,
    context: &str,
) -> ExtractorResult<QueryResponse<T>> {
    let records = response
        .records
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| ExtractorError::serialization(context, e))?;

    Ok(QueryResponse {
        total_size: response.total_size,
        done: response.done,
        records,
    })
}

/// Quotes a value for use inside a SOQL string literal.
pub fn soql_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

pub struct HttpApi {
    client: Client,
    base: String,
}

impl HttpApi {
    pub fn new(session: &Session, api_version: &str, timeout: Duration) -> ExtractorResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", session.access_token))
            .map_err(|_| ExtractorError::auth("access token contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractorError::network("building http client", e))?;

        Ok(Self {
            client,
            base: format!("{}/services/data/v{}", session.instance_url, api_version),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> ExtractorResult<Url> {
        let raw = format!("{}{}", self.base, path);
        Url::parse(&raw).map_err(|e| ExtractorError::remote("build url", format!("{raw}: {e}")))
    }

    fn query(&self, path: &str, soql: &str) -> ExtractorResult<QueryResponse<Value>> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().append_pair("q", soql);
        debug!(%url, "query");

        let response = self.client.get(url).send()?;
        let response = ensure_success(response, "query")?;
        response
            .json::<QueryResponse<Value>>()
            .map_err(|e| ExtractorError::network("decoding query response", e))
    }

    fn send_json(&self, method: Method, path: &str, body: &Value) -> ExtractorResult<String> {
        let url = self.url(path)?;
        debug!(%method, %url, "submitting record");

        let operation = format!("{method} {path}");
        let response = self.client.request(method, url).json(body).send()?;
        let response = ensure_success(response, &operation)?;
        response
            .text()
            .map_err(|e| ExtractorError::network("reading response body", e))
    }

    fn get_text(&self, path: &str, operation: &str) -> ExtractorResult<String> {
        let url = self.url(path)?;
        let response = self.client.get(url).send()?;
        let response = ensure_success(response, operation)?;
        response
            .text()
            .map_err(|e| ExtractorError::network("reading response body", e))
    }
}

fn ensure_success(response: Response, operation: &str) -> ExtractorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ExtractorError::remote(operation, format!("HTTP {status}: {body}")))
}

/// Interpretation of a 2xx create response. A blank body is `None`; anything
/// else must decode as a save result.
pub fn parse_save_response(body: &str) -> ExtractorResult<Option<SaveResult>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    // A bare `[{"message":..., "errorCode":...}]` error list is not a SaveResult.
    match serde_json::from_str::<SaveResult>(body) {
        Ok(result) => Ok(Some(result)),
        Err(_) => Ok(Some(SaveResult {
            id: None,
            success: Some(false),
            errors: vec![Value::String(body.to_string())],
        })),
    }
}

/// Interpretation of a 2xx patch response. Only a JSON object carrying a
/// `success` field is a save result; blank or non-JSON bodies are `None`.
pub fn parse_patch_response(body: &str) -> ExtractorResult<Option<SaveResult>> {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Ok(None),
    };
    if value.get("success").is_none() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ExtractorError::serialization("patch response", e))
}

impl SalesforceApi for HttpApi {
    fn tooling_query(&self, soql: &str) -> ExtractorResult<QueryResponse<Value>> {
        self.query("/tooling/query/", soql)
    }

    fn data_query(&self, soql: &str) -> ExtractorResult<QueryResponse<Value>> {
        self.query("/query", soql)
    }

    fn create_tooling_record(&self, sobject: &str, body: &Value) -> ExtractorResult<SaveResult> {
        let text = self.send_json(Method::POST, &format!("/tooling/sobjects/{sobject}"), body)?;
        Ok(parse_save_response(&text)?.unwrap_or_default())
    }

    fn patch_tooling_record(
        &self,
        sobject: &str,
        id: &str,
        body: &Value,
    ) -> ExtractorResult<Option<SaveResult>> {
        let text = self.send_json(
            Method::PATCH,
            &format!("/tooling/sobjects/{sobject}/{id}"),
            body,
        )?;
        parse_patch_response(&text)
    }

    fn log_body(&self, log_id: &str) -> ExtractorResult<String> {
        self.get_text(&format!("/sobjects/ApexLog/{log_id}/Body"), "fetch log body")
    }

    fn limits(&self) -> ExtractorResult<OrgLimits> {
        let text = self.get_text("/limits", "fetch limits")?;
        serde_json::from_str(&text).map_err(|e| ExtractorError::serialization("limits response", e))
    }
}
