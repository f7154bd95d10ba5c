//! Upstash-compatible Redis REST client.
//!
//! Single commands are `POST {url}` with the argument array as JSON body;
//! pipelines are `POST {url}/pipeline` with an array of argument arrays. Each
//! result is `{"result": ..}` or `{"error": ".."}`.

use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::RemoteStore;
use super::command::{Command, Reply};
use super::error::{StoreError, StoreResult};

const RETRY_BACKOFF: Duration = Duration::from_millis(100);
const MAX_ERROR_BODY: usize = 256;

#[derive(Clone)]
/// Redis over HTTPS (Upstash REST protocol).
pub struct RestStore {
    http: HttpClient,
    url: String,
    token: String,
    retries: u32,
}

impl RestStore {
    /// Creates a client for `url` authenticated with `token`.
    ///
    /// `timeout` applies per HTTP request; transient failures are retried
    /// `retries` times.
    pub fn new(url: &str, token: &str, timeout: Duration, retries: u32) -> StoreResult<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retries,
        })
    }

    /// Returns the configured endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, url: &str, body: &Value) -> StoreResult<Value> {
        let mut attempt = 0u32;
        loop {
            match self.post_once(url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    debug!(attempt, error = %e, "Retrying store request");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once(&self, url: &str, body: &Value) -> StoreResult<Value> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| StoreError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        parse_body(status, text)
    }
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("url", &self.url)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

pub(crate) fn parse_body(status: StatusCode, text: String) -> StoreResult<Value> {
    match serde_json::from_str::<Value>(&text) {
        // Command errors come back as 4xx with an `error` field; keep them so the
        // caller can attribute the failure to the command.
        Ok(value) if status.is_success() || value.get("error").is_some() => Ok(value),
        Ok(_) => Err(status_error(status, text)),
        Err(_) if !status.is_success() => Err(status_error(status, text)),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

fn status_error(status: StatusCode, mut body: String) -> StoreError {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    StoreError::Status {
        status: status.as_u16(),
        body,
    }
}

pub(crate) fn decode_result(command: &'static str, value: Value) -> StoreResult<Reply> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(StoreError::Decode(format!(
                "{command}: expected an object, got {other}"
            )));
        }
    };

    if let Some(error) = fields.remove("error") {
        let message = match error {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(StoreError::Command { command, message });
    }

    match fields.remove("result") {
        Some(result) => Ok(Reply::from_json(result)),
        None => Err(StoreError::Decode(format!("{command}: missing 'result'"))),
    }
}

impl RemoteStore for RestStore {
    fn name(&self) -> &'static str {
        "upstash-rest"
    }

    async fn execute(&self, command: Command) -> StoreResult<Reply> {
        let body = Value::from(command.to_args());
        let value = self.post(&self.url, &body).await?;
        decode_result(command.name(), value)
    }

    async fn pipeline(&self, commands: Vec<Command>) -> StoreResult<Vec<StoreResult<Reply>>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let body = Value::Array(
            commands
                .iter()
                .map(|c| Value::from(c.to_args()))
                .collect(),
        );
        let url = format!("{}/pipeline", self.url);

        let Value::Array(results) = self.post(&url, &body).await? else {
            return Err(StoreError::Decode(
                "pipeline response is not an array".to_string(),
            ));
        };

        if results.len() != commands.len() {
            return Err(StoreError::Decode(format!(
                "pipeline returned {} results for {} commands",
                results.len(),
                commands.len()
            )));
        }

        Ok(commands
            .iter()
            .zip(results)
            .map(|(command, value)| decode_result(command.name(), value))
            .collect())
    }
}
