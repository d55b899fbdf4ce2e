use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Patch => write!(f, "PATCH"),
        }
    }
}

/// Sends one request to the controller and returns the decoded response.
///
/// Implementations fail on non-2xx responses and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, path: &str, method: Method, data: Option<&Value>) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub use_ssl: bool,
    pub validate_certs: bool,
    pub timeout: Duration,
    /// Sent as a bearer token when present. Obtaining it is up to the caller.
    pub token: Option<String>,
}

impl HttpConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{}://{}:{}/mso/api/v1/", scheme, self.host, port),
            None => format!("{}://{}/mso/api/v1/", scheme, self.host),
        }
    }
}

/// [`Transport`] over the orchestrator's REST API.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(Error::Client)?;
        Ok(HttpTransport {
            client,
            base_url: config.base_url(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, path: &str, method: Method, data: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        debug!(%method, %url, "sending request");

        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Patch => self.client.patch(&url),
        };
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(data) = data {
            request = request.json(data);
        }

        let http_error = |source| Error::Http {
            method,
            path: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        let body = response.text().await.map_err(http_error)?;
        debug!(%method, %url, status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(Error::Transport {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        decode_body(path, &body)
    }
}

/// An empty body decodes to an empty object.
fn decode_body(path: &str, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(body).map_err(|source| Error::Json {
        context: format!("response from {}", path),
        source,
    })
}

/// The controller's own error message, if the body carries one.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["message", "error", "errors", "info"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}
