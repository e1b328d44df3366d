//! HTTP transport built on reqwest.
//!
//! This module provides functionality for building and configuring the HTTP
//! client bound elements fetch through:
//! - Timeout settings
//! - User agent customization
//! - Form-encoded POST bodies
//!
//! Requests are not retried; a failed request surfaces as a
//! [`TransportError`] and the caller decides what to do with it.
//!
//! # Example
//! ```ignore
//! use xbind_config::http::{HttpClientParams, HttpTransport};
//!
//! let config: toml::Value = toml::from_str(r#"
//! [http]
//! timeout = 30
//! connect_timeout = 10
//! user_agent = "dashboard/1.0"
//! "#).unwrap();
//!
//! let params = HttpClientParams::from_config(&config["http"]).unwrap();
//! let transport = HttpTransport::from_params(&params).unwrap();
//! ```
use crate::{ConfigError, Transport, TransportError};
use async_trait::async_trait;
use derive_builder::Builder;
use std::time::Duration;
use tracing::debug;

pub fn default_user_agent() -> String {
    format!("xbind/{}", env!("CARGO_PKG_VERSION"))
}

/// Parameters for configuring an HTTP client.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(public, setter(into))]
pub struct HttpClientParams {
    /// Whole-request timeout, seconds
    #[builder(default = "30")]
    pub timeout: u64,
    /// Connect timeout, seconds
    #[builder(default = "10")]
    pub connect_timeout: u64,
    #[builder(default = "default_user_agent()")]
    pub user_agent: String,
}

impl Default for HttpClientParams {
    fn default() -> Self {
        Self {
            timeout: 30,
            connect_timeout: 10,
            user_agent: default_user_agent(),
        }
    }
}

impl HttpClientParams {
    /// Creates an HttpClientParams instance from the `[http]` table.
    ///
    /// ```toml
    /// [http]
    /// timeout = 30
    /// connect_timeout = 10
    /// user_agent = "dashboard/1.0"
    /// ```
    ///
    /// Absent fields fall back to the defaults, fields of the wrong type are
    /// reported as [`ConfigError::Missing`].
    pub fn from_config(http_config: &toml::Value) -> Result<Self, ConfigError> {
        let mut params = Self::default();

        if let Some(timeout) = read_secs(http_config, "timeout")? {
            params.timeout = timeout;
        }
        if let Some(connect_timeout) = read_secs(http_config, "connect_timeout")? {
            params.connect_timeout = connect_timeout;
        }
        if let Some(value) = http_config.get("user_agent") {
            params.user_agent = value
                .as_str()
                .ok_or_else(|| ConfigError::Missing("http.user_agent".to_string()))?
                .to_string();
        }

        Ok(params)
    }
}

fn read_secs(config: &toml::Value, field: &str) -> Result<Option<u64>, ConfigError> {
    match config.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .and_then(|secs| u64::try_from(secs).ok())
            .map(Some)
            .ok_or_else(|| ConfigError::Missing(format!("http.{field}"))),
    }
}

/// Builds a reqwest client with the TLS, timeout and user agent settings.
pub fn build_http_client(
    params: &HttpClientParams,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .timeout(Duration::from_secs(params.timeout))
        .connect_timeout(Duration::from_secs(params.connect_timeout))
        .user_agent(params.user_agent.as_str())
        .build()
}

/// [`Transport`] over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_params(params: &HttpClientParams) -> Result<Self, TransportError> {
        Ok(Self::new(build_http_client(params)?))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

async fn read_text(
    url: &str,
    response: reqwest::Response,
) -> Result<String, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;
        read_text(url, response).await
    }

    async fn post(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, TransportError> {
        debug!(url, fields = fields.len(), "POST");
        let response = self.client.post(url).form(fields).send().await?;
        read_text(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP_CONF: &str = r#"
    [http]
    timeout = 5
    connect_timeout = 2
    user_agent = "test-agent/1.0"
    "#;

    #[test]
    fn test_build_client() {
        let client = build_http_client(&HttpClientParams::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_params_from_config() {
        let config: toml::Value = toml::from_str(HTTP_CONF).unwrap();
        let params = HttpClientParams::from_config(&config["http"]).unwrap();

        assert_eq!(params.timeout, 5);
        assert_eq!(params.connect_timeout, 2);
        assert_eq!(params.user_agent, "test-agent/1.0");
    }

    #[test]
    fn test_params_defaults_for_absent_fields() {
        let config: toml::Value = toml::from_str("[http]\ntimeout = 7").unwrap();
        let params = HttpClientParams::from_config(&config["http"]).unwrap();

        assert_eq!(params.timeout, 7);
        assert_eq!(params.connect_timeout, 10);
        assert!(params.user_agent.starts_with("xbind/"));
    }

    #[test]
    fn test_params_wrong_type() {
        let config: toml::Value =
            toml::from_str("[http]\ntimeout = \"soon\"").unwrap();
        let result = HttpClientParams::from_config(&config["http"]);
        assert!(matches!(result, Err(ConfigError::Missing(field)) if field == "http.timeout"));

        let config: toml::Value = toml::from_str("[http]\ntimeout = -1").unwrap();
        assert!(HttpClientParams::from_config(&config["http"]).is_err());
    }

    #[test]
    fn test_params_builder() {
        let params = HttpClientParamsBuilder::default()
            .timeout(1u64)
            .user_agent("builder")
            .build()
            .unwrap();

        assert_eq!(params.timeout, 1);
        assert_eq!(params.connect_timeout, 10);
        assert_eq!(params.user_agent, "builder");
    }
}
