//! HTTP client for a running shardcache router

use crate::common::{Error, Result};
use crate::router::http::{CacheResponse, ErrorResponse, HealthResponse, SetRequest};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;
use std::time::Duration;

/// Characters escaped in a key path segment
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b'"');

/// Encode a key as a single URL path segment
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/cache/{}", self.base_url, encode_key(key))
    }

    pub async fn get(&self, key: &str) -> Result<String> {
        let resp = self.http.get(self.key_url(key)).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(error_from(resp, key).await);
        }
        let body: CacheResponse = resp.json().await?;
        Ok(body.value)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let resp = self
            .http
            .put(self.key_url(key))
            .json(&SetRequest {
                value: value.to_string(),
            })
            .send()
            .await?;
        if resp.status() != StatusCode::CREATED {
            return Err(error_from(resp, key).await);
        }
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let resp = self.http.delete(self.key_url(key)).send().await?;
        if resp.status() != StatusCode::NO_CONTENT {
            return Err(error_from(resp, key).await);
        }
        Ok(())
    }

    /// Cluster health. An unhealthy cluster is still `Ok`, with status "unhealthy".
    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        match resp.status() {
            StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE => Ok(resp.json().await?),
            status => Err(Error::Http(format!("unexpected health status {}", status))),
        }
    }
}

/// Rebuild a domain error from an error reply.
async fn error_from(resp: reqwest::Response, key: &str) -> Error {
    let status = resp.status();
    let body: Option<ErrorResponse> = resp.json().await.ok();
    let error = body.map(|b| b.error).unwrap_or_default();

    match (status, error.as_str()) {
        (StatusCode::NOT_FOUND, "key not found") => Error::KeyNotFound(key.to_string()),
        (StatusCode::BAD_REQUEST, "invalid key") => Error::InvalidKey,
        (StatusCode::BAD_REQUEST, "invalid value") => Error::InvalidValue,
        (StatusCode::SERVICE_UNAVAILABLE, "no nodes available") => Error::NoNodesAvailable,
        (StatusCode::SERVICE_UNAVAILABLE, "client not found") => {
            Error::ClientNotFound(String::new())
        }
        (StatusCode::SERVICE_UNAVAILABLE, _) => Error::CacheUnavailable(error),
        (StatusCode::REQUEST_TIMEOUT, _) => Error::Timeout(format!("server timeout for {}", key)),
        _ if error.is_empty() => Error::Http(format!("status {}", status)),
        _ => Error::Http(format!("status {}: {}", status, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("simple"), "simple");
        assert_eq!(encode_key("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_key("100%"), "100%25");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = HttpClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.key_url("k"), "http://localhost:8080/cache/k");
    }
}
