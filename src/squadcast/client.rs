//! Thin authenticated JSON client for the Squadcast REST and GraphQL API.
//!
//! Every call is a single attempt. A non-200 status becomes
//! [`ApiError::Transport`], an unparseable body becomes [`ApiError::Decode`].

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.squadcast.com";

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Build a client rooted at `base_url`. `timeout` bounds each call end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .user_agent(concat!("oncall-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with a bearer token and decode the body as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, ApiError> {
        let req = self.request(Method::GET, path).bearer_auth(token);
        self.execute(path, req).await
    }

    /// POST a JSON `body` to `path` with a bearer token and decode the body as `T`.
    pub async fn post<B, T>(&self, path: &str, token: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self
            .request(Method::POST, path)
            .bearer_auth(token)
            .json(body);
        self.execute(path, req).await
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
    }

    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        req: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = req.send().await.map_err(|source| ApiError::Network {
            path: path.to_string(),
            source,
        })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ApiError::Transport {
                path: path.to_string(),
                status,
            });
        }

        let body = resp.bytes().await.map_err(|source| ApiError::Network {
            path: path.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| {
            tracing::debug!(
                path,
                body = %String::from_utf8_lossy(&body[..body.len().min(200)]),
                "undecodable response body"
            );
            ApiError::Decode {
                path: path.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:9999/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999");
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(DEFAULT_BASE_URL, "https://api.squadcast.com");
    }
}
