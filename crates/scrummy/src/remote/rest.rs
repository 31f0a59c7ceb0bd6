//! REST client for the GitHub v3 API.
//!
//! Every call yields a [`RestResponse`] carrying the status, parsed body,
//! requested path and method. A call only succeeds when the status matches
//! the code the operation documents; see [`RestResponse::expect`].
//! List endpoints are read through [`RestClient::get_all`], which follows
//! `Link: <...>; rel="next"` until the last page.

use reqwest::header::{HeaderMap, LINK};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::Credentials;
use crate::error::RemoteError;

/// Thin REST client rooted at a configurable API base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

/// Raw outcome of a REST call.
#[derive(Debug, Clone)]
pub struct RestResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body (`Null` when empty, a string when not JSON)
    pub body: Value,
    /// Body exactly as received
    pub raw: String,
    /// Requested path
    pub path: String,
    /// Request method
    pub method: Method,
    /// URL of the next page, from the `Link` header
    pub next: Option<String>,
}

impl RestResponse {
    /// Succeed only when the status is the documented `expected` code.
    pub fn expect(self, expected: u16) -> Result<Value, RemoteError> {
        if self.status == expected {
            Ok(self.body)
        } else {
            Err(RemoteError::UnexpectedStatus {
                method: self.method.to_string(),
                path: self.path,
                expected,
                status: self.status,
                body: self.raw,
            })
        }
    }

    /// [`Self::expect`] and decode the body.
    pub fn expect_json<T: DeserializeOwned>(self, expected: u16) -> Result<T, RemoteError> {
        let path = self.path.clone();
        let body = self.expect(expected)?;
        serde_json::from_value(body).map_err(|source| RemoteError::Decode { path, source })
    }
}

impl RestClient {
    pub(crate) fn new(client: reqwest::Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reduce an absolute API URL from a webhook payload to its path.
    ///
    /// Paths are passed through untouched, so callers may hand over either.
    pub fn path_of(url: &str) -> Result<String, RemoteError> {
        if url.starts_with('/') {
            return Ok(url.to_string());
        }
        let parsed = reqwest::Url::parse(url).map_err(|_| RemoteError::InvalidUrl(url.to_string()))?;
        Ok(parsed.path().to_string())
    }

    pub async fn get(&self, path: &str) -> Result<RestResponse, RemoteError> {
        self.send(Method::GET, path, None).await
    }

    /// GET a list endpoint and concatenate every page.
    pub async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        let mut next = Some(path.to_string());

        while let Some(path) = next.take() {
            let response = self.get(&path).await?;
            next = response
                .next
                .as_deref()
                .map(|url| self.relative(url))
                .transpose()?;
            let page: Vec<T> = response.expect_json(200)?;
            items.extend(page);
        }

        Ok(items)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<RestResponse, RemoteError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<RestResponse, RemoteError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<RestResponse, RemoteError> {
        self.send(Method::DELETE, path, None).await
    }

    /// Path and query of a pagination URL, relative to the base URL.
    fn relative(&self, url: &str) -> Result<String, RemoteError> {
        if let Some(path) = url.strip_prefix(&self.base_url) {
            return Ok(path.to_string());
        }
        let parsed = reqwest::Url::parse(url).map_err(|_| RemoteError::InvalidUrl(url.to_string()))?;
        Ok(match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        })
    }

    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<RestResponse, RemoteError> {
        let url = format!("{}{path}", self.base_url);

        let mut request: RequestBuilder = self.client.request(method.clone(), &url);
        request = self.credentials.apply(request);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let next = next_link(response.headers());
        let raw = response.text().await?;
        let body = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()))
        };

        debug!(status, "REST call completed");

        Ok(RestResponse {
            status,
            body,
            raw,
            path: path.to_string(),
            method,
            next,
        })
    }
}

/// Target of the `rel="next"` entry of a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#)
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}
