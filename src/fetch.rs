//! HTTP client abstraction for talking to the poster backend
//!
//! The backend is a set of PHP-style endpoints that accept either
//! form-encoded fields or JSON bodies, and reply with a
//! `{ success, message? }` JSON envelope. Some endpoints emit leading or
//! trailing whitespace around the JSON, so every body is trimmed before
//! parsing.

use crate::error::Error;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client, Method, RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// Parse a response body as JSON, tolerating surrounding whitespace.
pub(crate) fn parse_trimmed<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let parsed = serde_json::from_str(body.trim())?;
    Ok(parsed)
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: HeaderMap,
    form_fields: Option<Vec<(String, String)>>,
    json_body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: &str, method: Method) -> Self {
        Self {
            client,
            url: url.to_string(),
            method,
            headers: HeaderMap::new(),
            form_fields: None,
            json_body: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }

    /// Send the body as `application/x-www-form-urlencoded` fields
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.form_fields = Some(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(body)?;
        self.json_body = Some(json);
        self.headers
            .insert("Content-Type", HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Build the request
    fn build(&self) -> Result<RequestBuilder, Error> {
        let url = Url::parse(&self.url)?;

        let mut req = self.client.request(self.method.clone(), url.as_str());
        req = req.headers(self.headers.clone());

        if let Some(fields) = &self.form_fields {
            req = req.form(fields);
        } else if let Some(body) = &self.json_body {
            req = req.body(body.clone());
        }

        Ok(req)
    }

    /// Execute the request and parse the response body as JSON.
    ///
    /// Non-2xx statuses are reported as general errors carrying the status
    /// and body text; a body that is not valid JSON (after trimming) is a
    /// JSON error, never a panic.
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let text = self.execute_text().await?;
        parse_trimmed(&text)
    }

    /// Execute the request and return the raw body text.
    ///
    /// Used by the plain-text endpoints (user registration) and by callers
    /// that need to parse the body themselves.
    pub async fn execute_text(&self) -> Result<String, Error> {
        let req = self.build()?;
        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%status, url = %self.url, "request failed");
            return Err(Error::general(format!(
                "Request failed with status {}: {}",
                status, text
            )));
        }

        Ok(text)
    }
}

/// Helper for creating HTTP requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::GET)
    }

    /// Create a POST request
    pub fn post<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::POST)
    }
}
