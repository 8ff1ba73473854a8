use std::time::Duration;

use reqwest::{
    self,
    blocking,
    header::{self, HeaderMap, HeaderValue},
};
use serde::de::IgnoredAny;
use thiserror::Error;

use crate::config::ScraperConfig;

/// Custom error type for HTTP requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Network error for {0}: {1}")]
    NetworkError(String, String),
    #[error("HTTP error for {0}: status {1}. Response body: {2}")]
    HttpError(reqwest::Url, u16, String),
    #[error("Error parsing JSON from {0}: {1}")]
    ParseError(String, String),
    #[error("Invalid request: {0}")]
    Other(String),
}

/// Blocking HTTP client carrying the browser-like header set the API expects.
pub struct Client {
    inner: blocking::Client,
}

impl Client {
    pub fn new(config: &ScraperConfig) -> Result<Self, RequestError> {
        let inner = blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers())
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RequestError::Other(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Issues a GET and returns the raw body once it is known to be valid JSON.
    /// The client's timeout covers the whole exchange, body included.
    pub fn get_json_bytes(
        &self,
        url: &str,               // Absolute URL.
        params: &[(&str, &str)], // Query parameters.
    ) -> Result<Vec<u8>, RequestError> {
        self.fetch(url, params, None)
    }

    /// Like `get_json_bytes`, with a total timeout for this request only.
    pub fn get_json_bytes_within(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Vec<u8>, RequestError> {
        self.fetch(url, params, Some(timeout))
    }

    fn fetch(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, RequestError> {
        let url = if params.is_empty() {
            reqwest::Url::parse(url)
        } else {
            reqwest::Url::parse_with_params(url, params)
        }
        .map_err(|e| RequestError::Other(format!("{}: {}", url, e)))?;

        log::debug!("GET {}", url);
        let mut request = self.inner.get(url.clone());
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .map_err(|e| RequestError::NetworkError(url.to_string(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .map_err(|e| RequestError::NetworkError(url.to_string(), e.to_string()))?;
            return Err(RequestError::HttpError(url, status.as_u16(), body));
        }

        let body = response
            .bytes()
            .map_err(|e| RequestError::NetworkError(url.to_string(), e.to_string()))?
            .to_vec();

        // Reject non-JSON bodies here so they never reach the cache.
        serde_json::from_slice::<IgnoredAny>(&body)
            .map_err(|e| RequestError::ParseError(url.to_string(), e.to_string()))?;
        Ok(body)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_static("https://www.nasdaq.com"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://www.nasdaq.com/"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client() -> Client {
        Client::new(&ScraperConfig::default()).unwrap()
    }

    #[test]
    fn sends_browser_headers_and_params() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/amd/option-chain")
                .query_param("assetclass", "stocks")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header_exists("User-Agent");
            then.status(200).body(r#"{"data":{}}"#);
        });

        let body = client()
            .get_json_bytes(&server.url("/amd/option-chain"), &[("assetclass", "stocks")])
            .unwrap();

        mock.assert();
        assert_eq!(body, br#"{"data":{}}"#.to_vec());
    }

    #[test]
    fn non_success_status_is_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not here");
        });

        let err = client()
            .get_json_bytes(&server.url("/missing"), &[])
            .unwrap_err();
        match err {
            RequestError::HttpError(_, status, body) => {
                assert_eq!(status, 404);
                assert_eq!(body, "not here");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html></html>");
        });

        let err = client().get_json_bytes(&server.url("/html"), &[]).unwrap_err();
        assert!(matches!(err, RequestError::ParseError(..)));
    }

    #[test]
    fn per_request_timeout_overrides_client_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(600))
                .body(r#"{"data":{}}"#);
        });
        let client = Client::new(&ScraperConfig {
            timeout: Duration::from_millis(200),
            ..ScraperConfig::default()
        })
        .unwrap();

        let err = client.get_json_bytes(&server.url("/slow"), &[]).unwrap_err();
        assert!(matches!(err, RequestError::NetworkError(..)));

        let body = client
            .get_json_bytes_within(&server.url("/slow"), &[], Duration::from_secs(5))
            .unwrap();
        assert_eq!(body, br#"{"data":{}}"#.to_vec());
    }

    #[test]
    fn refused_connection_is_network_error() {
        // Port 9 (discard) is not expected to be listening locally.
        let err = client()
            .get_json_bytes("http://127.0.0.1:9/amd", &[])
            .unwrap_err();
        assert!(matches!(err, RequestError::NetworkError(..)));
    }
}
