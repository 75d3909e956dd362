//! HTTP API client
//!
//! Request/response half of the backend interface: report submission and
//! artifact fetches. The long-lived update stream lives in
//! [`crate::stream`]; this client only makes ordinary one-shot calls.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::cache::ArtifactFetcher;
use crate::capture::{ReportSink, SubmitOutcome};

/// Path of the report-submission endpoint, relative to the base URL
const SUBMIT_REPORT_PATH: &str = "collect_report";

/// Path prefix of the artifact-fetch endpoint, relative to the base URL
const ARTIFACT_PATH: &str = "artifacts";

/// HTTP API call failure
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be performed
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status the caller cannot interpret
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The base URL or a derived endpoint URL is invalid
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Serialize)]
struct ReportBody<'a> {
    data: &'a str,
}

/// Client for the backend's request/response endpoints
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client rooted at a base URL
    ///
    /// Relative endpoint paths are joined onto the base, so it should end
    /// with a slash (e.g. `https://game.example/api/`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Create a client reusing an existing HTTP client
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Submit a decoded scan payload as a report
    ///
    /// The payload is opaque data from the client's point of view. The
    /// response status is folded into a [`SubmitOutcome`]; only transport
    /// failures surface as errors.
    pub async fn submit_report(&self, payload: &str) -> Result<SubmitOutcome, ClientError> {
        let url = self.base_url.join(SUBMIT_REPORT_PATH)?;

        let response = self
            .http
            .post(url)
            .json(&ReportBody { data: payload })
            .send()
            .await?;

        Ok(Self::interpret_status(response.status()))
    }

    /// Fetch an artifact body verbatim
    ///
    /// The key is issued by the server. Callers normally go through
    /// [`ArtifactCache`](crate::cache::ArtifactCache) rather than fetching
    /// directly.
    pub async fn fetch_artifact(&self, key: &str) -> Result<Bytes, ClientError> {
        let url = self.base_url.join(&format!("{ARTIFACT_PATH}/{key}"))?;

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.bytes().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn interpret_status(status: StatusCode) -> SubmitOutcome {
        if status.is_success() {
            SubmitOutcome::Accepted
        } else {
            match status {
                StatusCode::FORBIDDEN => SubmitOutcome::Forbidden,
                StatusCode::NOT_FOUND => SubmitOutcome::NotFound,
                other => SubmitOutcome::Other(other.as_u16()),
            }
        }
    }
}

#[async_trait]
impl ReportSink for ApiClient {
    async fn submit_report(&self, payload: &str) -> Result<SubmitOutcome, ClientError> {
        ApiClient::submit_report(self, payload).await
    }
}

#[async_trait]
impl ArtifactFetcher for ApiClient {
    async fn fetch(&self, key: &str) -> Result<Bytes, ClientError> {
        self.fetch_artifact(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_interpretation() {
        assert_eq!(
            ApiClient::interpret_status(StatusCode::OK),
            SubmitOutcome::Accepted
        );
        assert_eq!(
            ApiClient::interpret_status(StatusCode::CREATED),
            SubmitOutcome::Accepted
        );
        assert_eq!(
            ApiClient::interpret_status(StatusCode::FORBIDDEN),
            SubmitOutcome::Forbidden
        );
        assert_eq!(
            ApiClient::interpret_status(StatusCode::NOT_FOUND),
            SubmitOutcome::NotFound
        );
        assert_eq!(
            ApiClient::interpret_status(StatusCode::INTERNAL_SERVER_ERROR),
            SubmitOutcome::Other(500)
        );
    }

    #[test]
    fn test_endpoint_urls() {
        let client = ApiClient::new("https://game.example/api/").expect("valid base url");

        assert_eq!(
            client.base_url.join(SUBMIT_REPORT_PATH).unwrap().as_str(),
            "https://game.example/api/collect_report"
        );
        assert_eq!(
            client
                .base_url
                .join(&format!("{ARTIFACT_PATH}/shot-17"))
                .unwrap()
                .as_str(),
            "https://game.example/api/artifacts/shot-17"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("::not a url::"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
