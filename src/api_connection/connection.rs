use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

use super::endpoints::{AdditiveDetail, InteractionCheckRequest, InteractionReport};
use crate::additive_normalizer::AdditiveCode;
use crate::interaction_checker::InteractionScorer;

/// Environment variable naming the scoring service base URL.
pub const API_BASE_ENV_VAR: &str = "FOODSCAN_API_BASE";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Debug)]
pub enum ScoringApiError {
    NetworkError(reqwest::Error),
    SerializationError(serde_json::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

impl fmt::Display for ScoringApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringApiError::NetworkError(err) => write!(f, "Network error: {}", err),
            ScoringApiError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
            ScoringApiError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
        }
    }
}

impl Error for ScoringApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScoringApiError::NetworkError(err) => Some(err),
            ScoringApiError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ScoringApiError {
    fn from(err: reqwest::Error) -> Self {
        ScoringApiError::NetworkError(err)
    }
}

impl From<serde_json::Error> for ScoringApiError {
    fn from(err: serde_json::Error) -> Self {
        ScoringApiError::SerializationError(err)
    }
}

/// Client for the food-scan scoring service.
#[derive(Debug, Clone)]
pub struct ScoringApi {
    base_url: String,
    client: Client,
}

impl ScoringApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// Builds a client from `FOODSCAN_API_BASE`, defaulting to the local
    /// development server when the variable is unset.
    pub fn from_env() -> Self {
        dotenv().ok();
        let base_url =
            env::var(API_BASE_ENV_VAR).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits a set of canonical codes for pairwise interaction scoring.
    pub async fn check_interactions(
        &self,
        request: &InteractionCheckRequest,
    ) -> Result<InteractionReport, ScoringApiError> {
        let url = format!("{}/interactions/check", self.base_url);
        debug!(codes = request.e_numbers.len(), "submitting interaction check");

        let response = self.client.post(&url).json(request).send().await?;

        if response.status().is_success() {
            let body = response.text().await?;
            let report = serde_json::from_str::<InteractionReport>(&body)?;
            Ok(report)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            warn!(status = %status, "interaction check rejected");
            Err(ScoringApiError::ApiError { status, error_body })
        }
    }

    /// Fetches the curated detail record for a single additive.
    pub async fn fetch_additive_detail(
        &self,
        code: &AdditiveCode,
    ) -> Result<AdditiveDetail, ScoringApiError> {
        let url = format!("{}/additives/{}", self.base_url, code.as_str());

        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            let body = response.text().await?;
            let detail = serde_json::from_str::<AdditiveDetail>(&body)?;
            Ok(detail)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            warn!(status = %status, code = code.as_str(), "additive detail lookup failed");
            Err(ScoringApiError::ApiError { status, error_body })
        }
    }
}

impl InteractionScorer for ScoringApi {
    fn check(
        &self,
        codes: &[AdditiveCode],
    ) -> impl std::future::Future<Output = Result<InteractionReport, ScoringApiError>> + Send {
        let request = InteractionCheckRequest::new(codes);
        async move { self.check_interactions(&request).await }
    }
}
