use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::EtaError;
use super::types::{DistanceMatrixRequest, DistanceMatrixResponse};

/// Public Google Distance Matrix endpoint.
pub const API_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can answer a distance-matrix query.
#[allow(async_fn_in_trait)]
pub trait RouteProvider {
    async fn distance_matrix(
        &self,
        req: &DistanceMatrixRequest,
    ) -> Result<DistanceMatrixResponse, EtaError>;
}

/// HTTP client for the Google Distance Matrix API.
pub struct DistanceMatrixClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl DistanceMatrixClient {
    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, EtaError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }
}

impl RouteProvider for DistanceMatrixClient {
    async fn distance_matrix(
        &self,
        req: &DistanceMatrixRequest,
    ) -> Result<DistanceMatrixResponse, EtaError> {
        if self.api_key.is_empty() {
            return Err(EtaError::MissingApiKey);
        }

        debug!(origin = %req.origin, destination = %req.destination, "requesting travel time");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", req.origin.as_str()),
                ("destinations", req.destination.as_str()),
                ("departure_time", req.departure_time.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EtaError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<DistanceMatrixResponse>().await?;
        Ok(body)
    }
}
