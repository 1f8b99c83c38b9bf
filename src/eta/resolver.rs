use super::client::RouteProvider;
use super::error::EtaError;
use super::types::DistanceMatrixRequest;

/// Per-pair status the provider uses for a successful route.
const STATUS_OK: &str = "OK";

/// Turns provider answers into whole-minute travel estimates.
pub struct EtaResolver;

impl EtaResolver {
    /// Current-traffic travel time from `origin` to `destination`, in whole
    /// minutes rounded to nearest.
    ///
    /// Never retries; the caller decides what a failure means.
    pub async fn resolve(
        provider: &impl RouteProvider,
        origin: &str,
        destination: &str,
    ) -> Result<i64, EtaError> {
        let req = DistanceMatrixRequest::departing_now(origin, destination);
        let response = provider.distance_matrix(&req).await?;

        if response.status != STATUS_OK {
            return Err(EtaError::Rejected {
                message: response.error_message.clone().unwrap_or_default(),
                status: response.status,
            });
        }

        let element = response
            .first_element()
            .ok_or_else(|| EtaError::Malformed("response contained no elements".into()))?;
        if element.status != STATUS_OK {
            return Err(EtaError::RouteUnresolvable {
                status: element.status.clone(),
            });
        }

        let seconds = element
            .travel_seconds()
            .ok_or_else(|| EtaError::Malformed("element has no duration".into()))?;
        Ok(seconds_to_minutes(seconds))
    }
}

fn seconds_to_minutes(seconds: i64) -> i64 {
    (seconds as f64 / 60.0).round() as i64
}
