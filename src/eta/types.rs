//! Request and response shapes for the distance-matrix endpoint.

use serde::{Deserialize, Serialize};

/// A single origin/destination travel-time query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceMatrixRequest {
    pub origin: String,
    pub destination: String,
    /// Departure time as understood by the provider; `"now"` asks for
    /// current-traffic estimates.
    pub departure_time: String,
}

impl DistanceMatrixRequest {
    pub fn departing_now(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_time: "now".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrixResponse {
    /// Top-level request status; `"OK"` when the request itself was valid.
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

impl DistanceMatrixResponse {
    /// The first element of the first row: the single pair that was asked for.
    pub fn first_element(&self) -> Option<&MatrixElement> {
        self.rows.first().and_then(|row| row.elements.first())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRow {
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// Result for one origin/destination pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixElement {
    pub status: String,
    #[serde(default)]
    pub duration: Option<TextValue>,
    #[serde(default)]
    pub duration_in_traffic: Option<TextValue>,
}

impl MatrixElement {
    /// Traffic-aware duration in seconds, falling back to the plain duration.
    pub fn travel_seconds(&self) -> Option<i64> {
        self.duration_in_traffic
            .as_ref()
            .or(self.duration.as_ref())
            .map(|d| d.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub text: String,
    pub value: i64,
}
