use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// A geographic fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Requested fix accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    City,
    Neighborhood,
    Block,
}

impl Accuracy {
    /// Acceptable horizontal error for this accuracy level.
    pub fn radius_meters(&self) -> f64 {
        match self {
            Accuracy::City => 5000.0,
            Accuracy::Neighborhood => 1000.0,
            Accuracy::Block => 100.0,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("location lookup timed out")]
    Timeout,
}

/// One-shot coordinate lookup.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Resolve the current position at the given accuracy, or fail.
    ///
    /// `timeout` bounds the whole lookup; `None` uses the provider's
    /// default.
    async fn get_location(
        &self,
        accuracy: Accuracy,
        timeout: Option<Duration>,
    ) -> Result<Coordinate, LocationError>;
}

/// Fix reported by the HTTP geolocation endpoint.
#[derive(Debug, Deserialize)]
struct LocationResponse {
    latitude: f64,
    longitude: f64,
    /// Reported horizontal error in meters, when the endpoint knows it
    accuracy_m: Option<f64>,
}

/// Location provider backed by an HTTP geolocation endpoint.
pub struct HttpLocationProvider {
    client: reqwest::Client,
    endpoint: String,
    default_timeout: Duration,
}

impl HttpLocationProvider {
    pub fn new(endpoint: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            default_timeout,
        }
    }

    async fn fetch(&self) -> Result<LocationResponse, LocationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        response
            .json::<LocationResponse>()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LocationProvider for HttpLocationProvider {
    async fn get_location(
        &self,
        accuracy: Accuracy,
        timeout: Option<Duration>,
    ) -> Result<Coordinate, LocationError> {
        let deadline = timeout.unwrap_or(self.default_timeout);

        let fix = tokio::time::timeout(deadline, self.fetch())
            .await
            .map_err(|_| LocationError::Timeout)??;

        // A fix that is coarser than asked for is no fix at all.
        if let Some(error_m) = fix.accuracy_m {
            if error_m > accuracy.radius_meters() {
                return Err(LocationError::Unavailable(format!(
                    "fix accuracy {:.0}m exceeds requested {:.0}m",
                    error_m,
                    accuracy.radius_meters()
                )));
            }
        }

        info!(
            "location fix: {:.5}, {:.5} (accuracy: {:?})",
            fix.latitude, fix.longitude, accuracy
        );

        Ok(Coordinate {
            latitude: fix.latitude,
            longitude: fix.longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_radii_are_ordered() {
        assert!(Accuracy::Block.radius_meters() < Accuracy::Neighborhood.radius_meters());
        assert!(Accuracy::Neighborhood.radius_meters() < Accuracy::City.radius_meters());
    }

    #[test]
    fn location_response_parses_without_accuracy() {
        let json = r#"{"latitude": 35.6581, "longitude": 139.7414}"#;
        let fix: LocationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(fix.latitude, 35.6581);
        assert_eq!(fix.longitude, 139.7414);
        assert!(fix.accuracy_m.is_none());
    }
}
