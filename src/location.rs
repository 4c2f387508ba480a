// src/location.rs

use async_trait::async_trait;

use crate::common::error::AppError;
use crate::geo::GeoPoint;

/// The device geolocation seam. Acquiring a fix is asynchronous and may fail;
/// callers must propagate the failure instead of falling back to a stale or
/// default coordinate.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoPoint, AppError>;
}

/// Provider that always answers with a fixed point. Useful when the start
/// point is a known office location, and in tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticLocationProvider(pub GeoPoint);

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn current_position(&self) -> Result<GeoPoint, AppError> {
        if !self.0.is_finite() {
            return Err(AppError::InvalidCoordinate);
        }
        Ok(self.0)
    }
}

/// Provider that never resolves a fix, mirroring a denied or failed
/// geolocation request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLocationProvider;

#[async_trait]
impl LocationProvider for UnavailableLocationProvider {
    async fn current_position(&self) -> Result<GeoPoint, AppError> {
        Err(AppError::LocationUnavailable)
    }
}
