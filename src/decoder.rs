//! # Vehicle Decoder Boundary
//!
//! The VIN decoder is an external collaborator. The engine only consumes it
//! through [`VehicleDecoder`]; `Ok(None)` means the VIN is well-formed but the
//! decoder could not identify the vehicle.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::VehicleInfo;

#[async_trait]
pub trait VehicleDecoder: Send + Sync {
    async fn decode(&self, vin: &str) -> Result<Option<VehicleInfo>>;
}
