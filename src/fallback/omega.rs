//! HTTP client for the Omega EDI parts API.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::EdiPartsApi;
use crate::config::FallbackConfig;
use crate::constants::sources;
use crate::error::{LookupError, Result};
use crate::models::{GlassPartResult, GlassPosition, VehicleInfo};

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Serialize)]
struct EdiLookupRequest<'a> {
    vin: &'a str,
    year: i32,
    make: &'a str,
    model: &'a str,
    positions: &'a [GlassPosition],
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EdiLookupResponse {
    #[serde(default)]
    parts: Vec<EdiPart>,
}

#[derive(Debug, Deserialize)]
struct EdiPart {
    nags_part_number: String,
    nags_part_number_alt: Option<String>,
    position: String,
    #[serde(default)]
    features: Vec<String>,
    price_cents: Option<i64>,
    description: Option<String>,
}

pub struct OmegaEdiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for OmegaEdiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmegaEdiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OmegaEdiClient {
    pub fn new(config: &FallbackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

/// Positions are exchanged in canonical form; rows with an unknown position are dropped
pub(crate) fn normalize_edi_response(body: EdiLookupResponse, as_of: NaiveDate) -> Vec<GlassPartResult> {
    body.parts
        .into_iter()
        .filter_map(|row| {
            let position = match row.position.parse::<GlassPosition>() {
                Ok(position) => position,
                Err(_) => {
                    warn!(position = %row.position, "Dropping EDI row with unknown position");
                    return None;
                }
            };
            let mut part = GlassPartResult::new(row.nags_part_number, position)
                .with_features(row.features);
            part.nags_part_number_alt = row.nags_part_number_alt;
            part.description = row.description;
            if let Some(cents) = row.price_cents {
                part = part.with_price(cents, sources::OMEGA, as_of);
            }
            Some(part)
        })
        .collect()
}

#[async_trait]
impl EdiPartsApi for OmegaEdiClient {
    #[instrument(skip(self, vehicle), fields(vin = %vehicle.vin))]
    async fn fetch_parts(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<Vec<GlassPartResult>> {
        let request = EdiLookupRequest {
            vin: &vehicle.vin,
            year: vehicle.year,
            make: &vehicle.make,
            model: &vehicle.model,
            positions,
        };

        let response = self
            .client
            .post(format!("{}/v1/parts/lookup", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Fallback {
                message: format!("EDI lookup returned status {status}"),
            });
        }

        let body: EdiLookupResponse = response.json().await?;
        let parts = normalize_edi_response(body, Utc::now().date_naive());
        debug!(count = parts.len(), "EDI lookup complete");
        Ok(parts)
    }
}
