//! PGW catalog adapter.
//!
//! Session-id auth and a single catalog lookup covering every requested
//! opening, so one tier-2 call costs one login (when the session is cold)
//! plus one gated request.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::politeness::PolitenessGate;
use super::position_mapping::map_position;
use super::session::{CredentialProvider, SessionSlot, SessionToken};
use super::{normalize_feature_tag, DistributorAdapter};
use crate::config::DistributorConfig;
use crate::error::{LookupError, Result};
use crate::models::{GlassPartResult, GlassPosition, Provenance, SourcedPart, VehicleInfo};

pub const DISTRIBUTOR_ID: &str = "pgw";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct CatalogRequest<'a> {
    year: i32,
    make: &'a str,
    model: &'a str,
    body_style: Option<&'a str>,
    vin: &'a str,
    openings: Vec<GlassPosition>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogResponse {
    #[serde(default)]
    parts: Vec<CatalogRow>,
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    nags: Option<String>,
    nags_alt: Option<String>,
    opening: Option<String>,
    options: Option<String>,
    list_price_cents: Option<i64>,
    match_quality: Option<String>,
    description: Option<String>,
}

/// PGW grades matches in words; anything short of exact lowers the confidence
fn declared_confidence(match_quality: Option<&str>) -> Option<u8> {
    match match_quality.map(|q| q.trim().to_ascii_lowercase()).as_deref() {
        Some("probable") => Some(70),
        Some("possible") => Some(50),
        _ => None,
    }
}

pub struct PgwAdapter {
    config: DistributorConfig,
    client: reqwest::Client,
    gate: PolitenessGate,
    session: SessionSlot,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for PgwAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgwAdapter")
            .field("base_url", &self.config.base_url)
            .field("enabled", &self.config.enabled)
            .finish()
    }
}

impl PgwAdapter {
    pub fn new(config: DistributorConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let gate = PolitenessGate::new(DISTRIBUTOR_ID, config.min_interval(), config.jitter());

        Ok(Self {
            config,
            client,
            gate,
            session: SessionSlot::new(DISTRIBUTOR_ID),
            credentials,
        })
    }

    pub fn with_gate(mut self, gate: PolitenessGate) -> Self {
        self.gate = gate;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn open_session(&self) -> Result<SessionToken> {
        let credentials = self.credentials.credentials(DISTRIBUTOR_ID).await?;
        self.gate.wait_for_turn().await;

        let response = self
            .client
            .post(self.url("/v2/session"))
            .json(&serde_json::json!({
                "user": credentials.username,
                "password": credentials.password,
                "account": credentials.account_id.or_else(|| self.config.account_id.clone()),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::authentication(
                DISTRIBUTOR_ID,
                format!("session request rejected with status {}", response.status()),
            ));
        }

        let session: SessionResponse = response.json().await?;
        Ok(SessionToken::new(session.session_id, self.config.session_ttl_seconds))
    }
}

/// Map catalog rows onto canonical parts; rows without a NAGS number are dropped
pub(crate) fn normalize_catalog_response(body: CatalogResponse, as_of: NaiveDate) -> Vec<SourcedPart> {
    body.parts
        .into_iter()
        .filter_map(|row| {
            let nags = row.nags.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
            let position = map_position(row.opening.as_deref().unwrap_or_default());

            let features = row
                .options
                .as_deref()
                .unwrap_or_default()
                .split('|')
                .filter_map(normalize_feature_tag);
            let mut part = GlassPartResult::new(nags, position).with_features(features);
            if let Some(alt) = row.nags_alt.as_deref().filter(|a| !a.trim().is_empty()) {
                part = part.with_alt(alt.trim());
            }
            if let Some(description) = row.description {
                part = part.with_description(description);
            }
            if let Some(cents) = row.list_price_cents.filter(|c| *c >= 0) {
                part = part.with_price(cents, DISTRIBUTOR_ID, as_of);
            }

            let mut provenance = Provenance::distributor(DISTRIBUTOR_ID);
            if let Some(declared) = declared_confidence(row.match_quality.as_deref()) {
                provenance = provenance.with_declared_confidence(declared);
            }
            Some(SourcedPart::new(part, provenance))
        })
        .collect()
}

#[async_trait]
impl DistributorAdapter for PgwAdapter {
    fn id(&self) -> &str {
        DISTRIBUTOR_ID
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    #[instrument(skip(self, vehicle), fields(distributor = DISTRIBUTOR_ID))]
    async fn lookup_parts(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<Vec<SourcedPart>> {
        if !self.config.enabled || positions.is_empty() {
            return Ok(Vec::new());
        }

        let session_id = self.session.token_or_login(|| self.open_session()).await?;
        self.gate.wait_for_turn().await;

        let request = CatalogRequest {
            year: vehicle.year,
            make: &vehicle.make,
            model: &vehicle.model,
            body_style: vehicle.body_style.as_deref(),
            vin: &vehicle.vin,
            openings: positions.to_vec(),
        };
        let response = self
            .client
            .post(self.url("/v2/catalog/lookup"))
            .header("X-Session-Id", session_id)
            .json(&request)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate().await;
            return Err(LookupError::authentication(DISTRIBUTOR_ID, "session expired"));
        }

        let body: CatalogResponse = response.error_for_status()?.json().await?;
        let parts = normalize_catalog_response(body, Utc::now().date_naive());
        debug!(count = parts.len(), "PGW catalog lookup complete");
        Ok(parts)
    }
}
