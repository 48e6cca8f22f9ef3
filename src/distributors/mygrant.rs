//! Mygrant portal adapter.
//!
//! Token login, then one search request per opening. Every request, login
//! included, goes through the adapter's politeness gate, so a four-door lookup
//! is four spaced requests, not a burst.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::politeness::PolitenessGate;
use super::position_mapping::{map_position, position_label};
use super::session::{CredentialProvider, SessionSlot, SessionToken};
use super::{dollars_to_cents, normalize_feature_tag, DistributorAdapter};
use crate::config::DistributorConfig;
use crate::error::{LookupError, Result};
use crate::models::{GlassPartResult, GlassPosition, Provenance, SourcedPart, VehicleInfo};

pub const DISTRIBUTOR_ID: &str = "mygrant";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    results: Vec<PartRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartRow {
    part_number: String,
    alt_part_number: Option<String>,
    location: Option<String>,
    description: Option<String>,
    #[serde(default)]
    attributes: Vec<String>,
    price: Option<RawPrice>,
    match_confidence: Option<u8>,
}

/// The portal sends prices as numbers on some endpoints and formatted strings on others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    fn to_cents(&self) -> Option<i64> {
        match self {
            RawPrice::Number(dollars) if dollars.is_finite() && *dollars >= 0.0 => {
                Some((dollars * 100.0).round() as i64)
            }
            RawPrice::Number(_) => None,
            RawPrice::Text(text) => dollars_to_cents(text),
        }
    }
}

pub struct MygrantAdapter {
    config: DistributorConfig,
    client: reqwest::Client,
    gate: PolitenessGate,
    session: SessionSlot,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for MygrantAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MygrantAdapter")
            .field("base_url", &self.config.base_url)
            .field("enabled", &self.config.enabled)
            .finish()
    }
}

impl MygrantAdapter {
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

    /// Replace the politeness gate, e.g. with one driven by a manual clock
    pub fn with_gate(mut self, gate: PolitenessGate) -> Self {
        self.gate = gate;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn login(&self) -> Result<SessionToken> {
        let credentials = self.credentials.credentials(DISTRIBUTOR_ID).await?;
        self.gate.wait_for_turn().await;

        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "username": credentials.username,
                "password": credentials.password,
                "accountId": credentials.account_id.or_else(|| self.config.account_id.clone()),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::authentication(
                DISTRIBUTOR_ID,
                format!("login rejected with status {}", response.status()),
            ));
        }

        let login: LoginResponse = response.json().await?;
        Ok(SessionToken::new(
            login.token,
            login.expires_in.unwrap_or(self.config.session_ttl_seconds),
        ))
    }

    async fn search(&self, vehicle: &VehicleInfo, position: GlassPosition) -> Result<Vec<SourcedPart>> {
        let token = self.session.token_or_login(|| self.login()).await?;
        self.gate.wait_for_turn().await;

        let year = vehicle.year.to_string();
        let mut query = vec![
            ("year", year.as_str()),
            ("make", vehicle.make.as_str()),
            ("model", vehicle.model.as_str()),
            ("opening", position_label(position)),
        ];
        if let Some(body_style) = vehicle.body_style.as_deref() {
            query.push(("bodyStyle", body_style));
        }

        let response = self
            .client
            .get(self.url("/api/parts/search"))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate().await;
            return Err(LookupError::authentication(DISTRIBUTOR_ID, "session rejected"));
        }

        let body: SearchResponse = response.error_for_status()?.json().await?;
        Ok(normalize_search_response(body, Utc::now().date_naive()))
    }
}

/// Map raw search rows onto canonical parts; rows without a part number are dropped
pub(crate) fn normalize_search_response(body: SearchResponse, as_of: NaiveDate) -> Vec<SourcedPart> {
    body.results
        .into_iter()
        .filter(|row| !row.part_number.trim().is_empty())
        .map(|row| {
            let label = row
                .location
                .as_deref()
                .or(row.description.as_deref())
                .unwrap_or_default();
            let mut part = GlassPartResult::new(row.part_number.trim(), map_position(label))
                .with_features(row.attributes.iter().filter_map(|a| normalize_feature_tag(a)));
            part.nags_part_number_alt = row.alt_part_number;
            part.description = row.description;
            if let Some(cost) = row.price.as_ref().and_then(RawPrice::to_cents) {
                part = part.with_price(cost, DISTRIBUTOR_ID, as_of);
            }

            let mut provenance = Provenance::distributor(DISTRIBUTOR_ID);
            if let Some(declared) = row.match_confidence {
                provenance = provenance.with_declared_confidence(declared);
            }
            SourcedPart::new(part, provenance)
        })
        .collect()
}

#[async_trait]
impl DistributorAdapter for MygrantAdapter {
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
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for &position in positions {
            match self.search(vehicle, position).await {
                Ok(parts) => {
                    debug!(position = %position, count = parts.len(), "Mygrant search complete");
                    found.extend(parts);
                }
                Err(e @ LookupError::Authentication { .. }) => {
                    warn!(error = %e, "Mygrant authentication failed, abandoning remaining positions");
                    break;
                }
                Err(e) => {
                    warn!(position = %position, error = %e, "Mygrant search failed");
                }
            }
        }
        Ok(found)
    }
}
