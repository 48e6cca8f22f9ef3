//! # Lookup Orchestrator
//!
//! Drives one request through the resolution cascade:
//!
//! ```text
//! decode ─▶ cache (1) ─▶ distributors (2) ─▶ EDI fallback (3) ─▶ escalation (4)
//!   │          │               │                    │                 │
//!   └── terminal error         └── each stage only sees what is still missing
//! ```
//!
//! `lookup` never fails. Tier errors are logged and treated as "nothing
//! found", the cascade moves on, and whatever happens exactly one audit row is
//! written.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::types::{LookupRequest, LookupResult, PartsTier, TierTimings};
use crate::audit::LookupAuditLog;
use crate::cache::PartsCache;
use crate::constants::{sources, tiers, VIN_LENGTH};
use crate::decoder::VehicleDecoder;
use crate::error::{LookupError, Result};
use crate::escalation::ManualEscalationQueue;
use crate::logging::{log_lookup_operation, log_tier_outcome};
use crate::models::{
    join_positions, normalize_vin, validate_vin, AttemptLogEntry, EscalationPriority,
    GlassPartResult, GlassPosition, LookupLogRow, NewEscalationEntry, VehicleInfo,
};

/// Mutable state threaded through the tiers of a single lookup
#[derive(Debug)]
struct Cascade {
    requested: Vec<GlassPosition>,
    missing: Vec<GlassPosition>,
    resolved: Vec<GlassPartResult>,
    from_cache: usize,
    last_tier: u8,
    last_source: String,
    timings: TierTimings,
    attempt_log: Vec<AttemptLogEntry>,
}

impl Cascade {
    fn new(requested: Vec<GlassPosition>) -> Self {
        Self {
            missing: requested.clone(),
            requested,
            resolved: Vec::new(),
            from_cache: 0,
            last_tier: tiers::NONE,
            last_source: String::new(),
            timings: TierTimings::default(),
            attempt_log: Vec::new(),
        }
    }

    /// Accept a part only for a position that is still missing
    fn accept(&mut self, part: &GlassPartResult) -> bool {
        match self.missing.iter().position(|p| *p == part.glass_position) {
            Some(index) => {
                self.missing.remove(index);
                self.resolved.push(part.clone());
                true
            }
            None => false,
        }
    }

    fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Resolved parts in the order their positions were requested
    fn ordered_parts(&self) -> Vec<GlassPartResult> {
        self.requested
            .iter()
            .filter_map(|position| {
                self.resolved
                    .iter()
                    .find(|part| part.glass_position == *position)
                    .cloned()
            })
            .collect()
    }
}

pub struct LookupOrchestrator {
    decoder: Arc<dyn VehicleDecoder>,
    cache: PartsCache,
    distributors: Arc<dyn PartsTier>,
    fallback: Arc<dyn PartsTier>,
    escalation: ManualEscalationQueue,
    audit: LookupAuditLog,
    default_priority: EscalationPriority,
}

impl std::fmt::Debug for LookupOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupOrchestrator")
            .field("cache", &self.cache)
            .field("distributors", &self.distributors.tier_name())
            .field("fallback", &self.fallback.tier_name())
            .field("default_priority", &self.default_priority)
            .finish()
    }
}

impl LookupOrchestrator {
    pub fn new(
        decoder: Arc<dyn VehicleDecoder>,
        cache: PartsCache,
        distributors: Arc<dyn PartsTier>,
        fallback: Arc<dyn PartsTier>,
        escalation: ManualEscalationQueue,
        audit: LookupAuditLog,
    ) -> Self {
        Self {
            decoder,
            cache,
            distributors,
            fallback,
            escalation,
            audit,
            default_priority: EscalationPriority::default(),
        }
    }

    /// Priority for escalations whose request does not name one
    pub fn with_default_priority(mut self, priority: EscalationPriority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn cache(&self) -> &PartsCache {
        &self.cache
    }

    pub fn escalation_queue(&self) -> &ManualEscalationQueue {
        &self.escalation
    }

    /// Resolve the requested positions for a VIN
    #[instrument(skip(self, request), fields(vin = %request.vin, transaction_id = ?request.transaction_id))]
    pub async fn lookup(&self, request: LookupRequest) -> LookupResult {
        let started = Instant::now();
        let mut cascade = Cascade::new(request.glass_positions.expand());

        let vehicle = match self.decode(&request.vin).await {
            Ok(vehicle) => vehicle,
            Err(e) => {
                warn!(error = %e, "❌ VIN decode failed, aborting lookup");
                return self
                    .finish_terminal(&request, &cascade, None, e.to_string(), started)
                    .await;
            }
        };

        if cascade.requested.is_empty() {
            return self
                .finish_terminal(
                    &request,
                    &cascade,
                    Some(vehicle),
                    "no glass positions requested".to_string(),
                    started,
                )
                .await;
        }

        self.run_cache_tier(&vehicle, &mut cascade).await;

        if !cascade.is_complete() {
            self.run_external_tier(tiers::DISTRIBUTOR, self.distributors.as_ref(), &vehicle, &mut cascade)
                .await;
        }

        if !cascade.is_complete() {
            self.run_external_tier(tiers::FALLBACK, self.fallback.as_ref(), &vehicle, &mut cascade)
                .await;
        }

        if !cascade.is_complete() {
            self.escalate(&request, &vehicle, &cascade).await;
        }

        self.finish(&request, vehicle, cascade, started).await
    }

    async fn decode(&self, raw_vin: &str) -> Result<VehicleInfo> {
        let vin = validate_vin(raw_vin)?;
        self.decoder
            .decode(&vin)
            .await?
            .ok_or_else(|| LookupError::Decode {
                vin,
                message: "decoder could not identify the vehicle".to_string(),
            })
    }

    async fn run_cache_tier(&self, vehicle: &VehicleInfo, cascade: &mut Cascade) {
        let started = Instant::now();
        let requested = cascade.missing.clone();

        for position in requested.iter().copied() {
            match self.cache.lookup(&vehicle.vin_pattern, position).await {
                Ok(Some(part)) => {
                    if cascade.accept(&part) {
                        cascade.from_cache += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(position = %position, error = %e, "Cache read failed, treating as miss");
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        cascade.timings.cache_ms = Some(duration_ms);
        if cascade.from_cache > 0 {
            cascade.last_tier = tiers::CACHE;
            cascade.last_source = sources::CACHE.to_string();
        }
        cascade.attempt_log.push(AttemptLogEntry::new(
            tiers::CACHE,
            sources::CACHE,
            outcome_label(cascade.from_cache, requested.len()),
        ));
        log_tier_outcome(
            tiers::CACHE,
            sources::CACHE,
            requested.len(),
            cascade.from_cache,
            duration_ms,
            None,
        );
    }

    /// One call to an external tier covering every missing position; each
    /// accepted part is written through to the cache
    async fn run_external_tier(
        &self,
        tier: u8,
        service: &dyn PartsTier,
        vehicle: &VehicleInfo,
        cascade: &mut Cascade,
    ) {
        let started = Instant::now();
        let requested = cascade.missing.clone();
        let outcome = service.lookup(vehicle, &requested).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match tier {
            tiers::DISTRIBUTOR => cascade.timings.distributor_ms = Some(duration_ms),
            _ => cascade.timings.fallback_ms = Some(duration_ms),
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                let message = e.to_string();
                log_tier_outcome(
                    tier,
                    service.tier_name(),
                    requested.len(),
                    0,
                    duration_ms,
                    Some(&message),
                );
                cascade.attempt_log.push(AttemptLogEntry::new(
                    tier,
                    service.tier_name(),
                    format!("error: {message}"),
                ));
                return;
            }
        };

        let mut accepted = 0;
        for sourced in &result.parts {
            if !cascade.accept(&sourced.part) {
                continue;
            }
            accepted += 1;
            if let Err(e) = self
                .cache
                .store(vehicle, &sourced.part, &sourced.provenance)
                .await
            {
                warn!(
                    position = %sourced.part.glass_position,
                    source = %sourced.provenance.source,
                    error = %e,
                    "Cache write failed, keeping resolved part"
                );
            }
        }

        if accepted > 0 {
            cascade.last_tier = tier;
            cascade.last_source = result.source.clone();
        }
        cascade.attempt_log.push(AttemptLogEntry::new(
            tier,
            result.source.as_str(),
            outcome_label(accepted, requested.len()),
        ));
        log_tier_outcome(
            tier,
            &result.source,
            requested.len(),
            accepted,
            duration_ms,
            None,
        );
    }

    async fn escalate(&self, request: &LookupRequest, vehicle: &VehicleInfo, cascade: &Cascade) {
        let mut attempt_log = cascade.attempt_log.clone();
        attempt_log.push(AttemptLogEntry::new(
            tiers::MANUAL,
            sources::MANUAL_QUEUE,
            "queued",
        ));

        self.escalation
            .queue_for_research(NewEscalationEntry {
                vehicle: vehicle.clone(),
                glass_positions: cascade.missing.clone(),
                transaction_id: request.transaction_id.clone(),
                customer_context: request.customer_context.clone(),
                priority: request.priority.unwrap_or(self.default_priority),
                attempt_log,
            })
            .await;
    }

    async fn finish(
        &self,
        request: &LookupRequest,
        vehicle: VehicleInfo,
        cascade: Cascade,
        started: Instant,
    ) -> LookupResult {
        let parts = cascade.ordered_parts();
        let unresolved = cascade.missing.clone();

        let (tier, source) = if parts.is_empty() {
            (tiers::MANUAL, sources::MANUAL_QUEUE.to_string())
        } else if !unresolved.is_empty() {
            (cascade.last_tier, sources::PARTIAL.to_string())
        } else {
            (cascade.last_tier, cascade.last_source.clone())
        };
        let error = (!unresolved.is_empty())
            .then(|| format!("unresolved positions: {}", join_positions(&unresolved)));

        let result = LookupResult {
            success: !parts.is_empty(),
            cached: !parts.is_empty() && cascade.from_cache == parts.len(),
            vehicle: Some(vehicle),
            parts,
            resolved_by_tier: tier,
            resolved_by_source: source,
            duration_ms: started.elapsed().as_millis() as u64,
            unresolved_positions: unresolved,
            error,
        };

        self.record(request, &cascade, &result).await;
        result
    }

    async fn finish_terminal(
        &self,
        request: &LookupRequest,
        cascade: &Cascade,
        vehicle: Option<VehicleInfo>,
        reason: String,
        started: Instant,
    ) -> LookupResult {
        let result = LookupResult {
            success: false,
            vehicle,
            parts: Vec::new(),
            resolved_by_tier: tiers::NONE,
            resolved_by_source: sources::ERROR.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            cached: false,
            unresolved_positions: Vec::new(),
            error: Some(reason),
        };

        self.record(request, cascade, &result).await;
        result
    }

    async fn record(&self, request: &LookupRequest, cascade: &Cascade, result: &LookupResult) {
        let vin: String = normalize_vin(&request.vin).chars().take(VIN_LENGTH).collect();
        let to_ms = |ms: Option<u64>| ms.map(|ms| ms as i64);

        self.audit
            .record(LookupLogRow {
                id: Uuid::new_v4(),
                vin: vin.clone(),
                requested_positions: join_positions(&cascade.requested),
                transaction_id: request.transaction_id.clone(),
                resolved_by_tier: i16::from(result.resolved_by_tier),
                resolved_by_source: result.resolved_by_source.clone(),
                cache_ms: to_ms(cascade.timings.cache_ms),
                distributor_ms: to_ms(cascade.timings.distributor_ms),
                fallback_ms: to_ms(cascade.timings.fallback_ms),
                total_ms: result.duration_ms as i64,
                success: result.success,
                nags_part_number: result.parts.first().map(|p| p.nags_part_number.clone()),
                error: result.error.clone(),
                created_at: Utc::now(),
            })
            .await;

        log_lookup_operation(
            "lookup",
            &vin,
            request.transaction_id.as_deref(),
            result.resolved_by_tier,
            &result.resolved_by_source,
            result.success,
            result.duration_ms,
        );
        if result.success && result.unresolved_positions.is_empty() {
            info!(parts = result.parts.len(), "✅ Lookup fully resolved");
        }
    }
}

fn outcome_label(resolved: usize, requested: usize) -> String {
    match resolved {
        0 => "no_parts".to_string(),
        n if n == requested => "resolved".to_string(),
        n => format!("resolved {n}/{requested}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_label() {
        assert_eq!(outcome_label(0, 2), "no_parts");
        assert_eq!(outcome_label(2, 2), "resolved");
        assert_eq!(outcome_label(1, 3), "resolved 1/3");
    }

    #[test]
    fn test_cascade_accepts_only_missing_positions() {
        let mut cascade = Cascade::new(vec![GlassPosition::BackGlass, GlassPosition::Windshield]);

        assert!(cascade.accept(&GlassPartResult::new("W1", GlassPosition::Windshield)));
        assert!(!cascade.accept(&GlassPartResult::new("W2", GlassPosition::Windshield)));
        assert!(!cascade.accept(&GlassPartResult::new("S1", GlassPosition::Sunroof)));
        assert!(cascade.accept(&GlassPartResult::new("B1", GlassPosition::BackGlass)));
        assert!(cascade.is_complete());

        let numbers: Vec<_> = cascade
            .ordered_parts()
            .into_iter()
            .map(|p| p.nags_part_number)
            .collect();
        assert_eq!(numbers, vec!["B1", "W1"]);
    }
}
