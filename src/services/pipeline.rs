use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::clients::{Fetch, FetchOutcome};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{CanonicalRecord, RunMetrics};
use crate::normalize::{normalize_deal, normalize_weather, Rejection};
use crate::services::MetricsRecorder;
use crate::sources::{Domain, SourceEndpoint, WorkUnit};
use crate::storage::Store;

/// Drives one full extraction cycle: fetch every unit of work, normalize
/// the raw items, persist the accepted records, and always record exactly
/// one metrics row. Units fail individually; only store write errors end
/// a cycle early.
pub struct Pipeline<F: Fetch> {
    fetcher: F,
    store: Store,
    clock: Arc<dyn Clock>,
    endpoint: SourceEndpoint,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(fetcher: F, store: Store, clock: Arc<dyn Clock>, endpoint: SourceEndpoint) -> Self {
        Self {
            fetcher,
            store,
            clock,
            endpoint,
        }
    }

    pub async fn run_cycle(&self) -> Result<RunMetrics> {
        let recorder = MetricsRecorder::start(self.clock.clone());
        let domain = self.endpoint.domain();
        let units = self.endpoint.units();

        info!(
            domain = domain.as_str(),
            units = units.len(),
            "Starting extraction cycle"
        );

        let mut extracted: i64 = 0;
        let mut failed: i64 = 0;
        let mut accepted: Vec<CanonicalRecord> = Vec::new();

        for unit in &units {
            let items = match self.fetch_unit(unit).await {
                Ok(payload) => match domain.items(payload) {
                    Ok(items) => items,
                    Err(e) => {
                        error!(unit = %unit.label, error = %e, "Unusable payload");
                        failed += 1;
                        continue;
                    }
                },
                Err(e) => {
                    error!(unit = %unit.label, error = %e, "Unit failed");
                    failed += 1;
                    continue;
                }
            };

            for raw in items {
                extracted += 1;
                match normalize_item(domain, &raw, self.clock.now()) {
                    Ok(record) => accepted.push(record),
                    Err(rejection) => {
                        warn!(unit = %unit.label, %rejection, "Record rejected");
                        failed += 1;
                    }
                }
            }
        }

        let mut saved: i64 = 0;
        let total = accepted.len();
        for (index, record) in accepted.iter().enumerate() {
            match self.persist(record).await {
                Ok(_) => saved += 1,
                Err(e) => {
                    // Facts are append-only and independent per unit, so
                    // rows already committed stay. The rest of the persist
                    // phase is abandoned and counted as failed.
                    error!(
                        error = %e,
                        dimension = %record.dimension_key,
                        "Store write failed, abandoning persist phase"
                    );
                    failed += (total - index) as i64;
                    break;
                }
            }
        }

        let metrics = recorder.finish(extracted, saved, failed);
        self.store.record_run(&metrics).await?;

        info!(
            domain = domain.as_str(),
            status = metrics.status.as_str(),
            extracted = metrics.extracted,
            saved = metrics.saved,
            failed = metrics.failed,
            duration_seconds = metrics.duration_seconds,
            "Cycle finished"
        );

        Ok(metrics)
    }

    /// Fetches one unit, retrying exactly once after a rate-limit hint.
    /// A second rate limit fails the unit for this cycle.
    async fn fetch_unit(&self, unit: &WorkUnit) -> Result<Value> {
        match self.fetcher.fetch(unit).await? {
            FetchOutcome::Payload(payload) => Ok(payload),
            FetchOutcome::RateLimited { retry_after } => {
                info!(
                    unit = %unit.label,
                    wait_secs = retry_after.as_secs(),
                    "Rate limited, waiting before retry"
                );
                tokio::time::sleep(retry_after).await;

                match self.fetcher.fetch(unit).await? {
                    FetchOutcome::Payload(payload) => Ok(payload),
                    FetchOutcome::RateLimited { .. } => Err(Error::RateLimit),
                }
            }
        }
    }

    async fn persist(&self, record: &CanonicalRecord) -> Result<i64> {
        let dimension_id = self
            .store
            .upsert_dimension(&record.dimension_key, &record.dimension_attrs)
            .await?;

        self.store
            .append_fact(dimension_id, &record.fields, record.extracted_at)
            .await
    }
}

fn normalize_item(
    domain: Domain,
    raw: &Value,
    now: DateTime<Utc>,
) -> std::result::Result<CanonicalRecord, Rejection> {
    match domain {
        Domain::Deals => normalize_deal(raw, now).map(|deal| deal.into_record()),
        Domain::Weather => normalize_weather(raw, now).map(|obs| obs.into_record()),
    }
}
