//! Fingerprint-matching and ranking engine.
//!
//! A request flows `partition -> N x worker (parallel) -> fan-in -> vote`:
//! the dataset snapshot is split into contiguous shards, each shard is
//! scored and margin-filtered on its own blocking task, and the shard outputs
//! are merged in shard order into a single k-nearest majority vote.

pub mod partition;
pub mod scorer;
pub mod vote;
pub mod worker;

use crate::persistence::DatasetProvider;
use crate::utils::error::{Error, Result};
use crate::utils::types::{PositionEstimate, ReferenceRecord, SignalObservation};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub use partition::{plan_shards, run_shards, ShardResults};
pub use scorer::score;
pub use vote::majority_vote;
pub use worker::{CandidateQueue, ShardWorker};

/// Tunables of one estimation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of shards launched for datasets above `partition_threshold`.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Fraction of the largest overlap a candidate must exceed, in (0, 1].
    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Candidates taking part in the majority vote.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Datasets with at most this many records run as a single shard.
    #[serde(default = "default_partition_threshold")]
    pub partition_threshold: usize,

    /// Per-request deadline in milliseconds; 0 disables it.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_worker_count() -> usize {
    3
}
fn default_margin() -> f64 {
    0.6
}
fn default_top_k() -> usize {
    4
}
fn default_partition_threshold() -> usize {
    3
}
fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            margin: default_margin(),
            top_k: default_top_k(),
            partition_threshold: default_partition_threshold(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::ConfigError("engine.worker_count must be >= 1".to_string()));
        }
        if !(self.margin > 0.0 && self.margin <= 1.0) {
            return Err(Error::ConfigError(format!(
                "engine.margin must be in (0, 1], got {}",
                self.margin
            )));
        }
        if self.top_k == 0 {
            return Err(Error::ConfigError("engine.top_k must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Estimate the position of `query` against a dataset snapshot.
///
/// An empty dataset yields the `"not found"` sentinel rather than an error.
pub async fn estimate_position(
    query: &[SignalObservation], records: Vec<ReferenceRecord>, config: &EngineConfig,
) -> Result<PositionEstimate> {
    config.validate()?;
    if records.is_empty() {
        warn!("no reference records available, returning sentinel estimate");
        return Ok(PositionEstimate::not_found());
    }

    let started = Instant::now();
    let dataset_size = records.len();
    let records: Arc<[ReferenceRecord]> = records.into();
    let query: Arc<[SignalObservation]> = query.to_vec().into();

    let shard_results = match run_shards(records, query, config).await {
        | Ok(results) => results,
        | Err(e) => {
            if let Some(name) = failure_counter(&e) {
                metrics::counter!(name).increment(1);
            }
            return Err(e);
        }
    };
    let estimate = majority_vote(&shard_results, config.top_k);

    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
    metrics::histogram!("wifipos_estimate_ms").record(elapsed_ms);
    metrics::counter!("wifipos_estimates_total").increment(1);
    info!(
        "estimated '{}' ({} votes) over {} records in {:.2} ms",
        estimate.label, estimate.vote_count, dataset_size, elapsed_ms
    );
    Ok(estimate)
}

/// Counter bumped when a sharded run fails with `err`.
fn failure_counter(err: &Error) -> Option<&'static str> {
    match err {
        | Error::WorkerFailure { .. } => Some("wifipos_worker_failures_total"),
        | Error::Timeout(_) => Some("wifipos_estimate_timeouts_total"),
        | _ => None,
    }
}

/// Binds a dataset provider to an engine configuration; fetches a fresh
/// snapshot for every request.
#[derive(Clone)]
pub struct Estimator {
    provider: Arc<dyn DatasetProvider>,
    config: EngineConfig,
}

impl Estimator {
    pub fn new(provider: Arc<dyn DatasetProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn estimate(&self, query: &[SignalObservation]) -> Result<PositionEstimate> {
        let records = self.provider.fetch_all_records().await?;
        estimate_position(query, records, &self.config).await
    }
}
