//! Partitioner: splits the dataset into contiguous shards and fans them out
//! to blocking worker tasks.

use super::worker::ShardWorker;
use super::EngineConfig;
use crate::utils::error::{Error, Result};
use crate::utils::types::{CandidateScore, ReferenceRecord, SignalObservation};
use log::{debug, error};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Per-shard output, indexed by shard.
pub type ShardResults = Vec<Vec<CandidateScore>>;

/// Compute shard boundaries for a dataset of `len` records.
///
/// Datasets at or below `threshold` records (or a single worker) get one
/// shard covering everything. Otherwise `worker_count` shards of
/// `ceil(len / worker_count)` records are produced, the last one taking the
/// remainder. Ranges never overlap and cover `0..len` exactly once; trailing
/// shards may be empty when `worker_count` is close to `len`.
pub fn plan_shards(len: usize, worker_count: usize, threshold: usize) -> Vec<Range<usize>> {
    if len <= threshold || worker_count <= 1 {
        return vec![0..len];
    }

    let shard_size = len.div_ceil(worker_count);
    (0..worker_count)
        .map(|i| {
            let start = (i * shard_size).min(len);
            let end = if i + 1 == worker_count { len } else { ((i + 1) * shard_size).min(len) };
            start..end
        })
        .collect()
}

/// Run one shard worker per planned shard and collect their results in
/// shard order.
///
/// Fails with [`Error::WorkerFailure`] if any shard errors or panics and with
/// [`Error::Timeout`] once `config.request_timeout_ms` elapses. In both cases
/// the remaining workers are cancelled.
pub async fn run_shards(
    records: Arc<[ReferenceRecord]>, query: Arc<[SignalObservation]>, config: &EngineConfig,
) -> Result<ShardResults> {
    let plan = plan_shards(records.len(), config.worker_count, config.partition_threshold);
    debug!("dataset of {} records split into {:?}", records.len(), plan);

    let cancel = CancellationToken::new();
    let handles: Vec<JoinHandle<Result<Vec<CandidateScore>>>> = plan
        .into_iter()
        .enumerate()
        .map(|(shard, range)| {
            let records = Arc::clone(&records);
            let query = Arc::clone(&query);
            let cancel = cancel.clone();
            let margin = config.margin;
            tokio::task::spawn_blocking(move || {
                let slice = records.get(range.clone()).ok_or_else(|| Error::WorkerFailure {
                    shard,
                    reason: format!("range {:?} outside dataset of {}", range, records.len()),
                })?;
                ShardWorker::new(shard, slice, margin).run(&query, &cancel)
            })
        })
        .collect();

    collect_shards(handles, &cancel, config.request_timeout()).await
}

/// Fan the handles in, bounded by `deadline` when one is set. On expiry the
/// token is cancelled and the request fails with [`Error::Timeout`].
pub(crate) async fn collect_shards(
    handles: Vec<JoinHandle<Result<Vec<CandidateScore>>>>, cancel: &CancellationToken,
    deadline: Option<Duration>,
) -> Result<ShardResults> {
    let Some(deadline) = deadline else {
        return fan_in(handles, cancel).await;
    };
    match tokio::time::timeout(deadline, fan_in(handles, cancel)).await {
        | Ok(results) => results,
        | Err(_) => {
            cancel.cancel();
            error!("estimation exceeded deadline of {:?}", deadline);
            Err(Error::Timeout(deadline))
        }
    }
}

/// Wait for every handle in completion order, storing each result in the
/// slot of its shard. The first failure to arrive cancels the other workers
/// and fails the whole request.
pub(crate) async fn fan_in(
    handles: Vec<JoinHandle<Result<Vec<CandidateScore>>>>, cancel: &CancellationToken,
) -> Result<ShardResults> {
    let mut slots: Vec<Option<Vec<CandidateScore>>> = vec![None; handles.len()];
    let mut pending = JoinSet::new();
    for (shard, handle) in handles.into_iter().enumerate() {
        pending.spawn(async move { (shard, handle.await) });
    }

    while let Some(joined) = pending.join_next().await {
        let (shard, outcome) = match joined {
            | Ok(tagged) => tagged,
            | Err(e) => {
                cancel.cancel();
                return Err(Error::Other(format!("shard fan-in task failed: {}", e)));
            }
        };
        let outcome = match outcome {
            | Ok(Ok(top_results)) => Ok(top_results),
            | Ok(Err(Error::Cancelled)) => Err(Error::WorkerFailure {
                shard,
                reason: "cancelled before completion".to_string(),
            }),
            | Ok(Err(e)) => Err(e),
            | Err(join) => Err(Error::WorkerFailure { shard, reason: join.to_string() }),
        };
        match outcome {
            | Ok(top_results) => slots[shard] = Some(top_results),
            | Err(e) => {
                cancel.cancel();
                error!("shard {} failed: {}", shard, e);
                return Err(e);
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(shard, slot)| {
            slot.ok_or_else(|| Error::WorkerFailure {
                shard,
                reason: "no result reported".to_string(),
            })
        })
        .collect()
}

impl EngineConfig {
    /// Deadline for one request; `None` when `request_timeout_ms` is 0.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}
