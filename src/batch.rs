//! Batch computation across runs.
//!
//! Each run's result depends only on that run's inputs, so a dataset is
//! embarrassingly parallel: runs are partitioned across scoped worker
//! threads with no shared mutable state, and rows come back in input
//! order. A run whose telemetry cannot be decoded degrades to its
//! event-only fields; it never takes the batch down with it.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::events::{resolve_event_intervals, EventIntervals};
use crate::freeroll::{analyze_freeroll, ElevationLookup, FreerollConfig, FreerollStats};
use crate::gps;
use crate::messages::{MessageSource, RecordedMessages};
use crate::types::Event;

/// One run's inputs: its event set and an opaque reference to its
/// telemetry file (resolved by the message source), if it has one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunInput {
    pub run_id: i64,
    pub events: Vec<Event>,
    pub telemetry_ref: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: i64,
    pub intervals: EventIntervals,
    pub freeroll: FreerollStats,
}

fn analyze_run<S, E>(
    run: &RunInput,
    source: &S,
    elevation: &E,
    config: &FreerollConfig,
) -> RunResult
where
    S: MessageSource,
    E: ElevationLookup,
{
    let messages: Option<RecordedMessages> = match &run.telemetry_ref {
        Some(storage_ref) => match source.load(storage_ref) {
            Ok(messages) => Some(messages),
            Err(err) => {
                warn!("run {}: telemetry decode failed: {err}", run.run_id);
                None
            }
        },
        None => None,
    };

    let gps_series = messages
        .as_ref()
        .and_then(|m| gps::gps_series(m.gps_records.as_deref()));
    let camera_starts = messages
        .as_ref()
        .map(RecordedMessages::camera_start_timestamps)
        .unwrap_or_default();

    RunResult {
        run_id: run.run_id,
        intervals: resolve_event_intervals(&run.events),
        freeroll: analyze_freeroll(
            &run.events,
            gps_series.as_ref(),
            elevation,
            &camera_starts,
            config,
        ),
    }
}

/// Compute result bundles for every run, fanned out over `workers`
/// threads. Output order matches input order regardless of which worker
/// finished first.
pub fn analyze_runs<S, E>(
    runs: &[RunInput],
    source: &S,
    elevation: &E,
    config: &FreerollConfig,
    workers: usize,
) -> Vec<RunResult>
where
    S: MessageSource,
    E: ElevationLookup + Sync,
{
    if runs.is_empty() {
        return Vec::new();
    }

    let workers = workers.max(1).min(runs.len());
    let chunk_size = runs.len().div_ceil(workers);
    let mut results: Vec<Option<RunResult>> = (0..runs.len()).map(|_| None).collect();

    // Per-run isolation covers data failures (typed errors, logged and
    // degraded above); a panic in a worker is a bug and propagates.
    crossbeam::thread::scope(|scope| {
        for (input_chunk, output_chunk) in runs.chunks(chunk_size).zip(results.chunks_mut(chunk_size))
        {
            scope.spawn(move |_| {
                for (run, slot) in input_chunk.iter().zip(output_chunk.iter_mut()) {
                    *slot = Some(analyze_run(run, source, elevation, config));
                }
            });
        }
    })
    .expect("batch worker panicked");

    results.into_iter().flatten().collect()
}
