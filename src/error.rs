use thiserror::Error;

/// Failures the analysis pipeline can surface to its callers.
///
/// Ambiguous or duplicated checkpoint events are *not* represented here:
/// per the interval rules they simply leave the affected field unset.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Too few samples for a rate/filter operation. Fatal only to the
    /// derived series that requested it.
    #[error("insufficient data: got {got} samples, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    /// The decoded-message source could not produce messages for a run.
    /// Degrades that run to event-only fields; never aborts a batch.
    #[error("failed to decode telemetry: {0}")]
    DecodeFailure(String),
}
