//! Derivation pipeline for timed runs of a wheeled vehicle down a fixed
//! five-hill course.
//!
//! Inputs are complete, already-decoded batches for one finished run:
//! checkpoint events, raw inertial sample bursts, raw positioning records
//! and an elevation lookup. Outputs are named interval durations and the
//! freeroll performance bundle (max speed, specific energy, pickup point).
//! All components are pure functions over immutable snapshots; batch
//! computation across runs parallelizes with no shared mutable state.
//!
//! File decoding and the elevation raster live behind the
//! [`messages::MessageSource`] and [`freeroll::ElevationLookup`] traits;
//! this crate owns no I/O.

pub mod angular;
pub mod batch;
pub mod cache;
pub mod error;
pub mod events;
pub mod freeroll;
pub mod gps;
pub mod graphs;
pub mod messages;
pub mod sensor_series;
pub mod signal;
pub mod types;

pub use angular::{angular_velocity, AngularSeries};
pub use batch::{analyze_runs, RunInput, RunResult};
pub use cache::BoundedCache;
pub use error::AnalysisError;
pub use events::{exactly_one, resolve_event_intervals, EventIntervals};
pub use freeroll::{analyze_freeroll, ElevationLookup, FreerollConfig, FreerollStats};
pub use gps::gps_series;
pub use graphs::{build_roll_graphs, RollGraphs};
pub use messages::{MessageSource, RecordedMessages};
pub use sensor_series::build_sensor_series;
pub use types::{
    Calibration, Event, EventKind, GpsPoint, GpsRecord, GpsSeries, SensorBurst, SensorSeries,
};
