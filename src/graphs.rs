//! Per-run plotting bundle: every derivable series for one telemetry file.
//!
//! Mirrors what the viewer plots: GPS track with snapped relative
//! elevation and speed, centripetal-proportional series, calibrated and
//! decimated inertial streams, and the camera start/stop markers. Each
//! block is independent; a block that cannot be derived (missing stream,
//! missing calibration, too few samples to decimate) is simply left out.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::angular::{self, AngularSeries};
use crate::freeroll::{ElevationLookup, FreerollConfig};
use crate::gps;
use crate::messages::{RecordedMessages, SensorKind};
use crate::sensor_series::build_sensor_series;
use crate::types::SensorSeries;

/// Decimation factor applied to inertial streams for plotting.
const PLOT_DECIMATION: usize = 20;

/// Speed cutoff (m/s) below which heading is too noisy to differentiate.
const CENTRIPETAL_SPEED_CUTOFF: f64 = 1.0;

/// Columnar GPS block for plotting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GpsGraph {
    pub timestamps: Vec<i64>,
    pub latitude_deg: Vec<f64>,
    pub longitude_deg: Vec<f64>,
    /// Course-snapped elevation relative to the start line, m.
    pub elevation_m: Vec<f64>,
    pub speed_m_s: Vec<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RollGraphs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centripetal: Option<AngularSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<SensorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyroscope: Option<SensorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnetometer: Option<SensorSeries>,
    pub camera_starts: Vec<i64>,
    pub camera_ends: Vec<i64>,
}

fn gps_graph(
    series: &crate::types::GpsSeries,
    elevation: &impl ElevationLookup,
    config: &FreerollConfig,
) -> Option<GpsGraph> {
    let mut graph = GpsGraph::default();
    for point in &series.points {
        let elev = elevation
            .elevation_m(point.latitude_deg, point.longitude_deg, true)
            .ok()?;
        graph.timestamps.push(point.timestamp_ms);
        graph.latitude_deg.push(point.latitude_deg);
        graph.longitude_deg.push(point.longitude_deg);
        graph.elevation_m.push(elev - config.start_line_elevation_m);
        graph.speed_m_s.push(point.speed_m_s);
    }
    Some(graph)
}

fn decimated_sensor(messages: &RecordedMessages, sensor: SensorKind) -> Option<SensorSeries> {
    let calibration = messages.calibration_for(sensor)?;
    let bursts = messages.bursts_for(sensor);
    if bursts.is_empty() {
        return None;
    }
    match build_sensor_series(calibration, bursts, PLOT_DECIMATION) {
        Ok((_, mut data, _)) => {
            if sensor == SensorKind::Accelerometer {
                // Forward-facing camera mount: flip x/y so forward and
                // left read positive.
                for v in data.x.iter_mut() {
                    *v = -*v;
                }
                for v in data.y.iter_mut() {
                    *v = -*v;
                }
            }
            Some(data)
        }
        Err(err) => {
            debug!("skipping {sensor:?} graph: {err}");
            None
        }
    }
}

/// Build the full plotting bundle for one decoded telemetry file.
pub fn build_roll_graphs(
    messages: &RecordedMessages,
    elevation: &impl ElevationLookup,
    config: &FreerollConfig,
) -> RollGraphs {
    let mut graphs = RollGraphs {
        camera_starts: messages.camera_start_timestamps(),
        camera_ends: messages.camera_end_timestamps(),
        ..Default::default()
    };

    if let Some(series) = gps::gps_series(messages.gps_records.as_deref()) {
        graphs.centripetal = Some(angular::angular_velocity(&series, CENTRIPETAL_SPEED_CUTOFF));
        graphs.gps = gps_graph(&series, elevation, config);
    }

    graphs.accelerometer = decimated_sensor(messages, SensorKind::Accelerometer);
    graphs.gyroscope = decimated_sensor(messages, SensorKind::Gyroscope);
    graphs.magnetometer = decimated_sensor(messages, SensorKind::Compass);

    graphs
}
