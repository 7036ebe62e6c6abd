use chrono::SecondsFormat;
use geojson::{Feature, Geometry, JsonObject, Value};
use uuid::Uuid;

use crate::error::SeriesError;
use crate::types::activity::{elapsed_seconds, StoredActivity, StoredPoint};
use crate::types::series::{Series, SummaryView, TrackResponse};

/// Builds the map geometry and chart series for a stored activity. `points`
/// must already be in ascending time order.
pub fn assemble(
    id: Uuid,
    activity: StoredActivity,
    points: &[StoredPoint],
) -> Result<TrackResponse, SeriesError> {
    let Some(baseline) = points.first().map(|p| p.time) else {
        return Err(SeriesError::NoTrackpoints);
    };

    let n = points.len();
    let mut coordinates = Vec::with_capacity(n);
    let mut series = Series {
        time_iso: Vec::with_capacity(n),
        elapsed_sec: Vec::with_capacity(n),
        elevation: Vec::with_capacity(n),
        hr: Vec::with_capacity(n),
        speed_mps: Vec::with_capacity(n),
        speed_kmh: Vec::with_capacity(n),
        pace_min_per_km: Vec::with_capacity(n),
    };

    for point in points {
        coordinates.push(vec![point.lon, point.lat]);
        series
            .time_iso
            .push(point.time.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        series.elapsed_sec.push(elapsed_seconds(baseline, point.time));
        series.elevation.push(point.elevation);
        series.hr.push(point.heart_rate);
        series.speed_mps.push(point.speed_mps);
        series.speed_kmh.push(to_kmh(point.speed_mps));
        series.pace_min_per_km.push(pace_min_per_km(point.speed_mps));
    }

    Ok(TrackResponse {
        id,
        summary: SummaryView::from(activity),
        geojson: line_feature(coordinates),
        series,
    })
}

/// `coordinates` are `[lon, lat]` positions in time order.
fn line_feature(coordinates: Vec<Vec<f64>>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: None,
        properties: Some(JsonObject::new()),
        foreign_members: None,
    }
}

pub fn to_kmh(speed_mps: Option<f64>) -> Option<f64> {
    speed_mps.map(|v| v * 3.6)
}

/// Pace in "clock" encoding: 5 min 33 s per km is `5.33`, not `5.55`.
pub fn pace_min_per_km(speed_mps: Option<f64>) -> Option<f64> {
    let v = speed_mps.filter(|v| *v > 0.0)?;
    let sec_per_km = 1000.0 / v;
    let minutes = (sec_per_km / 60.0).floor();
    let seconds = (sec_per_km % 60.0).round();
    Some(minutes + seconds / 100.0)
}
