use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::activity::StoredActivity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub sport: Option<String>,
    pub duration_sec: Option<i32>,
    pub distance_m: Option<i32>,
    pub avg_hr: Option<i32>,
    pub max_hr: Option<i32>,
}

impl From<StoredActivity> for SummaryView {
    fn from(activity: StoredActivity) -> Self {
        Self {
            started_at: activity.started_at,
            sport: activity.sport,
            duration_sec: activity.duration_sec,
            distance_m: activity.distance_m,
            avg_hr: activity.avg_hr,
            max_hr: activity.max_hr,
        }
    }
}

/// Index-aligned chart series. Absent values serialize as `null` so every
/// array has the same length as the coordinate list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    pub time_iso: Vec<String>,
    pub elapsed_sec: Vec<f64>,
    pub elevation: Vec<Option<f64>>,
    pub hr: Vec<Option<i32>>,
    pub speed_mps: Vec<Option<f64>>,
    pub speed_kmh: Vec<Option<f64>>,
    pub pace_min_per_km: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResponse {
    pub id: Uuid,
    pub summary: SummaryView,
    /// GeoJSON `Feature` with a `LineString` geometry and empty properties.
    pub geojson: geojson::Feature,
    pub series: Series,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPage {
    pub limit: i64,
    pub offset: i64,
    pub items: Vec<StoredActivity>,
}
