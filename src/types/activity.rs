use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `<trkpt>` as it appears in the uploaded file. The timestamp is kept as
/// text until the kinematics pass normalizes it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub heart_rate: Option<i32>,
    pub time: String,
}

/// A point that survived timestamp normalization, with its derived speed.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPoint {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub heart_rate: Option<i32>,
    pub speed_mps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            min_lon: lon,
            max_lat: lat,
            max_lon: lon,
        }
    }

    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Closed polygon ring in lon/lat order, as accepted by `ST_GeogFromText`.
    pub fn to_wkt(&self) -> String {
        format!(
            "POLYGON(({0:.6} {1:.6},{2:.6} {1:.6},{2:.6} {3:.6},{0:.6} {3:.6},{0:.6} {1:.6}))",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    pub started_at: DateTime<Utc>,
    pub duration_sec: i64,
    pub distance_m: f64,
    pub bounds: BoundingBox,
    pub avg_heart_rate: Option<i32>,
    pub max_heart_rate: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ProcessedActivity {
    pub summary: ActivitySummary,
    pub points: Vec<EnrichedPoint>,
}

/// Summary row as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredActivity {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub sport: Option<String>,
    pub duration_sec: Option<i32>,
    pub distance_m: Option<i32>,
    pub avg_hr: Option<i32>,
    pub max_hr: Option<i32>,
}

impl StoredActivity {
    pub fn from_summary(id: Uuid, summary: &ActivitySummary) -> Self {
        Self {
            id,
            started_at: summary.started_at,
            sport: None,
            duration_sec: i32::try_from(summary.duration_sec).ok(),
            distance_m: Some(summary.distance_m as i32),
            avg_hr: summary.avg_heart_rate,
            max_hr: summary.max_heart_rate,
        }
    }
}

/// Trackpoint row as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub time: DateTime<Utc>,
    pub elevation: Option<f64>,
    pub heart_rate: Option<i32>,
    pub speed_mps: Option<f64>,
    pub lon: f64,
    pub lat: f64,
}

impl From<&EnrichedPoint> for StoredPoint {
    fn from(point: &EnrichedPoint) -> Self {
        Self {
            time: point.time,
            elevation: point.elevation,
            heart_rate: point.heart_rate,
            speed_mps: point.speed_mps,
            lon: point.lon,
            lat: point.lat,
        }
    }
}

/// Seconds from `from` to `to` at microsecond resolution; negative when `to`
/// is earlier.
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    delta
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| delta.num_seconds() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Gpx,
}

impl FileFormat {
    /// Uploads without an extension are treated as GPX.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return Some(FileFormat::Gpx);
        };
        match ext.to_lowercase().as_str() {
            "gpx" => Some(FileFormat::Gpx),
            _ => None,
        }
    }
}
