use crate::error::ProcessError;
use crate::pipeline::timestamp;
use crate::types::activity::{
    elapsed_seconds, ActivitySummary, BoundingBox, EnrichedPoint, ProcessedActivity, RawPoint,
};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Single pass over the flattened points: drops untimed points, derives speed
/// against the previous surviving point and accumulates the summary.
pub fn process(raw: &[RawPoint]) -> Result<ProcessedActivity, ProcessError> {
    if raw.len() < 2 {
        return Err(ProcessError::InsufficientPoints(raw.len()));
    }

    let mut points: Vec<EnrichedPoint> = Vec::with_capacity(raw.len());
    let mut bounds: Option<BoundingBox> = None;
    let mut distance_m = 0.0;
    let mut hr_sum = 0i64;
    let mut hr_count = 0i64;
    let mut max_hr: Option<i32> = None;
    let mut prev: Option<usize> = None;

    for point in raw {
        let Some(time) = timestamp::normalize(&point.time) else {
            continue;
        };

        match bounds.as_mut() {
            Some(b) => b.extend(point.lat, point.lon),
            None => bounds = Some(BoundingBox::around(point.lat, point.lon)),
        }

        if let Some(hr) = point.heart_rate {
            hr_sum += i64::from(hr);
            hr_count += 1;
            max_hr = Some(max_hr.map_or(hr, |m| m.max(hr)));
        }

        let mut speed_mps = None;
        if let Some(prev_point) = prev.map(|i| &points[i]) {
            let d = haversine_m(prev_point.lat, prev_point.lon, point.lat, point.lon);
            let dt = elapsed_seconds(prev_point.time, time);
            if dt > 0.0 {
                speed_mps = Some(d / dt);
                distance_m += d;
            }
        }

        points.push(EnrichedPoint {
            time,
            lat: point.lat,
            lon: point.lon,
            elevation: point.elevation,
            heart_rate: point.heart_rate,
            speed_mps,
        });
        prev = Some(points.len() - 1);
    }

    let dropped = raw.len() - points.len();
    if dropped > 0 {
        tracing::debug!("Dropped {} of {} points without a parsable timestamp", dropped, raw.len());
    }

    let (first, last, bounds) = match (points.first(), points.last(), bounds) {
        (Some(first), Some(last), Some(bounds)) if points.len() >= 2 => (first, last, bounds),
        _ => return Err(ProcessError::InsufficientTimedPoints(points.len())),
    };

    let duration_sec = (last.time - first.time).num_seconds().max(0);
    let avg_heart_rate = if hr_count > 0 {
        Some((hr_sum as f64 / hr_count as f64).round() as i32)
    } else {
        None
    };

    let summary = ActivitySummary {
        started_at: first.time,
        duration_sec,
        distance_m,
        bounds,
        avg_heart_rate,
        max_heart_rate: max_hr,
    };

    Ok(ProcessedActivity { summary, points })
}

/// Great-circle distance in meters on a sphere of radius 6 371 km.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(lat: f64, lon: f64, time: &str, hr: Option<i32>) -> RawPoint {
        RawPoint {
            lat,
            lon,
            elevation: None,
            heart_rate: hr,
            time: time.to_string(),
        }
    }

    #[test]
    fn haversine_is_symmetric_and_zero_on_identity() {
        let a = (37.8199, -122.4783);
        let b = (37.8078, -122.4750);
        assert_eq!(haversine_m(a.0, a.1, b.0, b.1), haversine_m(b.0, b.1, a.0, a.1));
        assert_eq!(haversine_m(a.0, a.1, a.0, a.1), 0.0);
    }

    #[test]
    fn haversine_matches_known_distance() {
        let d = haversine_m(37.8199, -122.4783, 37.8078, -122.4750);
        assert!((d - 1350.0).abs() < 50.0, "distance {d}");
    }

    #[test]
    fn two_points_ten_seconds_apart() {
        let points = [
            raw(52.5200, 13.4050, "2026-01-01T12:00:00Z", None),
            raw(52.5205, 13.4060, "2026-01-01T12:00:10Z", None),
        ];
        let processed = process(&points).unwrap();
        let expected = haversine_m(52.5200, 13.4050, 52.5205, 13.4060);

        assert_eq!(processed.summary.duration_sec, 10);
        assert!((processed.summary.distance_m - expected).abs() < 1e-9);
        assert_eq!(processed.points[0].speed_mps, None);
        let speed = processed.points[1].speed_mps.unwrap();
        assert!((speed - expected / 10.0).abs() < 1e-9);
        assert_eq!(processed.summary.avg_heart_rate, None);
        assert_eq!(processed.summary.max_heart_rate, None);
    }

    #[test]
    fn compact_offset_timestamps_with_fraction_are_timed() {
        let points = [
            raw(52.5200, 13.4050, "2026-01-01T12:00:05.000+0200", None),
            raw(52.5205, 13.4060, "2026-01-01T12:00:15.000+0200", None),
        ];
        let processed = process(&points).unwrap();

        assert_eq!(processed.summary.duration_sec, 10);
        assert_eq!(
            processed.summary.started_at,
            timestamp::normalize("2026-01-01T10:00:05Z").unwrap()
        );
    }

    #[test]
    fn untimed_points_are_skipped_entirely() {
        let points = [
            raw(10.0, 10.0, "2026-01-01T12:00:00Z", Some(100)),
            raw(80.0, 80.0, "garbage", Some(200)),
            raw(10.001, 10.0, "2026-01-01T12:00:10Z", Some(110)),
        ];
        let processed = process(&points).unwrap();

        assert_eq!(processed.points.len(), 2);
        assert_eq!(processed.summary.bounds.max_lat, 10.001);
        assert_eq!(processed.summary.bounds.max_lon, 10.0);
        assert_eq!(processed.summary.max_heart_rate, Some(110));
        assert_eq!(processed.summary.avg_heart_rate, Some(105));
        let expected = haversine_m(10.0, 10.0, 10.001, 10.0);
        assert!((processed.summary.distance_m - expected).abs() < 1e-9);
    }

    #[test]
    fn non_positive_interval_keeps_point_without_speed() {
        let points = [
            raw(0.0, 0.0, "2026-01-01T12:00:10Z", None),
            raw(0.0, 0.001, "2026-01-01T12:00:10Z", None),
            raw(0.0, 0.002, "2026-01-01T12:00:05Z", None),
            raw(0.0, 0.003, "2026-01-01T12:00:15Z", None),
        ];
        let processed = process(&points).unwrap();

        assert_eq!(processed.points.len(), 4);
        assert_eq!(processed.points[1].speed_mps, None);
        assert_eq!(processed.points[2].speed_mps, None);
        assert!(processed.points[3].speed_mps.is_some());
        let expected = haversine_m(0.0, 0.002, 0.0, 0.003);
        assert!((processed.summary.distance_m - expected).abs() < 1e-9);
        assert_eq!(processed.summary.duration_sec, 5);
    }

    #[test]
    fn duration_floors_at_zero() {
        let points = [
            raw(0.0, 0.0, "2026-01-01T12:00:10Z", None),
            raw(0.0, 0.001, "2026-01-01T12:00:00Z", None),
        ];
        let processed = process(&points).unwrap();
        assert_eq!(processed.summary.duration_sec, 0);
        assert_eq!(processed.summary.distance_m, 0.0);
    }

    #[test]
    fn average_heart_rate_rounds_half_away_from_zero() {
        let points = [
            raw(0.0, 0.0, "2026-01-01T12:00:00Z", Some(140)),
            raw(0.0, 0.001, "2026-01-01T12:00:01Z", Some(141)),
            raw(0.0, 0.002, "2026-01-01T12:00:02Z", None),
        ];
        let processed = process(&points).unwrap();
        assert_eq!(processed.summary.avg_heart_rate, Some(141));
        assert_eq!(processed.summary.max_heart_rate, Some(141));
    }

    #[test]
    fn rejects_too_few_points() {
        let one = [raw(0.0, 0.0, "2026-01-01T12:00:00Z", None)];
        assert!(matches!(process(&one), Err(ProcessError::InsufficientPoints(1))));

        let one_timed = [
            raw(0.0, 0.0, "2026-01-01T12:00:00Z", None),
            raw(0.0, 0.001, "yesterday", None),
        ];
        assert!(matches!(
            process(&one_timed),
            Err(ProcessError::InsufficientTimedPoints(1))
        ));
    }
}
