use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::ActivityStore;
use crate::types::activity::{ProcessedActivity, StoredActivity, StoredPoint};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn activity_from_row(row: &PgRow) -> Result<StoredActivity, sqlx::Error> {
    Ok(StoredActivity {
        id: row.try_get("id")?,
        started_at: row.try_get("started_at")?,
        sport: row.try_get("sport")?,
        duration_sec: row.try_get("duration_sec")?,
        distance_m: row.try_get("distance_m")?,
        avg_hr: row.try_get("avg_hr")?,
        max_hr: row.try_get("max_hr")?,
    })
}

#[async_trait]
impl ActivityStore for PgStore {
    async fn insert_activity(&self, activity: &ProcessedActivity) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let row = StoredActivity::from_summary(id, &activity.summary);

        // Dropping `tx` without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO activities (
                id,
                started_at,
                sport,
                duration_sec,
                distance_m,
                avg_hr,
                max_hr,
                bounds
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, ST_GeogFromText($8))
            "#,
        )
        .bind(row.id)
        .bind(row.started_at)
        .bind(&row.sport)
        .bind(row.duration_sec)
        .bind(row.distance_m)
        .bind(row.avg_hr)
        .bind(row.max_hr)
        .bind(activity.summary.bounds.to_wkt())
        .execute(&mut *tx)
        .await?;

        let n = activity.points.len();
        let mut times: Vec<DateTime<Utc>> = Vec::with_capacity(n);
        let mut elevations: Vec<Option<f64>> = Vec::with_capacity(n);
        let mut heart_rates: Vec<Option<i32>> = Vec::with_capacity(n);
        let mut speeds: Vec<Option<f64>> = Vec::with_capacity(n);
        let mut lons: Vec<f64> = Vec::with_capacity(n);
        let mut lats: Vec<f64> = Vec::with_capacity(n);
        for point in &activity.points {
            times.push(point.time);
            elevations.push(point.elevation);
            heart_rates.push(point.heart_rate);
            speeds.push(point.speed_mps);
            lons.push(point.lon);
            lats.push(point.lat);
        }

        // One statement for the whole track instead of a round trip per point.
        let inserted = sqlx::query(
            r#"
            INSERT INTO trackpoints (activity_id, t, ele_m, hr, speed_mps, geom)
            SELECT
                $1,
                p.t,
                p.ele_m,
                p.hr,
                p.speed_mps,
                ST_SetSRID(ST_MakePoint(p.lon, p.lat), 4326)::geography
            FROM UNNEST(
                $2::timestamptz[],
                $3::float8[],
                $4::int4[],
                $5::float8[],
                $6::float8[],
                $7::float8[]
            ) AS p(t, ele_m, hr, speed_mps, lon, lat)
            "#,
        )
        .bind(id)
        .bind(times)
        .bind(elevations)
        .bind(heart_rates)
        .bind(speeds)
        .bind(lons)
        .bind(lats)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            activity_id = %id,
            trackpoints = inserted.rows_affected(),
            "Committed activity"
        );
        Ok(id)
    }

    async fn fetch_activity(&self, id: Uuid) -> Result<StoredActivity, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, started_at, sport, duration_sec, distance_m, avg_hr, max_hr
            FROM activities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(activity_from_row(&row)?),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn fetch_points(&self, id: Uuid) -> Result<Vec<StoredPoint>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                t,
                ele_m,
                hr,
                speed_mps,
                ST_X(geom::geometry) AS lon,
                ST_Y(geom::geometry) AS lat
            FROM trackpoints
            WHERE activity_id = $1
            ORDER BY t, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let points = rows
            .iter()
            .map(|row| -> Result<StoredPoint, sqlx::Error> {
                Ok(StoredPoint {
                    time: row.try_get("t")?,
                    elevation: row.try_get("ele_m")?,
                    heart_rate: row.try_get("hr")?,
                    speed_mps: row.try_get("speed_mps")?,
                    lon: row.try_get("lon")?,
                    lat: row.try_get("lat")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(points)
    }

    async fn list_activities(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredActivity>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, started_at, sport, duration_sec, distance_m, avg_hr, max_hr
            FROM activities
            ORDER BY started_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(activity_from_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(items)
    }
}
