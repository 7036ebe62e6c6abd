use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::ActivityStore;
use crate::types::activity::{ProcessedActivity, StoredActivity, StoredPoint};

#[derive(Clone, Default)]
pub struct MemoryStore {
    activities: Arc<DashMap<Uuid, StoredTrack>>,
}

struct StoredTrack {
    activity: StoredActivity,
    points: Vec<StoredPoint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed activities.
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert_activity(&self, activity: &ProcessedActivity) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let points: Vec<StoredPoint> = activity.points.iter().map(StoredPoint::from).collect();
        let trackpoints = points.len();

        // Rows are built up front so the single map insert is the commit.
        self.activities.insert(
            id,
            StoredTrack {
                activity: StoredActivity::from_summary(id, &activity.summary),
                points,
            },
        );

        tracing::info!(activity_id = %id, trackpoints, "Committed activity");
        Ok(id)
    }

    async fn fetch_activity(&self, id: Uuid) -> Result<StoredActivity, StoreError> {
        self.activities
            .get(&id)
            .map(|entry| entry.activity.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn fetch_points(&self, id: Uuid) -> Result<Vec<StoredPoint>, StoreError> {
        let mut points = self
            .activities
            .get(&id)
            .map(|entry| entry.points.clone())
            .unwrap_or_default();
        points.sort_by_key(|p| p.time);
        Ok(points)
    }

    async fn list_activities(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredActivity>, StoreError> {
        let mut items: Vec<StoredActivity> = self
            .activities
            .iter()
            .map(|entry| entry.activity.clone())
            .collect();
        items.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        Ok(items
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }
}
