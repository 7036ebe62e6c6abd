//! Persistence for imported activities.
//!
//! [`PgStore`] is the production backend (Postgres + PostGIS). [`MemoryStore`]
//! keeps everything in process and backs the HTTP tests and `STORE=memory`.

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::activity::{ProcessedActivity, StoredActivity, StoredPoint};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Writes the summary and every enriched point under a fresh id. Either
    /// all rows become visible or none do.
    async fn insert_activity(&self, activity: &ProcessedActivity) -> Result<Uuid, StoreError>;

    async fn fetch_activity(&self, id: Uuid) -> Result<StoredActivity, StoreError>;

    /// Points of one activity in ascending time order.
    async fn fetch_points(&self, id: Uuid) -> Result<Vec<StoredPoint>, StoreError>;

    /// Most recent activities first.
    async fn list_activities(&self, limit: i64, offset: i64)
        -> Result<Vec<StoredActivity>, StoreError>;
}

/// Runs a store operation under a deadline. The future is dropped on expiry,
/// which rolls back any transaction it holds and returns its connection.
pub async fn with_deadline<T, F>(deadline: Duration, op: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, op)
        .await
        .map_err(|_| StoreError::Timeout)?
}
