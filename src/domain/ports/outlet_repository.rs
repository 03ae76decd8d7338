//! Outlet Repository Port
//!
//! Defines the interface for accessing the outlet registry.
//! Implementations may use SQLite or in-memory storage.

use crate::domain::entities::Outlet;
use async_trait::async_trait;

/// Repository for the outlet registry.
///
/// This is an outbound port that abstracts the backing store. The core
/// treats the snapshot returned by `list_active` as consistent enough
/// for one resolution request; no cross-request guarantee is offered,
/// and upsert atomicity is the store's responsibility.
#[async_trait]
pub trait OutletRepository: Send + Sync {
    /// All active outlets.
    async fn list_active(&self) -> Vec<Outlet>;

    /// Look up a single outlet by its registration id.
    async fn find_by_id(&self, id: &str) -> Option<Outlet>;

    /// Create or replace an outlet, keyed by its registration id.
    async fn upsert(&self, outlet: Outlet) -> anyhow::Result<Outlet>;
}
