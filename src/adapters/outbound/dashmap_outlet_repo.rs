//! DashMap Outlet Repository
//!
//! Implements OutletRepository using DashMap for lock-free concurrent
//! access. The default registry when no database path is configured.

use crate::domain::entities::Outlet;
use crate::domain::ports::OutletRepository;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory, DashMap-backed outlet registry.
pub struct DashMapOutletRepository {
    outlets: Arc<DashMap<String, Outlet>>,
}

impl DashMapOutletRepository {
    pub fn new() -> Self {
        Self {
            outlets: Arc::new(DashMap::new()),
        }
    }

    /// Total number of outlets, active or not.
    pub fn count(&self) -> usize {
        self.outlets.len()
    }
}

impl Default for DashMapOutletRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutletRepository for DashMapOutletRepository {
    async fn list_active(&self) -> Vec<Outlet> {
        self.outlets
            .iter()
            .filter(|e| e.value().active)
            .map(|e| e.value().clone())
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Option<Outlet> {
        self.outlets.get(id).map(|e| e.value().clone())
    }

    async fn upsert(&self, outlet: Outlet) -> anyhow::Result<Outlet> {
        self.outlets.insert(outlet.id.clone(), outlet.clone());
        Ok(outlet)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::entities::tests::outlet;

    #[tokio::test]
    async fn test_upsert_and_find() {
        let repo = DashMapOutletRepository::new();
        repo.upsert(outlet("12345678000195", "Centro", -23.55, -46.63))
            .await
            .unwrap();

        let found = repo.find_by_id("12345678000195").await.unwrap();
        assert_eq!(found.name, "Centro");
    }

    #[tokio::test]
    async fn test_find_missing() {
        let repo = DashMapOutletRepository::new();
        assert!(repo.find_by_id("00000000000000").await.is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_id() {
        let repo = DashMapOutletRepository::new();
        repo.upsert(outlet("12345678000195", "Old", -23.55, -46.63))
            .await
            .unwrap();
        repo.upsert(outlet("12345678000195", "New", -23.55, -46.63))
            .await
            .unwrap();

        assert_eq!(repo.count(), 1);
        assert_eq!(repo.find_by_id("12345678000195").await.unwrap().name, "New");
    }

    #[tokio::test]
    async fn test_list_active_excludes_inactive() {
        let repo = DashMapOutletRepository::new();
        repo.upsert(outlet("11111111111111", "A", -23.55, -46.63))
            .await
            .unwrap();
        let mut inactive = outlet("22222222222222", "B", -23.55, -46.63);
        inactive.active = false;
        repo.upsert(inactive).await.unwrap();

        let active = repo.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "11111111111111");
    }

    #[tokio::test]
    async fn test_deactivation_is_a_flag_flip() {
        let repo = DashMapOutletRepository::new();
        repo.upsert(outlet("11111111111111", "A", -23.55, -46.63))
            .await
            .unwrap();

        let mut o = repo.find_by_id("11111111111111").await.unwrap();
        o.active = false;
        repo.upsert(o).await.unwrap();

        // Still findable by id, just not listed as active.
        assert!(repo.find_by_id("11111111111111").await.is_some());
        assert!(repo.list_active().await.is_empty());
    }
}
