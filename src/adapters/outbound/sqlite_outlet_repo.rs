//! SQLite Outlet Repository
//!
//! Implements OutletRepository on rusqlite. Connections are opened per
//! operation inside `spawn_blocking`; the registry is small and the
//! write path is a single idempotent upsert, so connection pooling is
//! not worth the machinery here.

use crate::domain::entities::{ContactChannel, Outlet};
use crate::domain::ports::OutletRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS outlets (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    legal_name         TEXT,
    postal_code        TEXT,
    address            TEXT,
    neighborhood       TEXT,
    city               TEXT,
    region             TEXT,
    phone              TEXT,
    whatsapp           TEXT,
    preferred_channel  TEXT,
    latitude           REAL,
    longitude          REAL,
    active             INTEGER NOT NULL DEFAULT 1,
    service_radius_km  REAL,
    priority           INTEGER NOT NULL DEFAULT 0,
    serves_business    INTEGER NOT NULL DEFAULT 1,
    serves_residential INTEGER NOT NULL DEFAULT 1
)";

/// SQLite-backed outlet registry.
pub struct SqliteOutletRepository {
    db_path: String,
}

impl SqliteOutletRepository {
    /// Open (and create if needed) the registry database.
    pub async fn open(db_path: impl Into<String>) -> Result<Self> {
        let db_path = db_path.into();
        let path = db_path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&path)
                .with_context(|| format!("opening registry db at {path}"))?;
            conn.execute(SCHEMA, [])?;
            Ok(())
        })
        .await??;

        Ok(Self { db_path })
    }

    fn row_to_outlet(row: &Row) -> rusqlite::Result<Outlet> {
        Ok(Outlet {
            id: row.get(0)?,
            name: row.get(1)?,
            legal_name: row.get(2)?,
            postal_code: row.get(3)?,
            address: row.get(4)?,
            neighborhood: row.get(5)?,
            city: row.get(6)?,
            region: row.get(7)?,
            phone: row.get(8)?,
            whatsapp: row.get(9)?,
            preferred_channel: row
                .get::<_, Option<String>>(10)?
                .as_deref()
                .and_then(ContactChannel::parse),
            latitude: row.get(11)?,
            longitude: row.get(12)?,
            active: row.get::<_, i64>(13)? != 0,
            service_radius_km: row.get(14)?,
            priority: row.get::<_, i64>(15)? as i32,
            serves_business: row.get::<_, i64>(16)? != 0,
            serves_residential: row.get::<_, i64>(17)? != 0,
        })
    }

    const COLUMNS: &'static str = "id, name, legal_name, postal_code, address, neighborhood, \
         city, region, phone, whatsapp, preferred_channel, latitude, longitude, active, \
         service_radius_km, priority, serves_business, serves_residential";

    fn query_active(path: &str) -> Result<Vec<Outlet>> {
        let conn = Connection::open(path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM outlets WHERE active = 1",
            Self::COLUMNS
        ))?;
        let outlets = stmt
            .query_map([], Self::row_to_outlet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(outlets)
    }

    fn query_by_id(path: &str, id: &str) -> Result<Option<Outlet>> {
        let conn = Connection::open(path)?;
        let outlet = conn
            .query_row(
                &format!("SELECT {} FROM outlets WHERE id = ?1", Self::COLUMNS),
                params![id],
                Self::row_to_outlet,
            )
            .optional()?;
        Ok(outlet)
    }

    fn write_upsert(path: &str, outlet: &Outlet) -> Result<()> {
        let conn = Connection::open(path)?;
        conn.execute(
            "INSERT INTO outlets (id, name, legal_name, postal_code, address, neighborhood, \
             city, region, phone, whatsapp, preferred_channel, latitude, longitude, active, \
             service_radius_km, priority, serves_business, serves_residential) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, legal_name = excluded.legal_name, \
               postal_code = excluded.postal_code, address = excluded.address, \
               neighborhood = excluded.neighborhood, city = excluded.city, \
               region = excluded.region, phone = excluded.phone, \
               whatsapp = excluded.whatsapp, preferred_channel = excluded.preferred_channel, \
               latitude = excluded.latitude, longitude = excluded.longitude, \
               active = excluded.active, service_radius_km = excluded.service_radius_km, \
               priority = excluded.priority, serves_business = excluded.serves_business, \
               serves_residential = excluded.serves_residential",
            params![
                outlet.id,
                outlet.name,
                outlet.legal_name,
                outlet.postal_code,
                outlet.address,
                outlet.neighborhood,
                outlet.city,
                outlet.region,
                outlet.phone,
                outlet.whatsapp,
                outlet.preferred_channel.map(|c| c.as_str()),
                outlet.latitude,
                outlet.longitude,
                outlet.active as i64,
                outlet.service_radius_km,
                outlet.priority as i64,
                outlet.serves_business as i64,
                outlet.serves_residential as i64,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl OutletRepository for SqliteOutletRepository {
    async fn list_active(&self) -> Vec<Outlet> {
        let path = self.db_path.clone();
        match tokio::task::spawn_blocking(move || Self::query_active(&path)).await {
            Ok(Ok(outlets)) => outlets,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to read outlet registry");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "registry read task panicked");
                Vec::new()
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Option<Outlet> {
        let path = self.db_path.clone();
        let id = id.to_string();
        match tokio::task::spawn_blocking(move || Self::query_by_id(&path, &id)).await {
            Ok(Ok(outlet)) => outlet,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to read outlet by id");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "registry read task panicked");
                None
            }
        }
    }

    async fn upsert(&self, outlet: Outlet) -> Result<Outlet> {
        let path = self.db_path.clone();
        let to_write = outlet.clone();
        tokio::task::spawn_blocking(move || Self::write_upsert(&path, &to_write)).await??;
        Ok(outlet)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::entities::tests::outlet;
    use crate::domain::entities::ContactChannel;

    async fn temp_repo() -> (tempfile::TempDir, SqliteOutletRepository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outlets.db");
        let repo = SqliteOutletRepository::open(path.to_string_lossy().to_string())
            .await
            .unwrap();
        (dir, repo)
    }

    #[tokio::test]
    async fn test_roundtrip_all_fields() {
        let (_dir, repo) = temp_repo().await;

        let mut o = outlet("12345678000195", "Centro", -23.5505, -46.6333);
        o.legal_name = Some("Centro Ltda".into());
        o.postal_code = Some("01001000".into());
        o.phone = Some("+55 11 3333-4444".into());
        o.whatsapp = Some("+55 11 99999-0000".into());
        o.preferred_channel = Some(ContactChannel::Whatsapp);
        o.service_radius_km = Some(12.5);
        o.priority = 3;
        o.serves_business = false;

        repo.upsert(o).await.unwrap();

        let read = repo.find_by_id("12345678000195").await.unwrap();
        assert_eq!(read.legal_name.as_deref(), Some("Centro Ltda"));
        assert_eq!(read.preferred_channel, Some(ContactChannel::Whatsapp));
        assert_eq!(read.service_radius_km, Some(12.5));
        assert_eq!(read.priority, 3);
        assert!(!read.serves_business);
        assert!(read.serves_residential);
        assert_eq!(read.latitude, Some(-23.5505));
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let (_dir, repo) = temp_repo().await;

        repo.upsert(outlet("12345678000195", "Old", -23.55, -46.63))
            .await
            .unwrap();
        repo.upsert(outlet("12345678000195", "New", -22.90, -43.17))
            .await
            .unwrap();

        let read = repo.find_by_id("12345678000195").await.unwrap();
        assert_eq!(read.name, "New");
        assert_eq!(read.latitude, Some(-22.90));
        assert_eq!(repo.list_active().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_active_filters() {
        let (_dir, repo) = temp_repo().await;

        repo.upsert(outlet("11111111111111", "A", -23.55, -46.63))
            .await
            .unwrap();
        let mut inactive = outlet("22222222222222", "B", -23.55, -46.63);
        inactive.active = false;
        repo.upsert(inactive).await.unwrap();

        let active = repo.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "11111111111111");
        // Inactive outlet is retained, not deleted.
        assert!(repo.find_by_id("22222222222222").await.is_some());
    }

    #[tokio::test]
    async fn test_find_missing() {
        let (_dir, repo) = temp_repo().await;
        assert!(repo.find_by_id("00000000000000").await.is_none());
    }
}
