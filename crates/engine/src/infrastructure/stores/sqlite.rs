//! SQLite-backed farm world storage.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use farmwrld_domain::{LocationId, Position, SpawnPoint, WorldLocation};

use crate::infrastructure::ports::{
    ClockPort, FarmWorldRecord, FarmWorldRepo, LocationRecord, LocationRepo, StoreError,
};

/// SQLite implementation of the farm world and location repos.
///
/// Farm world records are stored as one JSON column per world; pooled
/// locations and instance spawns are flat rows. Location rows rely on rowid
/// order to preserve pool FIFO across restarts.
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStore {
    pub async fn new(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| StoreError::database("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS farm_worlds (
                name TEXT PRIMARY KEY,
                record TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::database("farm_worlds", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS farm_locations (
                id TEXT PRIMARY KEY,
                farm_world TEXT NOT NULL,
                world TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                z REAL NOT NULL,
                yaw REAL NOT NULL,
                pitch REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::database("farm_locations", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS instance_spawns (
                instance TEXT PRIMARY KEY,
                x REAL NOT NULL,
                y REAL NOT NULL,
                z REAL NOT NULL,
                yaw REAL NOT NULL,
                pitch REAL NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::database("instance_spawns", e))?;

        Ok(Self { pool, clock })
    }

    /// Expose the underlying pool for maintenance and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl FarmWorldRepo for SqliteStore {
    async fn save(&self, name: &str, record: &FarmWorldRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StoreError::serialization(e.to_string()))?;
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO farm_worlds (name, record, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database("farm_worlds", e))?;

        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<FarmWorldRecord>, StoreError> {
        let rows = sqlx::query("SELECT name, record FROM farm_worlds")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("farm_worlds", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("name");
            let json: String = row.get("record");
            match serde_json::from_str(&json) {
                Ok(record) => records.push(record),
                Err(err) => {
                    // Unreadable rows are skipped so one bad record cannot
                    // block startup.
                    tracing::warn!(farm_world = %name, error = %err, "Skipping unreadable farm world record");
                }
            }
        }
        Ok(records)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM farm_worlds WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("farm_worlds", e))?;
        Ok(())
    }

    async fn load_spawn(&self, instance: &str) -> Result<Option<SpawnPoint>, StoreError> {
        let row = sqlx::query(
            "SELECT x, y, z, yaw, pitch FROM instance_spawns WHERE instance = ?",
        )
        .bind(instance)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::database("instance_spawns", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let position = read_position(&row).ok_or_else(|| StoreError::stale("spawn", instance))?;
        Ok(Some(SpawnPoint::new(position)))
    }

    async fn save_spawn(&self, instance: &str, spawn: &SpawnPoint) -> Result<(), StoreError> {
        let now = self.clock.now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO instance_spawns (instance, x, y, z, yaw, pitch, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(instance) DO UPDATE SET
                x = excluded.x,
                y = excluded.y,
                z = excluded.z,
                yaw = excluded.yaw,
                pitch = excluded.pitch,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(instance)
        .bind(spawn.position.x)
        .bind(spawn.position.y)
        .bind(spawn.position.z)
        .bind(spawn.position.yaw)
        .bind(spawn.position.pitch)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database("instance_spawns", e))?;
        Ok(())
    }
}

#[async_trait]
impl LocationRepo for SqliteStore {
    async fn save(
        &self,
        farm_world: &str,
        id: LocationId,
        location: &WorldLocation,
    ) -> Result<(), StoreError> {
        let now = self.clock.now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO farm_locations (id, farm_world, world, x, y, z, yaw, pitch, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                farm_world = excluded.farm_world,
                world = excluded.world,
                x = excluded.x,
                y = excluded.y,
                z = excluded.z,
                yaw = excluded.yaw,
                pitch = excluded.pitch
            "#,
        )
        .bind(id.to_string())
        .bind(farm_world)
        .bind(&location.world)
        .bind(location.position.x)
        .bind(location.position.y)
        .bind(location.position.z)
        .bind(location.position.yaw)
        .bind(location.position.pitch)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database("farm_locations", e))?;
        Ok(())
    }

    async fn delete(&self, id: LocationId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM farm_locations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("farm_locations", e))?;
        Ok(())
    }

    async fn delete_all_for(&self, farm_world: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM farm_locations WHERE farm_world = ?")
            .bind(farm_world)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("farm_locations", e))?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, farm_world, world, x, y, z, yaw, pitch
            FROM farm_locations
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database("farm_locations", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_id: String = row.get("id");
            let Ok(uuid) = Uuid::parse_str(&raw_id) else {
                tracing::warn!(id = %raw_id, "Skipping location row with unreadable id");
                continue;
            };
            let Some(position) = read_position(&row) else {
                tracing::warn!(id = %raw_id, "Skipping location row with unreadable coordinates");
                continue;
            };
            records.push(LocationRecord {
                id: LocationId::from_uuid(uuid),
                farm_world: row.get("farm_world"),
                location: WorldLocation {
                    world: row.get("world"),
                    position,
                },
            });
        }
        Ok(records)
    }
}

fn read_position(row: &sqlx::sqlite::SqliteRow) -> Option<Position> {
    let x: f64 = row.try_get("x").ok()?;
    let y: f64 = row.try_get("y").ok()?;
    let z: f64 = row.try_get("z").ok()?;
    let yaw = row.try_get::<f64, _>("yaw").ok()? as f32;
    let pitch = row.try_get::<f64, _>("pitch").ok()? as f32;
    Some(Position::new(x, y, z).with_orientation(yaw, pitch))
}
