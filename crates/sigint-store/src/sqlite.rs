//! SQLite backend

use sigint_core::{Coordinates, DataPoint};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::backend::NodeStore;
use crate::error::StoreError;
use crate::schema::CREATE_STATEMENTS;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        // one writer; the worker is the only user
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        for stmt in CREATE_STATEMENTS {
            sqlx::query(*stmt).execute(&pool).await?;
        }

        info!(path = %path.display(), "Opened database");
        Ok(Self { pool })
    }

    pub async fn node_id(&self, addr: &str) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM nodes WHERE addr = ?")
            .bind(addr)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn node_count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn observation_count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM datapoints")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Observations of a node ordered by capture time
    pub async fn data_points(&self, node_id: i64) -> Result<Vec<DataPoint>, StoreError> {
        let rows: Vec<(i64, i64, i64, f64, f64)> = sqlx::query_as(
            "SELECT time, frequency, signal, latitude, longitude
             FROM datapoints WHERE node_id = ? ORDER BY time, signal",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(time, frequency, signal, lat, lon)| DataPoint {
                signal: signal as i32,
                frequency: frequency as u32,
                timestamp: time as u64,
                location: Coordinates {
                    lat: lat as f32,
                    lon: lon as f32,
                },
            })
            .collect())
    }
}

impl NodeStore for SqliteStore {
    async fn find_or_create_node(&mut self, addr: &str) -> Result<i64, StoreError> {
        if let Some(id) = self.node_id(addr).await? {
            return Ok(id);
        }
        let result = sqlx::query("INSERT INTO nodes(addr) VALUES(?)")
            .bind(addr)
            .execute(&self.pool)
            .await?;
        let id = result.last_insert_rowid();
        debug!(addr, id, "Created node");
        Ok(id)
    }

    async fn insert_data_point(&mut self, node_id: i64, data_point: &DataPoint) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO datapoints(time, frequency, signal, longitude, latitude, node_id)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(data_point.timestamp as i64)
        .bind(i64::from(data_point.frequency))
        .bind(i64::from(data_point.signal))
        .bind(f64::from(data_point.location.lon))
        .bind(f64::from(data_point.location.lat))
        .bind(node_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn close(self) {
        self.pool.close().await;
    }
}
