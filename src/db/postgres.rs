use crate::db::database::Database;
use crate::db::error::DatabaseError;
use crate::db::models::{Device, DeviceStatus, DeviceUpdate, NewDevice, UserDeviceStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, error, info};

/// A PostgreSQL implementation of the Database trait
pub struct PostgresDatabase {
    pool: PgPool,
    schema: Option<String>,
}

impl PostgresDatabase {
    /// Create a new PostgresDatabase with the given connection URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        Self::new_with_schema(database_url, max_connections, None).await
    }

    /// Create a new PostgresDatabase with a specific schema namespace.
    /// Used by integration tests to isolate their tables.
    pub async fn new_with_schema(
        database_url: &str,
        max_connections: u32,
        schema: Option<String>,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(60))
            .connect_lazy(database_url)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                DatabaseError::ConnectionError(e.to_string())
            })?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            error!("Database connectivity test failed: {}", e);
            return Err(DatabaseError::ConnectionError(format!(
                "Database is not accessible: {}",
                e
            )));
        };

        let db = PostgresDatabase { pool, schema };
        db.initialize_tables().await?;

        info!("PostgreSQL database connection established successfully");
        Ok(db)
    }

    /// Create the schema (when namespaced) and all tables if they do not
    /// exist yet
    async fn initialize_tables(&self) -> Result<(), DatabaseError> {
        if let Some(ref schema_name) = self.schema {
            info!("Initializing schema: {}", schema_name);
            let create_schema_query = format!("CREATE SCHEMA IF NOT EXISTS {}", schema_name);
            debug!("Executing: {}", create_schema_query);
            sqlx::query(&create_schema_query)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to create schema '{}': {}", schema_name, e);
                    DatabaseError::QueryError(format!("Failed to create schema: {}", e))
                })?;
        }

        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    serial_number TEXT NOT NULL UNIQUE,
                    type INTEGER NOT NULL,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL
                )
                "#,
                self.table_name("device")
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    device_id BIGINT PRIMARY KEY,
                    status JSONB NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL
                )
                "#,
                self.table_name("device_status")
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    device_id BIGINT NOT NULL,
                    status JSONB NOT NULL,
                    timestamp TIMESTAMPTZ NOT NULL
                )
                "#,
                self.table_name("device_log")
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS device_log_device_id_timestamp_idx ON {} (device_id, timestamp)",
                self.table_name("device_log")
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    user_id BIGINT NOT NULL,
                    device_id BIGINT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL,
                    UNIQUE (user_id, device_id)
                )
                "#,
                self.table_name("user_devices")
            ),
        ];

        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                error!("Failed to initialize tables: {}", e);
                DatabaseError::QueryError(format!("Failed to initialize tables: {}", e))
            })?;
        }

        Ok(())
    }

    /// Get a table name with the schema prefix if applicable
    fn table_name(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, table),
            None => table.to_string(),
        }
    }

    fn device_from_row(row: &PgRow) -> Result<Device, DatabaseError> {
        Ok(Device {
            id: row
                .try_get("id")
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            name: row
                .try_get("name")
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            serial_number: row
                .try_get("serial_number")
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            device_type: row
                .try_get("type")
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            is_active: row
                .try_get("is_active")
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
        })
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<Device>, DatabaseError> {
        debug!("Looking up device by serial: {}", serial);

        let query = format!(
            "SELECT id, name, serial_number, type, is_active, created_at FROM {} WHERE serial_number = $1",
            self.table_name("device")
        );

        let row = sqlx::query(&query)
            .bind(serial)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Device lookup failed for serial {}: {}", serial, e);
                DatabaseError::QueryError(e.to_string())
            })?;

        row.as_ref().map(Self::device_from_row).transpose()
    }

    async fn find_or_create_device(&self, device: NewDevice) -> Result<Device, DatabaseError> {
        debug!(
            "Finding or creating device with serial: {}",
            device.serial_number
        );

        // The no-op DO UPDATE makes RETURNING yield the row on both paths,
        // so concurrent callers for the same serial all see the same id.
        let query = format!(
            r#"
            INSERT INTO {} (name, serial_number, type, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (serial_number) DO UPDATE SET serial_number = EXCLUDED.serial_number
            RETURNING id, name, serial_number, type, is_active, created_at
            "#,
            self.table_name("device")
        );

        let row = sqlx::query(&query)
            .bind(&device.name)
            .bind(&device.serial_number)
            .bind(device.device_type)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Find-or-create failed for serial {}: {}",
                    device.serial_number, e
                );
                DatabaseError::QueryError(e.to_string())
            })?;

        let device = Self::device_from_row(&row)?;
        info!(
            "Resolved device id={} for serial {}",
            device.id, device.serial_number
        );
        Ok(device)
    }

    async fn record_status(
        &self,
        device_id: i64,
        payload: &serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        debug!("Recording status for device id={}", device_id);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to open transaction: {}", e);
            DatabaseError::QueryError(e.to_string())
        })?;

        let upsert_query = format!(
            r#"
            INSERT INTO {} (device_id, status, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (device_id) DO UPDATE
                SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            "#,
            self.table_name("device_status")
        );

        sqlx::query(&upsert_query)
            .bind(device_id)
            .bind(payload)
            .bind(recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Status upsert failed for device id={}: {}", device_id, e);
                DatabaseError::QueryError(e.to_string())
            })?;

        let log_query = format!(
            "INSERT INTO {} (device_id, status, timestamp) VALUES ($1, $2, $3)",
            self.table_name("device_log")
        );

        sqlx::query(&log_query)
            .bind(device_id)
            .bind(payload)
            .bind(recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Log append failed for device id={}: {}", device_id, e);
                DatabaseError::QueryError(e.to_string())
            })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit status writes: {}", e);
            DatabaseError::QueryError(e.to_string())
        })?;

        info!("Recorded status for device id={}", device_id);
        Ok(())
    }

    async fn get_status(&self, device_id: i64) -> Result<Option<DeviceStatus>, DatabaseError> {
        debug!("Fetching status for device id={}", device_id);

        let query = format!(
            "SELECT device_id, status, updated_at FROM {} WHERE device_id = $1",
            self.table_name("device_status")
        );

        let row = sqlx::query(&query)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Status fetch failed for device id={}: {}", device_id, e);
                DatabaseError::QueryError(e.to_string())
            })?;

        row.map(|row| {
            Ok(DeviceStatus {
                device_id: row
                    .try_get("device_id")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                status: row
                    .try_get("status")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                updated_at: row
                    .try_get("updated_at")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn link_user_device(&self, user_id: i64, device_id: i64) -> Result<(), DatabaseError> {
        debug!("Linking user {} to device id={}", user_id, device_id);

        let query = format!(
            r#"
            INSERT INTO {} (user_id, device_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id, device_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            "#,
            self.table_name("user_devices")
        );

        sqlx::query(&query)
            .bind(user_id)
            .bind(device_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Failed to link user {} to device id={}: {}",
                    user_id, device_id, e
                );
                DatabaseError::QueryError(e.to_string())
            })?;

        Ok(())
    }

    async fn list_devices_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserDeviceStatus>, DatabaseError> {
        debug!("Listing devices for user {}", user_id);

        let query = format!(
            r#"
            SELECT
                ud.device_id,
                EXTRACT(EPOCH FROM ud.updated_at)::BIGINT AS updated_at,
                COALESCE(ds.status, '{{}}'::jsonb) AS status
            FROM {} ud
            LEFT JOIN {} ds ON ud.device_id = ds.device_id
            WHERE ud.user_id = $1
            ORDER BY ud.device_id ASC
            "#,
            self.table_name("user_devices"),
            self.table_name("device_status")
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Device listing failed for user {}: {}", user_id, e);
                DatabaseError::QueryError(e.to_string())
            })?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(UserDeviceStatus {
                device_id: row
                    .try_get("device_id")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                updated_at: row
                    .try_get("updated_at")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                status: row
                    .try_get("status")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            });
        }

        info!("Found {} devices for user {}", result.len(), user_id);
        Ok(result)
    }

    async fn update_device(
        &self,
        device_id: i64,
        update: DeviceUpdate,
    ) -> Result<bool, DatabaseError> {
        debug!("Updating device id={}", device_id);

        // Build the SET clause from the provided fields only
        let mut set_clauses = Vec::new();
        let mut param_count = 1;
        if update.name.is_some() {
            set_clauses.push(format!("name = ${}", param_count));
            param_count += 1;
        }
        if update.serial_number.is_some() {
            set_clauses.push(format!("serial_number = ${}", param_count));
            param_count += 1;
        }
        if update.device_type.is_some() {
            set_clauses.push(format!("type = ${}", param_count));
            param_count += 1;
        }

        if set_clauses.is_empty() {
            return Err(DatabaseError::QueryError(
                "No fields to update".to_string(),
            ));
        }

        let query = format!(
            "UPDATE {} SET {} WHERE id = ${}",
            self.table_name("device"),
            set_clauses.join(", "),
            param_count
        );

        let mut query_builder = sqlx::query(&query);
        if let Some(name) = &update.name {
            query_builder = query_builder.bind(name);
        }
        if let Some(serial) = &update.serial_number {
            query_builder = query_builder.bind(serial);
        }
        if let Some(device_type) = update.device_type {
            query_builder = query_builder.bind(device_type);
        }
        query_builder = query_builder.bind(device_id);

        let result = query_builder.execute(&self.pool).await.map_err(|e| {
            error!("Device update failed for id={}: {}", device_id, e);
            DatabaseError::QueryError(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_device(&self, device_id: i64) -> Result<(), DatabaseError> {
        debug!("Deactivating device id={}", device_id);

        let query = format!(
            "UPDATE {} SET is_active = FALSE WHERE id = $1",
            self.table_name("device")
        );

        sqlx::query(&query)
            .bind(device_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Device deactivation failed for id={}: {}", device_id, e);
                DatabaseError::QueryError(e.to_string())
            })?;

        info!("Device id={} marked as inactive", device_id);
        Ok(())
    }

    #[cfg(test)]
    async fn log_entries(
        &self,
        device_id: i64,
    ) -> Result<Vec<crate::db::models::DeviceLogEntry>, DatabaseError> {
        let query = format!(
            "SELECT device_id, status, timestamp FROM {} WHERE device_id = $1 ORDER BY timestamp ASC, id ASC",
            self.table_name("device_log")
        );

        let rows = sqlx::query(&query)
            .bind(device_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(crate::db::models::DeviceLogEntry {
                device_id: row
                    .try_get("device_id")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                status: row
                    .try_get("status")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                timestamp: row
                    .try_get("timestamp")
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            });
        }
        Ok(result)
    }
}
