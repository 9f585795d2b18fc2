//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres and the
//! [`NoteRepository`] implementation backed by it.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use notebox_core::{NewNote, Note, NoteFilter, NoteId, NoteUpdate, NoteboxResult, StorageError};
use notebox_storage::NoteRepository;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use tracing::info;

use crate::constants::NOTES_TABLE;
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait for a pooled connection at most this long
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "notebox".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("NOTEBOX_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("NOTEBOX_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("NOTEBOX_DB_NAME").unwrap_or_else(|_| "notebox".to_string()),
            user: std::env::var("NOTEBOX_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("NOTEBOX_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("NOTEBOX_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("NOTEBOX_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// POSTGRES NOTE REPOSITORY
// ============================================================================

const NOTE_COLUMNS: &str = "id, title, body, tags, created_at, updated_at, is_deleted, deleted_at";

/// Note repository backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool,
}

impl PgNoteRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a repository from configuration. Does not connect.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> NoteboxResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StorageError::Unavailable {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Create the notes table and its listing index if missing.
    pub async fn ensure_schema(&self) -> NoteboxResult<()> {
        let conn = self.get_conn().await?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(100) NOT NULL,
                body TEXT NOT NULL,
                tags TEXT[] NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                deleted_at TIMESTAMPTZ
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table} (created_at DESC, id DESC);",
            table = NOTES_TABLE
        );
        conn.batch_execute(&ddl).await.map_err(query_failed)?;
        info!(table = NOTES_TABLE, "Database schema ready");
        Ok(())
    }
}

fn query_failed(err: tokio_postgres::Error) -> notebox_core::NoteboxError {
    tracing::error!("Database error: {:?}", err);
    StorageError::QueryFailed {
        reason: err.to_string(),
    }
    .into()
}

fn row_to_note(row: &Row) -> NoteboxResult<Note> {
    Ok(Note {
        id: row.try_get("id").map_err(query_failed)?,
        title: row.try_get("title").map_err(query_failed)?,
        body: row.try_get("body").map_err(query_failed)?,
        tags: row.try_get("tags").map_err(query_failed)?,
        created_at: row.try_get("created_at").map_err(query_failed)?,
        updated_at: row.try_get("updated_at").map_err(query_failed)?,
        is_deleted: row.try_get("is_deleted").map_err(query_failed)?,
        deleted_at: row.try_get("deleted_at").map_err(query_failed)?,
    })
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, input: NewNote) -> NoteboxResult<Note> {
        let conn = self.get_conn().await?;
        let tags = input.stored_tags();
        let sql = format!(
            "INSERT INTO {} (title, body, tags) VALUES ($1, $2, $3) RETURNING {}",
            NOTES_TABLE, NOTE_COLUMNS
        );
        let row = conn
            .query_one(sql.as_str(), &[&input.title, &input.body, &tags])
            .await
            .map_err(query_failed)?;
        row_to_note(&row)
    }

    async fn get(&self, id: NoteId, include_deleted: bool) -> NoteboxResult<Option<Note>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND ($2 OR NOT is_deleted)",
            NOTE_COLUMNS, NOTES_TABLE
        );
        let row = conn
            .query_opt(sql.as_str(), &[&id, &include_deleted])
            .await
            .map_err(query_failed)?;
        row.as_ref().map(row_to_note).transpose()
    }

    async fn list(&self, filter: &NoteFilter) -> NoteboxResult<Vec<Note>> {
        let conn = self.get_conn().await?;
        let tag: Option<&str> = filter.tag.as_deref().filter(|s| !s.is_empty());
        let title: Option<String> = filter
            .title_contains
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(escape_like);
        let sql = format!(
            "SELECT {} FROM {}
             WHERE ($1 OR NOT is_deleted)
               AND ($2::text IS NULL OR $2 = ANY(tags))
               AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%' ESCAPE '\\')
             ORDER BY created_at DESC, id DESC",
            NOTE_COLUMNS, NOTES_TABLE
        );
        let rows = conn
            .query(sql.as_str(), &[&filter.include_deleted, &tag, &title])
            .await
            .map_err(query_failed)?;
        rows.iter().map(row_to_note).collect()
    }

    async fn update(&self, id: NoteId, update: NoteUpdate) -> NoteboxResult<Option<Note>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE {} SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                tags = COALESCE($4, tags),
                updated_at = now()
             WHERE id = $1 AND NOT is_deleted
             RETURNING {}",
            NOTES_TABLE, NOTE_COLUMNS
        );
        let row = conn
            .query_opt(sql.as_str(), &[&id, &update.title, &update.body, &update.tags])
            .await
            .map_err(query_failed)?;
        row.as_ref().map(row_to_note).transpose()
    }

    async fn soft_delete(&self, note: Note) -> NoteboxResult<Note> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE {} SET
                is_deleted = TRUE,
                deleted_at = COALESCE(deleted_at, now()),
                updated_at = CASE WHEN is_deleted THEN updated_at ELSE now() END
             WHERE id = $1
             RETURNING {}",
            NOTES_TABLE, NOTE_COLUMNS
        );
        let row = conn
            .query_opt(sql.as_str(), &[&note.id])
            .await
            .map_err(query_failed)?
            .ok_or(StorageError::NotFound { id: note.id })?;
        row_to_note(&row)
    }

    async fn ping(&self) -> NoteboxResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_failed)?;
        Ok(())
    }
}
