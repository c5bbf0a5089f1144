use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use hoops_core::{normalize, ColumnKind, EntityKind, Frame, TableSchema, Value};
use hoops_logging::{hoops_debug, hoops_info, hoops_warn};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Postgres, QueryBuilder, Sqlite};
use url::Url;

use super::{StorageBackend, StoreConfig, StoreError, WriteMode};

const MAX_CONNECTIONS: u32 = 2;

/// Bind parameters accepted by one statement.
const POSTGRES_BIND_LIMIT: usize = 65_535;
const SQLITE_BIND_LIMIT: usize = 32_766;

/// One chunk, one transaction.
macro_rules! write_chunk {
    ($pool:expr, $db:ty, $plan:expr, $chunk:expr, $replace:expr) => {{
        let mut tx = $pool.begin().await?;
        if $replace {
            sqlx::query(&$plan.drop_sql).execute(&mut *tx).await?;
        }
        sqlx::query(&$plan.create_sql).execute(&mut *tx).await?;
        let mut insert = QueryBuilder::<$db>::new(&$plan.insert_prefix);
        insert.push_values($chunk.rows().iter(), |mut binds, row: &Vec<Value>| {
            for (value, kind) in row.iter().zip(&$plan.kinds) {
                match kind {
                    ColumnKind::Text => {
                        binds.push_bind(value.as_text());
                    }
                    ColumnKind::Int => {
                        binds.push_bind(value.as_int());
                    }
                    ColumnKind::Float => {
                        binds.push_bind(value.as_float());
                    }
                    ColumnKind::Date => {
                        binds.push_bind(value.as_date());
                    }
                }
            }
        });
        insert.build().execute(&mut *tx).await?;
        tx.commit().await?;
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    fn bind_limit(self) -> usize {
        match self {
            DatabaseBackend::Postgres => POSTGRES_BIND_LIMIT,
            DatabaseBackend::Sqlite => SQLITE_BIND_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
enum Pool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Pool {
    fn backend(&self) -> DatabaseBackend {
        match self {
            Pool::Postgres(_) => DatabaseBackend::Postgres,
            Pool::Sqlite(_) => DatabaseBackend::Sqlite,
        }
    }
}

enum Candidate {
    Primary(String),
    Fallback(PathBuf),
}

impl Candidate {
    fn label(&self) -> String {
        match self {
            Candidate::Primary(url) => redact(url),
            Candidate::Fallback(path) => format!("sqlite:{}", path.display()),
        }
    }
}

/// Relational store: PostgreSQL when reachable, otherwise an embedded
/// SQLite file.
///
/// Each chunk of a save is written in its own transaction. Replace mode
/// drops and recreates the table inside the first chunk's transaction; later
/// chunks of the same call always append.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    pool: Pool,
    location: String,
    schema: Option<String>,
    config: StoreConfig,
    fell_back: bool,
}

impl DatabaseStore {
    /// Opens the primary store, falling back to the embedded one.
    ///
    /// Fails only when neither can be opened.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let mut candidates = Vec::new();
        if !config.url.trim().is_empty() {
            candidates.push(Candidate::Primary(config.url.clone()));
        }
        if !is_sqlite_url(&config.url) {
            candidates.push(Candidate::Fallback(config.fallback_path.clone()));
        }

        let mut attempted = Vec::new();
        let mut last_error = None;
        for candidate in candidates {
            let label = candidate.label();
            attempted.push(label.clone());
            match open(&candidate, &config).await {
                Ok(pool) => {
                    let fell_back = matches!(candidate, Candidate::Fallback(_));
                    if fell_back {
                        hoops_warn!("Primary database unreachable; falling back to {}", label);
                    } else {
                        hoops_info!("Connected to {}", label);
                    }
                    let schema = match pool.backend() {
                        DatabaseBackend::Postgres => non_empty(config.schema.as_deref()),
                        DatabaseBackend::Sqlite => None,
                    };
                    return Ok(Self {
                        pool,
                        location: label,
                        schema,
                        config,
                        fell_back,
                    });
                }
                Err(err) => {
                    hoops_warn!("Database connection failed for {} ({})", label, err);
                    last_error = Some(err);
                }
            }
        }

        Err(StoreError::Unavailable {
            attempted: attempted.join(", "),
            source: last_error,
        })
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.pool.backend()
    }

    /// True when the embedded store replaced an unreachable primary.
    pub fn is_fallback(&self) -> bool {
        self.fell_back
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn table_identifier(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
            None => quote_ident(table),
        }
    }

    /// Rows per insert statement, bounded by the backend's bind limit.
    pub fn effective_chunk_size(&self, width: usize) -> usize {
        let limit = (self.backend().bind_limit() / width.max(1)).max(1);
        self.config.chunk_size.clamp(1, limit)
    }

    pub async fn row_count(&self, table: &str) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table_identifier(table));
        let count = match &self.pool {
            Pool::Postgres(pool) => sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?,
            Pool::Sqlite(pool) => sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?,
        };
        Ok(count)
    }

    pub async fn close(&self) {
        match &self.pool {
            Pool::Postgres(pool) => pool.close().await,
            Pool::Sqlite(pool) => pool.close().await,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for DatabaseStore {
    async fn save(
        &self,
        kind: EntityKind,
        frame: &Frame,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        if frame.is_empty() {
            hoops_debug!("Skipping {} write; no rows to persist", kind);
            return Ok(0);
        }
        let canonical = normalize(frame, kind)?.frame;
        if canonical.is_empty() {
            return Ok(0);
        }

        let table = self.table_identifier(self.config.table(kind));
        let plan = TablePlan::new(&table, kind.schema(), self.backend());
        let size = self.effective_chunk_size(canonical.width());

        let mut written = 0;
        for (index, chunk) in canonical.chunks(size).enumerate() {
            let replace = index == 0 && mode == WriteMode::Replace;
            match &self.pool {
                Pool::Postgres(pool) => write_chunk!(pool, Postgres, plan, chunk, replace),
                Pool::Sqlite(pool) => write_chunk!(pool, Sqlite, plan, chunk, replace),
            }
            written += chunk.len();
            hoops_debug!(
                "Wrote chunk of {} rows to {} (total so far: {})",
                chunk.len(),
                table,
                written
            );
        }

        hoops_info!("Persisted {} rows into {} ({})", written, table, mode.as_str());
        Ok(written)
    }

    fn target(&self, kind: EntityKind) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.config.table(kind)),
            None => self.config.table(kind).to_string(),
        }
    }
}

/// Statements for one canonical table, in column order.
struct TablePlan {
    drop_sql: String,
    create_sql: String,
    insert_prefix: String,
    kinds: Vec<ColumnKind>,
}

impl TablePlan {
    fn new(table: &str, schema: &TableSchema, backend: DatabaseBackend) -> Self {
        let definitions: Vec<String> = schema
            .columns
            .iter()
            .map(|column| {
                let not_null = if column.nullable { "" } else { " NOT NULL" };
                format!(
                    "{} {}{}",
                    quote_ident(column.name),
                    sql_type(column.kind, backend),
                    not_null
                )
            })
            .collect();
        let names: Vec<String> = schema.columns.iter().map(|c| quote_ident(c.name)).collect();
        Self {
            drop_sql: format!("DROP TABLE IF EXISTS {table}"),
            create_sql: format!("CREATE TABLE IF NOT EXISTS {table} ({})", definitions.join(", ")),
            insert_prefix: format!("INSERT INTO {table} ({}) ", names.join(", ")),
            kinds: schema.columns.iter().map(|c| c.kind).collect(),
        }
    }
}

fn sql_type(kind: ColumnKind, backend: DatabaseBackend) -> &'static str {
    match (kind, backend) {
        (ColumnKind::Text, _) => "TEXT",
        (ColumnKind::Int, _) => "BIGINT",
        (ColumnKind::Float, DatabaseBackend::Postgres) => "DOUBLE PRECISION",
        (ColumnKind::Float, DatabaseBackend::Sqlite) => "REAL",
        (ColumnKind::Date, _) => "DATE",
    }
}

async fn open(candidate: &Candidate, config: &StoreConfig) -> Result<Pool, sqlx::Error> {
    match candidate {
        Candidate::Primary(url) if is_sqlite_url(url) => {
            let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
            open_sqlite(options, config.connect_timeout).await
        }
        Candidate::Primary(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(config.connect_timeout)
                .connect(url)
                .await?;
            if let Some(schema) = non_empty(config.schema.as_deref()) {
                let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&schema));
                sqlx::query(&sql).execute(&pool).await?;
            }
            Ok(Pool::Postgres(pool))
        }
        Candidate::Fallback(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            open_sqlite(options, config.connect_timeout).await
        }
    }
}

async fn open_sqlite(options: SqliteConnectOptions, timeout: Duration) -> Result<Pool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await?;
    Ok(Pool::Sqlite(pool))
}

fn is_sqlite_url(url: &str) -> bool {
    url.trim_start().starts_with("sqlite:")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
