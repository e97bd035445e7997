use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachefront_core::PersistenceService;
use cachefront_domain::{
    BackendError, BackendResult, PagedResults, PersistenceAction, SearchQuery, TotalCount, WriteType,
};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde_json::Value;
use tokio::task;
use tracing::{debug, info, instrument};

use super::check_page;
use crate::errors::{map_join_error, InfraError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SqlitePool = Pool<SqliteConnectionManager>;
type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Persistence over a pooled SQLite file storing one JSON document per id
///
/// Blocking SQLite work runs on the blocking thread pool. Search filters are
/// evaluated with `json_extract`, so a missing field compares equal to JSON
/// `null`.
#[derive(Clone)]
pub struct SqlitePersistenceService {
    pool: Arc<SqlitePool>,
    path: PathBuf,
}

impl SqlitePersistenceService {
    /// Open (creating if needed) the database at `path` and ensure the schema
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> BackendResult<Self> {
        let path = path.as_ref().to_path_buf();
        let manager =
            SqliteConnectionManager::file(&path).with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager).map_err(map_pool_error)?;

        let conn = pool.get().map_err(map_pool_error)?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;

        info!(db_path = %path.display(), max_connections = pool.max_size(), "sqlite pool initialised");
        Ok(Self { pool: Arc::new(pool), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_connection<R, F>(&self, work: F) -> BackendResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> BackendResult<R> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(map_pool_error)?;
            work(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }

    fn write_one(
        conn: &rusqlite::Connection,
        action: &PersistenceAction,
        value: Option<&Value>,
    ) -> BackendResult<u64> {
        let changed = match action.write_type {
            WriteType::Create => conn.execute(
                "INSERT INTO entities (id, value) VALUES (?1, ?2)",
                params![action.id, encode(action, value)?],
            ),
            WriteType::Update => conn.execute(
                "UPDATE entities SET value = ?2 WHERE id = ?1",
                params![action.id, encode(action, value)?],
            ),
            WriteType::Delete => conn.execute("DELETE FROM entities WHERE id = ?1", params![action.id]),
        }
        .map_err(map_sql_error)?;
        Ok(u64::from(changed > 0))
    }
}

fn encode(action: &PersistenceAction, value: Option<&Value>) -> BackendResult<String> {
    let value = value
        .ok_or_else(|| BackendError::InvalidInput(format!("no value supplied for {action}")))?;
    Ok(serde_json::to_string(value)?)
}

/// `WHERE` clause and parameters for a query
fn filter_sql(query: &SearchQuery) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(prefix) = &query.id_prefix {
        clauses.push("substr(id, 1, ?) = ?".to_string());
        params.push(SqlValue::Integer(prefix.chars().count() as i64));
        params.push(SqlValue::Text(prefix.clone()));
    }

    for (path, expected) in &query.field_equals {
        clauses.push("json_extract(value, ?) IS json_extract(?, '$')".to_string());
        params.push(SqlValue::Text(format!("$.{path}")));
        params.push(SqlValue::Text(expected.to_string()));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

fn map_sql_error(err: rusqlite::Error) -> BackendError {
    BackendError::from(InfraError::from(err))
}

fn map_pool_error(err: r2d2::Error) -> BackendError {
    BackendError::from(InfraError::from(err))
}

#[async_trait]
impl PersistenceService for SqlitePersistenceService {
    async fn create(&self, id: &str, value: &Value) -> BackendResult<u64> {
        let action = PersistenceAction::create(id);
        let value = value.clone();
        self.with_connection(move |conn| Self::write_one(conn, &action, Some(&value))).await
    }

    async fn get_by_id(&self, id: &str) -> BackendResult<Option<Value>> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            let stored: Option<String> = conn
                .query_row("SELECT value FROM entities WHERE id = ?1", params![id], |row| row.get(0))
                .optional()
                .map_err(map_sql_error)?;
            stored.map(|text| serde_json::from_str(&text).map_err(BackendError::from)).transpose()
        })
        .await
    }

    async fn update(&self, id: &str, value: &Value) -> BackendResult<u64> {
        let action = PersistenceAction::update(id);
        let value = value.clone();
        self.with_connection(move |conn| Self::write_one(conn, &action, Some(&value))).await
    }

    async fn delete(&self, id: &str) -> BackendResult<u64> {
        let action = PersistenceAction::delete(id);
        self.with_connection(move |conn| Self::write_one(conn, &action, None)).await
    }

    #[instrument(skip(self, actions, items), fields(actions = actions.len()))]
    async fn batch_persist(
        &self,
        actions: &[PersistenceAction],
        items: &HashMap<String, Value>,
    ) -> BackendResult<HashMap<PersistenceAction, u64>> {
        let actions = actions.to_vec();
        let items = items.clone();

        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let mut results: HashMap<PersistenceAction, u64> = HashMap::with_capacity(actions.len());
            for action in &actions {
                let changed = Self::write_one(&tx, action, items.get(&action.id))?;
                *results.entry(action.clone()).or_default() |= changed;
            }
            tx.commit().map_err(map_sql_error)?;
            debug!(actions = actions.len(), "Batch committed");
            Ok(results)
        })
        .await
    }

    async fn search_ids(
        &self,
        query: &SearchQuery,
        page_num: u32,
        page_size: u32,
        with_total: bool,
    ) -> BackendResult<PagedResults<String>> {
        check_page(page_num, page_size)?;
        let (filter, filter_params) = filter_sql(query);
        let offset = i64::try_from(PagedResults::<String>::offset(page_num, page_size))
            .map_err(|_| BackendError::InvalidInput("page offset out of range".into()))?;

        self.with_connection(move |conn| {
            let mut page_params = filter_params.clone();
            page_params.push(SqlValue::Integer(i64::from(page_size)));
            page_params.push(SqlValue::Integer(offset));

            let mut stmt = conn
                .prepare(&format!("SELECT id FROM entities{filter} ORDER BY id LIMIT ? OFFSET ?"))
                .map_err(map_sql_error)?;
            let ids = stmt
                .query_map(params_from_iter(page_params), |row| row.get::<_, String>(0))
                .map_err(map_sql_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sql_error)?;

            let total = if with_total {
                let count: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM entities{filter}"),
                        params_from_iter(filter_params),
                        |row| row.get(0),
                    )
                    .map_err(map_sql_error)?;
                Some(TotalCount::new(u64::try_from(count).unwrap_or_default(), page_size))
            } else {
                None
            };

            Ok(PagedResults::new(page_num, page_size, ids, total))
        })
        .await
    }
}
