pub mod memory;
pub mod migrations;
pub mod models;
pub mod queries;


use anyhow::{Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub use memory::MemoryStore;
pub use models::{Collection, Document, Filter};

/// The persistence capability the services are written against. Any engine
/// that can look records up by id, by field equality, and by array
/// membership can back the server.
///
/// Calls are blocking; async callers go through [`call`].
pub trait Store: Send + Sync {
    fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>>;

    /// All matching documents in the engine's natural order.
    fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>>;

    /// Stores a new document and returns it with `id` and `createdAt`
    /// assigned by the store.
    fn insert(&self, collection: Collection, doc: Document) -> Result<Document>;

    /// Merges `patch` into the document with the given id. Returns `false`
    /// if no such document exists.
    fn update_fields(&self, collection: Collection, id: &str, patch: Document) -> Result<bool>;
}

pub type SharedStore = Arc<dyn Store>;

/// Run a store call on the blocking pool. Dropping the returned future is
/// the cancellation point for request deadlines; the detached call still
/// completes but its result is discarded.
pub async fn call<F, T>(store: &SharedStore, f: F) -> Result<T>
where
    F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| anyhow!("store task failed: {}", e))?
}

/// SQLite-backed document store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Flush and close the underlying connection.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        conn.close().map_err(|(_, e)| anyhow!("Failed to close database: {}", e))?;
        info!("Database closed");
        Ok(())
    }
}
