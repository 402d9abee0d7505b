// src/ingest/sink.rs
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::ingest::error::StoreWriteError;
use crate::ingest::types::Batch;

pub const IN_MEMORY_URI: &str = ":memory:";

/// Write side of a document store. Insert-only.
pub trait DocumentStore {
    /// One bulk call; returns how many documents were written.
    fn insert_many(&mut self, collection: &str, documents: &[Value])
        -> Result<usize, StoreWriteError>;
}

/// Opens store connections for the Load stage.
pub trait StoreConnector {
    type Store: DocumentStore;

    fn connect(&self) -> Result<Self::Store, StoreWriteError>;
    fn describe(&self) -> String;
}

/// Scoped store connection: acquired by [`StoreSession::open`], released
/// when dropped, on every exit path.
pub struct StoreSession<S: DocumentStore> {
    store: S,
    label: String,
}

impl<S: DocumentStore> StoreSession<S> {
    pub fn open<C>(connector: &C) -> Result<Self, StoreWriteError>
    where
        C: StoreConnector<Store = S>,
    {
        let label = connector.describe();
        let store = connector.connect()?;
        info!(store = %label, "connected to document store");
        Ok(Self { store, label })
    }
}

impl<S: DocumentStore> Deref for StoreSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S: DocumentStore> DerefMut for StoreSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: DocumentStore> Drop for StoreSession<S> {
    fn drop(&mut self) {
        info!(store = %self.label, "document store connection closed");
    }
}

/// Bulk-insert `batch` into `collection`.
///
/// `false` means nothing was written: either the batch was empty (no store
/// call is made) or the write failed (logged here, never raised).
pub fn load<S, R>(store: &mut S, collection: &str, batch: Batch<R>) -> bool
where
    S: DocumentStore + ?Sized,
    R: Serialize,
{
    if batch.is_empty() {
        warn!(collection, "no data to load");
        return false;
    }

    let documents = match batch
        .records()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(d) => d,
        Err(e) => {
            error!(collection, error = %e, "could not serialize batch");
            return false;
        }
    };

    match store.insert_many(collection, &documents) {
        Ok(n) => {
            info!(collection, inserted = n, "inserted documents");
            true
        }
        Err(e) => {
            error!(collection, error = %e, "error loading data into document store");
            false
        }
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), StoreWriteError> {
    let ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(StoreWriteError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// SQLite-backed document store. One database file per database name, one
/// table per collection, documents kept as JSON text.
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// `uri` is a directory holding `<database>.sqlite3`, or `:memory:`.
    pub fn open(uri: &str, database: &str) -> Result<Self, StoreWriteError> {
        check_name("database", database)?;
        let conn = if uri == IN_MEMORY_URI {
            Connection::open_in_memory()
        } else {
            let dir = Path::new(uri);
            fs::create_dir_all(dir)?;
            Connection::open(dir.join(format!("{database}.sqlite3")))
        }
        .map_err(|source| StoreWriteError::Open {
            uri: uri.to_string(),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[Value],
    ) -> Result<usize, StoreWriteError> {
        check_name("collection", collection)?;
        let inserted_at = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{collection}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document TEXT NOT NULL,
                inserted_at TEXT NOT NULL
            )"
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{collection}\" (document, inserted_at) VALUES (?1, ?2)"
            ))?;
            for doc in documents {
                stmt.execute(params![doc.to_string(), inserted_at])?;
            }
        }
        tx.commit()?;
        Ok(documents.len())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteConnector {
    pub uri: String,
    pub database: String,
}

impl StoreConnector for SqliteConnector {
    type Store = SqliteDocumentStore;

    fn connect(&self) -> Result<SqliteDocumentStore, StoreWriteError> {
        SqliteDocumentStore::open(&self.uri, &self.database)
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.uri, self.database)
    }
}
