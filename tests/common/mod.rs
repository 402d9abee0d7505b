// tests/common/mod.rs
// Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use etl_connector::ingest::error::{StoreWriteError, TransientFetchError};
use etl_connector::ingest::http::{HttpRequest, HttpTransport};
use etl_connector::ingest::sink::{DocumentStore, StoreConnector};
use serde_json::Value;

/// Replays canned responses in order; once the script runs out every call
/// is a connection error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Result<String, TransientFetchError>>>>,
    pub requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<String, TransientFetchError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::default(),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get_text(&self, req: &HttpRequest) -> Result<String, TransientFetchError> {
        self.requests.lock().unwrap().push(req.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransientFetchError::Connect("connection refused".into())))
    }
}

/// Records every `insert_many` call instead of writing anywhere.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inserts: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    pub fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.inserts.lock().unwrap().len()
    }
}

impl DocumentStore for RecordingStore {
    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[Value],
    ) -> Result<usize, StoreWriteError> {
        self.inserts
            .lock()
            .unwrap()
            .push((collection.to_string(), documents.to_vec()));
        if self.fail {
            return Err(StoreWriteError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(documents.len())
    }
}

/// Hands out handles onto one `RecordingStore`; counts connections opened
/// and released.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    pub store: RecordingStore,
    pub connects: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl RecordingConnector {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Connection handed out by `RecordingConnector`; dropping it counts as
/// closing the connection.
pub struct RecordingConnection {
    store: RecordingStore,
    releases: Arc<AtomicUsize>,
}

impl DocumentStore for RecordingConnection {
    fn insert_many(
        &mut self,
        collection: &str,
        documents: &[Value],
    ) -> Result<usize, StoreWriteError> {
        self.store.insert_many(collection, documents)
    }
}

impl Drop for RecordingConnection {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl StoreConnector for RecordingConnector {
    type Store = RecordingConnection;

    fn connect(&self) -> Result<RecordingConnection, StoreWriteError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingConnection {
            store: self.store.clone(),
            releases: Arc::clone(&self.releases),
        })
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|_| panic!("missing tests/fixtures/{name}"))
}
