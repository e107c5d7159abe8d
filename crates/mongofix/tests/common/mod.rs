//! In-memory driver used by the integration tests.
//!
//! Counts connects, pings and releases so tests can check that every opened
//! session is released exactly once.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use mongofix::{CollectionHandle, Driver, FixtureError, MongoFix, Result, Session};
use parking_lot::Mutex;

#[derive(Default)]
pub struct StubState {
    pub connects: AtomicUsize,
    pub pings: AtomicUsize,
    pub releases: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_ping: AtomicBool,
    pub fail_queries: AtomicBool,
    pub hang_queries: AtomicBool,
    pub data: Mutex<HashMap<String, Vec<Document>>>,
}

impl StubState {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn seed(&self, database: &str, collection: &str, docs: Vec<Document>) {
        self.data.lock().insert(key(database, collection), docs);
    }

    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.data
            .lock()
            .get(&key(database, collection))
            .cloned()
            .unwrap_or_default()
    }
}

fn key(database: &str, collection: &str) -> String {
    format!("{}.{}", database, collection)
}

#[derive(Clone, Default)]
pub struct StubDriver {
    pub state: Arc<StubState>,
}

#[async_trait]
impl Driver for StubDriver {
    async fn connect(&self, url: &str) -> Result<Box<dyn Session>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(FixtureError::Query(format!("no route to {}", url)));
        }
        Ok(Box::new(StubSession {
            state: self.state.clone(),
        }))
    }
}

struct StubSession {
    state: Arc<StubState>,
}

#[async_trait]
impl Session for StubSession {
    async fn ping(&self, _database: &str) -> Result<()> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_ping.load(Ordering::SeqCst) {
            return Err(FixtureError::Connection("server selection timeout".to_string()));
        }
        Ok(())
    }

    fn collection(&self, database: &str, name: &str) -> Box<dyn CollectionHandle> {
        Box::new(StubCollection {
            name: name.to_string(),
            key: key(database, name),
            state: self.state.clone(),
        })
    }

    fn release(self: Box<Self>) {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubCollection {
    name: String,
    key: String,
    state: Arc<StubState>,
}

impl StubCollection {
    async fn gate(&self) -> Result<()> {
        if self.state.hang_queries.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.state.fail_queries.load(Ordering::SeqCst) {
            return Err(FixtureError::Query("stub query failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionHandle for StubCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count_documents(&self, _filter: Document) -> Result<u64> {
        self.gate().await?;
        let data = self.state.data.lock();
        Ok(data.get(&self.key).map_or(0, Vec::len) as u64)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        self.gate().await?;
        let data = self.state.data.lock();
        let found = data.get(&self.key).and_then(|docs| {
            docs.iter()
                .find(|doc| filter.iter().all(|(k, v)| doc.get(k) == Some(v)))
                .cloned()
        });
        Ok(found)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<()> {
        self.gate().await?;
        self.state
            .data
            .lock()
            .entry(self.key.clone())
            .or_default()
            .extend(docs);
        Ok(())
    }

    async fn delete_many(&self, _filter: Document) -> Result<u64> {
        self.gate().await?;
        let removed = self.state.data.lock().remove(&self.key);
        Ok(removed.map_or(0, |docs| docs.len() as u64))
    }
}

/// Harness wired to a fresh stub, configured for database `fixtures`
pub fn harness() -> (MongoFix, Arc<StubState>) {
    let driver = StubDriver::default();
    let state = driver.state.clone();
    let fix = MongoFix::with_driver(Arc::new(driver));
    fix.configure([
        mongofix::config::url("mongodb://stub:27017"),
        mongofix::config::database("fixtures"),
    ]);
    (fix, state)
}
