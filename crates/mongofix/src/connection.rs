//! MongoDB-backed driver

use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use mongofix_common::Result;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::driver::{CollectionHandle, Driver, Session};

/// Client settings applied to every session opened by [`MongoDriver`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum number of connections per session (default: 4)
    pub max_pool_size: Option<u32>,
    /// TCP connect timeout (default: 5s)
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout (default: 5s)
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
    /// Pin the stable API version
    pub stable_api: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Scopes are short-lived; a small pool is enough
            max_pool_size: Some(4),
            connect_timeout: Some(Duration::from_secs(5)),
            server_selection_timeout: Some(Duration::from_secs(5)),
            app_name: Some("mongofix".to_string()),
            stable_api: false,
        }
    }
}

/// [`Driver`] built on the official `mongodb` crate
#[derive(Debug, Clone, Default)]
pub struct MongoDriver {
    config: ClientConfig,
}

impl MongoDriver {
    /// Create a driver with default client settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver with custom client settings
    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Driver for MongoDriver {
    #[instrument(skip(self, url))]
    async fn connect(&self, url: &str) -> Result<Box<dyn Session>> {
        let mut client_options = ClientOptions::parse(url).await?;

        if let Some(max) = self.config.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(connect) = self.config.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = self.config.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = &self.config.app_name {
            client_options.app_name = Some(app.clone());
        }
        if self.config.stable_api {
            let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
            client_options.server_api = Some(server_api);
        }

        let client = Client::with_options(client_options)?;
        debug!("MongoDB client created");
        Ok(Box::new(MongoSession { client }))
    }
}

struct MongoSession {
    client: Client,
}

#[async_trait]
impl Session for MongoSession {
    async fn ping(&self, database: &str) -> Result<()> {
        self.client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    fn collection(&self, database: &str, name: &str) -> Box<dyn CollectionHandle> {
        Box::new(MongoCollection {
            name: name.to_string(),
            inner: self.client.database(database).collection(name),
        })
    }

    fn release(self: Box<Self>) {
        // Release runs from `Drop`, so `Client::shutdown` is not awaited.
        // The client handle is simply dropped; the driver cleans up its
        // pool in the background, not before this returns.
        debug!("MongoDB client released");
    }
}

struct MongoCollection {
    name: String,
    inner: Collection<Document>,
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count_documents(&self, filter: Document) -> Result<u64> {
        Ok(self.inner.count_documents(filter).await?)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        Ok(self.inner.find_one(filter).await?)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        self.inner.insert_many(docs).await?;
        Ok(())
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        Ok(self.inner.delete_many(filter).await?.deleted_count)
    }
}
