//! Database client abstraction
//!
//! mongofix only needs a handful of capabilities from the database client:
//! connect, ping, pick a collection, count, find one, insert and delete.
//! [`crate::MongoDriver`] implements them on top of the official driver;
//! tests can plug in an in-memory implementation.

use async_trait::async_trait;
use bson::Document;
use mongofix_common::Result;

/// Opens sessions against an endpoint
#[async_trait]
pub trait Driver: Send + Sync {
    /// Establish a client session for the given connection string
    async fn connect(&self, url: &str) -> Result<Box<dyn Session>>;
}

/// A live client session
#[async_trait]
pub trait Session: Send + Sync {
    /// Lightweight round-trip against `database`
    async fn ping(&self, database: &str) -> Result<()>;

    /// Select a collection in `database`
    fn collection(&self, database: &str, name: &str) -> Box<dyn CollectionHandle>;

    /// Give the underlying resources back. Called exactly once per session.
    fn release(self: Box<Self>);
}

/// Operations on one collection
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn count_documents(&self, filter: Document) -> Result<u64>;

    /// First document matching `filter`, or `None`
    async fn find_one(&self, filter: Document) -> Result<Option<Document>>;

    async fn insert_many(&self, docs: Vec<Document>) -> Result<()>;

    /// Returns the number of deleted documents
    async fn delete_many(&self, filter: Document) -> Result<u64>;
}
