//! Connection scopes
//!
//! A [`ConnectionScope`] wraps one client session for the duration of one
//! logical unit of work. Opening a scope validates the configuration,
//! derives a bounded context from the caller's, connects, and optionally
//! selects a collection. The session is released exactly once: either by
//! [`ConnectionScope::release`] or when the scope is dropped, which covers
//! early returns, errors and cancellation.

use std::fmt;

use mongofix_common::{FixtureError, Result};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::context::Context;
use crate::driver::{CollectionHandle, Driver, Session};

/// An open client session bound to one database and, optionally, one
/// collection
pub struct ConnectionScope {
    ctx: Context,
    database: String,
    // Declared before `session` so it is dropped first
    collection: Option<Box<dyn CollectionHandle>>,
    session: Option<Box<dyn Session>>,
}

impl ConnectionScope {
    /// Validate `config`, connect and select the database (and collection).
    ///
    /// The scope's context is `ctx` bounded by `config.timeout`; connecting
    /// counts against it.
    #[instrument(skip(driver, config, ctx), fields(database = %config.database))]
    pub async fn open(
        driver: &dyn Driver,
        config: &Config,
        ctx: &Context,
        collection: Option<&str>,
    ) -> Result<Self> {
        config.validate()?;

        let scoped = ctx.with_timeout(config.timeout);
        let session = scoped
            .run(driver.connect(&config.url))
            .await
            .map_err(into_connection_error)?;

        let collection = collection.map(|name| session.collection(&config.database, name));
        debug!(
            collection = collection.as_ref().map(|c| c.name()),
            "Connection scope opened"
        );

        Ok(Self {
            ctx: scoped,
            database: config.database.clone(),
            collection,
            session: Some(session),
        })
    }

    /// Context bounding every call made through this scope
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The client session
    pub fn session(&self) -> &dyn Session {
        // Only `release_inner` clears it, and that consumes or drops `self`
        self.session
            .as_deref()
            .unwrap_or_else(|| unreachable!("session used after release"))
    }

    /// The selected collection, if the scope was opened with one
    pub fn collection(&self) -> Result<&dyn CollectionHandle> {
        self.collection.as_deref().ok_or_else(|| {
            FixtureError::Configuration("connection scope has no collection selected".to_string())
        })
    }

    /// Ping the database, bounded by the scope's context
    pub async fn ping(&self) -> Result<()> {
        self.ctx.run(self.session().ping(&self.database)).await
    }

    /// Release the session now rather than at drop
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        self.collection = None;
        if let Some(session) = self.session.take() {
            session.release();
            debug!(database = %self.database, "Connection scope released");
        }
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for ConnectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionScope")
            .field("database", &self.database)
            .field("collection", &self.collection.as_ref().map(|c| c.name()))
            .field("released", &self.session.is_none())
            .finish()
    }
}

fn into_connection_error(err: FixtureError) -> FixtureError {
    match err {
        FixtureError::Connection(_)
        | FixtureError::Configuration(_)
        | FixtureError::Timeout(_)
        | FixtureError::Cancelled => err,
        other => FixtureError::Connection(other.to_string()),
    }
}
