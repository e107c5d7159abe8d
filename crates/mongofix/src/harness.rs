//! The configured entry point
//!
//! [`MongoFix`] owns the configuration and the driver. Configure it once
//! during test setup, before tests run concurrently; afterwards it is only
//! read. The lock is there so late readers never observe a half-applied
//! configure call, not to support concurrent reconfiguration.

use std::fmt;
use std::sync::Arc;

use mongofix_common::Result;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::config::{Config, ConfigFunc};
use crate::connection::MongoDriver;
use crate::context::Context;
use crate::driver::Driver;
use crate::scope::ConnectionScope;

/// Fixture harness bound to one database
pub struct MongoFix {
    config: RwLock<Config>,
    driver: Arc<dyn Driver>,
}

impl Default for MongoFix {
    fn default() -> Self {
        Self::new()
    }
}

impl MongoFix {
    /// Harness with default configuration and the MongoDB driver
    pub fn new() -> Self {
        Self::with_driver(Arc::new(MongoDriver::new()))
    }

    /// Harness with default configuration and a custom driver
    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Self {
            config: RwLock::new(Config::default()),
            driver,
        }
    }

    /// Apply options in order to the current configuration.
    ///
    /// Scalar settings are overwritten by later options; hook registrations
    /// are appended, so calling this repeatedly grows the hook registry.
    pub fn configure<I>(&self, opts: I)
    where
        I: IntoIterator<Item = ConfigFunc>,
    {
        let mut conf = self.config.write();
        *conf = std::mem::take(&mut *conf).apply(opts);
        debug!(url_set = !conf.url.is_empty(), database = %conf.database, "Configured");
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Check that the configuration is usable for connecting
    pub fn validate(&self) -> Result<()> {
        self.config.read().validate()
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Open a connection scope derived from `ctx`, optionally bound to a
    /// collection. The scope releases its session when dropped.
    pub async fn open(&self, ctx: &Context, collection: Option<&str>) -> Result<ConnectionScope> {
        let config = self.config();
        ConnectionScope::open(self.driver.as_ref(), &config, ctx, collection).await
    }

    /// Connect and ping the server.
    ///
    /// Useful in suite setup to bail out early when the database is not up.
    #[instrument(skip(self))]
    pub async fn try_connect(&self) -> Result<()> {
        let scope = self.open(&Context::background(), None).await?;
        scope.ping().await
    }
}

impl fmt::Debug for MongoFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoFix")
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}
