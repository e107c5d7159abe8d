//! Configuration and option mutators
//!
//! Options are small functions that take the current [`Config`] and return
//! an updated one. They compose in order: later options win for scalar
//! fields, while hook registrations accumulate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mongofix_common::{FixtureError, Result};

use crate::hooks::{HookRegistry, PreInsertFunc};

/// Default MongoDB endpoint
pub const DEFAULT_URL: &str = "mongodb://localhost:27017";
/// Default database name
pub const DEFAULT_DATABASE: &str = "test";
/// Default bound on a single connection scope
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable read by [`from_env`] for the endpoint URL
pub const ENV_URL: &str = "MONGOFIX_URL";
/// Environment variable read by [`from_env`] for the database name
pub const ENV_DATABASE: &str = "MONGOFIX_DATABASE";
/// Environment variable read by [`from_env`] for the fixture directory
pub const ENV_FIXTURE_DIR: &str = "MONGOFIX_FIXTURE_DIR";

/// Option mutator consumed by [`crate::MongoFix::configure`]
pub type ConfigFunc = Box<dyn FnOnce(Config) -> Config + Send>;

/// Connection and fixture settings
#[derive(Debug, Clone)]
pub struct Config {
    /// MongoDB connection string
    pub url: String,
    /// Database used for every operation
    pub database: String,
    /// Directory holding fixture files. `None` disables fixture loading.
    pub fixture_root_dir: Option<PathBuf>,
    /// Upper bound for one connection scope, connect included
    pub timeout: Duration,
    /// Pre-insert hooks keyed by collection
    pub hooks: HookRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            fixture_root_dir: None,
            timeout: DEFAULT_TIMEOUT,
            hooks: HookRegistry::new(),
        }
    }
}

impl Config {
    /// Apply options in order
    pub fn apply<I>(self, opts: I) -> Self
    where
        I: IntoIterator<Item = ConfigFunc>,
    {
        opts.into_iter().fold(self, |conf, opt| opt(conf))
    }

    /// Check that everything a connection needs is present
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(FixtureError::Configuration(
                "connection URL is empty".to_string(),
            ));
        }
        if self.database.is_empty() {
            return Err(FixtureError::Configuration(
                "database name is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The fixture directory, checked to exist
    pub fn fixture_dir(&self) -> Result<&Path> {
        let dir = self.fixture_root_dir.as_deref().ok_or_else(|| {
            FixtureError::Configuration("fixture root directory is not set".to_string())
        })?;
        if !dir.is_dir() {
            return Err(FixtureError::Configuration(format!(
                "fixture root directory '{}' does not exist",
                dir.display()
            )));
        }
        Ok(dir)
    }
}

/// Set the MongoDB connection string
pub fn url(url: impl Into<String>) -> ConfigFunc {
    let url = url.into();
    Box::new(move |mut conf| {
        conf.url = url;
        conf
    })
}

/// Set the database name
pub fn database(name: impl Into<String>) -> ConfigFunc {
    let name = name.into();
    Box::new(move |mut conf| {
        conf.database = name;
        conf
    })
}

/// Set the directory fixture files are loaded from
pub fn fixture_root_dir(dir: impl Into<PathBuf>) -> ConfigFunc {
    let dir = dir.into();
    Box::new(move |mut conf| {
        conf.fixture_root_dir = Some(dir);
        conf
    })
}

/// Bound every connection scope by `timeout`
pub fn timeout(timeout: Duration) -> ConfigFunc {
    Box::new(move |mut conf| {
        conf.timeout = timeout;
        conf
    })
}

/// Append a pre-insert hook for `collection`
pub fn register_hook(collection: impl Into<String>, hook: PreInsertFunc) -> ConfigFunc {
    let collection = collection.into();
    Box::new(move |mut conf| {
        conf.hooks.register(collection, hook);
        conf
    })
}

/// Override URL, database and fixture directory from `MONGOFIX_*`
/// environment variables that are set and non-empty.
///
/// Variables are read when the option is applied.
pub fn from_env() -> ConfigFunc {
    from_lookup(|key| std::env::var(key).ok())
}

/// Like [`from_env`], reading variables through `lookup`
pub fn from_lookup<F>(lookup: F) -> ConfigFunc
where
    F: Fn(&str) -> Option<String> + Send + 'static,
{
    Box::new(move |mut conf| {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = get(ENV_URL) {
            conf.url = url;
        }
        if let Some(name) = get(ENV_DATABASE) {
            conf.database = name;
        }
        if let Some(dir) = get(ENV_FIXTURE_DIR) {
            conf.fixture_root_dir = Some(PathBuf::from(dir));
        }
        conf
    })
}
