//! Fixture files and insertion
//!
//! A fixture file maps collection names to documents, either as a list or as
//! a map keyed by `_id`:
//!
//! ```yaml
//! users:
//!   - { _id: 1, name: alice, created_at: "2023-05-01T10:00:00Z" }
//! posts:
//!   p1: { title: hello }
//! ```
//!
//! JSON files are read as MongoDB extended JSON, so `{"$oid": ...}` and
//! friends work. Loading a fixture empties each collection it names before
//! inserting, which gives every test the same starting state. There is no
//! atomicity across collections.

use std::path::{Path, PathBuf};

use bson::{doc, Bson, Document};
use mongofix_common::{FixtureError, Result};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::harness::MongoFix;

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Documents for one collection, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFixture {
    pub collection: String,
    pub documents: Vec<Document>,
}

impl MongoFix {
    /// Run the hook chain on `docs` and insert them into `collection`
    pub async fn insert(&self, collection: &str, docs: Vec<Document>) -> Result<()> {
        self.insert_with_context(&Context::background(), collection, docs)
            .await
    }

    /// Same as [`MongoFix::insert`], bounded by `ctx`.
    ///
    /// Every document is transformed before anything is written, so a
    /// rejected document leaves the collection untouched.
    #[instrument(skip(self, ctx, docs), fields(count = docs.len()))]
    pub async fn insert_with_context(
        &self,
        ctx: &Context,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<()> {
        let prepared = self.prepare(collection, docs)?;
        let scope = self.open(ctx, Some(collection)).await?;
        scope
            .context()
            .run(scope.collection()?.insert_many(prepared))
            .await
    }

    /// Apply registered hooks to each document
    pub fn prepare(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Document>> {
        let config = self.config();
        docs.into_iter()
            .map(|doc| config.hooks.apply(collection, doc))
            .collect()
    }

    /// Load the named fixture files from the fixture root directory
    pub async fn use_fixture<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.use_fixture_with_context(&Context::background(), names)
            .await
    }

    /// Same as [`MongoFix::use_fixture`], bounded by `ctx`
    pub async fn use_fixture_with_context<I, S>(&self, ctx: &Context, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let config = self.config();
        config.validate()?;
        let root = config.fixture_dir()?.to_path_buf();

        for name in names {
            let path = resolve_fixture(&root, name.as_ref())?;
            let fixtures = read_fixture_file(&path)?;
            info!(path = %path.display(), collections = fixtures.len(), "Loading fixture");
            for fixture in fixtures {
                self.reset_collection(ctx, fixture).await?;
            }
        }
        Ok(())
    }

    async fn reset_collection(&self, ctx: &Context, fixture: CollectionFixture) -> Result<()> {
        let prepared = self.prepare(&fixture.collection, fixture.documents)?;
        let scope = self.open(ctx, Some(&fixture.collection)).await?;
        let coll = scope.collection()?;

        let deleted = scope.context().run(coll.delete_many(doc! {})).await?;
        let inserted = prepared.len();
        scope.context().run(coll.insert_many(prepared)).await?;
        debug!(
            collection = %fixture.collection,
            deleted,
            inserted,
            "Collection reset from fixture"
        );
        Ok(())
    }
}

/// Find the file for fixture `name` under `root`.
///
/// A name with an extension is used as is; otherwise `.json`, `.yaml` and
/// `.yml` are tried in that order.
pub fn resolve_fixture(root: &Path, name: &str) -> Result<PathBuf> {
    let direct = root.join(name);
    if Path::new(name).extension().is_some() {
        if direct.is_file() {
            return Ok(direct);
        }
    } else {
        for ext in EXTENSIONS {
            let candidate = direct.with_extension(ext);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(FixtureError::Fixture(format!(
        "fixture '{}' not found in '{}'",
        name,
        root.display()
    )))
}

/// Read and parse one fixture file, choosing the format by extension
pub fn read_fixture_file(path: &Path) -> Result<Vec<CollectionFixture>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| FixtureError::Fixture(format!("cannot read '{}': {}", path.display(), e)))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "json" => parse_json_fixture(&text),
        "yaml" | "yml" => parse_yaml_fixture(&text),
        other => Err(FixtureError::Fixture(format!(
            "unsupported fixture format '{}' for '{}'",
            other,
            path.display()
        ))),
    }
}

/// Parse a JSON (extended JSON) fixture
pub fn parse_json_fixture(text: &str) -> Result<Vec<CollectionFixture>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| FixtureError::Fixture(format!("invalid JSON fixture: {}", e)))?;
    collections_from_value(value)
}

/// Parse a YAML fixture
pub fn parse_yaml_fixture(text: &str) -> Result<Vec<CollectionFixture>> {
    let value: Value = serde_yaml::from_str(text)
        .map_err(|e| FixtureError::Fixture(format!("invalid YAML fixture: {}", e)))?;
    collections_from_value(value)
}

fn collections_from_value(value: Value) -> Result<Vec<CollectionFixture>> {
    let Value::Object(collections) = value else {
        return Err(FixtureError::Fixture(
            "fixture must map collection names to documents".to_string(),
        ));
    };

    collections
        .into_iter()
        .map(|(collection, entries)| {
            let documents = match entries {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| to_document(&collection, item))
                    .collect::<Result<Vec<_>>>()?,
                Value::Object(by_id) => by_id
                    .into_iter()
                    .map(|(id, item)| {
                        let mut doc = to_document(&collection, item)?;
                        if !doc.contains_key("_id") {
                            doc.insert("_id", id);
                        }
                        Ok(doc)
                    })
                    .collect::<Result<Vec<_>>>()?,
                Value::Null => Vec::new(),
                _ => {
                    return Err(FixtureError::Fixture(format!(
                        "collection '{}' must be a list or a map of documents",
                        collection
                    )))
                }
            };
            Ok(CollectionFixture {
                collection,
                documents,
            })
        })
        .collect()
}

fn to_document(collection: &str, value: Value) -> Result<Document> {
    let bson = Bson::try_from(value).map_err(|e| {
        FixtureError::Fixture(format!("collection '{}': {}", collection, e))
    })?;
    match bson {
        Bson::Document(doc) => Ok(doc),
        other => Err(FixtureError::Fixture(format!(
            "collection '{}': expected a document, found {:?}",
            collection,
            other.element_type()
        ))),
    }
}
