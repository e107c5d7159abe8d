//! Pre-insert hooks
//!
//! Hooks normalize fixture documents before they are written, e.g. turning a
//! textual timestamp into a native BSON datetime. They are registered per
//! collection and run in registration order.
//!
//! Every hook follows the same policy so that hooks compose predictably:
//! - the target field is absent, not a string, or empty: pass the document
//!   through unchanged
//! - the target field is present but malformed: fail

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use chrono::NaiveDateTime;
use mongofix_common::{FixtureError, Result};
use tracing::debug;

/// Timestamp layout accepted by [`convert_time`]
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Transformation applied to a document before insertion.
///
/// Receives the collection name and the document, returns the (possibly
/// modified) document.
pub type PreInsertFunc = Arc<dyn Fn(&str, Document) -> Result<Document> + Send + Sync>;

/// Collection name to ordered hook list
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<PreInsertFunc>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook for the given collection
    pub fn register(&mut self, collection: impl Into<String>, hook: PreInsertFunc) {
        self.hooks.entry(collection.into()).or_default().push(hook);
    }

    /// Number of hooks registered for a collection
    pub fn len_for(&self, collection: &str) -> usize {
        self.hooks.get(collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    /// Run every hook registered for `collection`, feeding each output into
    /// the next one.
    ///
    /// Stops at the first failing hook. Changes made by earlier hooks are not
    /// rolled back; the caller only ever sees the fully transformed document
    /// or the first error.
    pub fn apply(&self, collection: &str, doc: Document) -> Result<Document> {
        let Some(hooks) = self.hooks.get(collection) else {
            return Ok(doc);
        };

        let mut doc = doc;
        for (index, hook) in hooks.iter().enumerate() {
            debug!(collection, hook = index, "Applying pre-insert hook");
            doc = hook(collection, doc).map_err(|e| match e {
                FixtureError::Transformation { .. } => e,
                other => FixtureError::transformation(collection, other.to_string()),
            })?;
        }
        Ok(doc)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .hooks
            .iter()
            .map(|(name, hooks)| (name.as_str(), hooks.len()))
            .collect();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}

/// Wrap a closure as a [`PreInsertFunc`]
pub fn hook<F>(f: F) -> PreInsertFunc
where
    F: Fn(&str, Document) -> Result<Document> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Parse `field` with [`DEFAULT_TIME_FORMAT`] (e.g. `2023-05-01T10:00:00Z`)
/// into a UTC BSON datetime.
pub fn convert_time(field: impl Into<String>) -> PreInsertFunc {
    convert_time_with_format(field, DEFAULT_TIME_FORMAT)
}

/// Parse `field` with a chrono format string into a UTC BSON datetime.
///
/// The format must not carry an offset; the parsed value is taken as UTC.
pub fn convert_time_with_format(
    field: impl Into<String>,
    format: impl Into<String>,
) -> PreInsertFunc {
    let field = field.into();
    let format = format.into();
    Arc::new(move |collection: &str, mut doc: Document| -> Result<Document> {
        let Some(raw) = non_empty_str(&doc, &field) else {
            return Ok(doc);
        };
        let parsed = NaiveDateTime::parse_from_str(raw, &format).map_err(|e| {
            FixtureError::transformation(
                collection,
                format!("field '{}': cannot parse '{}' as '{}': {}", field, raw, format, e),
            )
        })?;
        doc.insert(
            field.as_str(),
            Bson::DateTime(bson::DateTime::from_chrono(parsed.and_utc())),
        );
        Ok(doc)
    })
}

fn non_empty_str<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    match doc.get(key) {
        Some(Bson::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}
