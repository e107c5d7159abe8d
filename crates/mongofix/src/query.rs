//! Assertion helpers: document counts and lookups by `_id`

use bson::{doc, Bson, Document};
use mongofix_common::{FixtureError, Result};
use tracing::instrument;

use crate::context::Context;
use crate::harness::MongoFix;

impl MongoFix {
    /// Number of documents in `collection`
    pub async fn count(&self, collection: &str) -> Result<i64> {
        self.count_with_context(&Context::background(), collection)
            .await
    }

    /// Number of documents in `collection`, bounded by `ctx`
    #[instrument(skip(self, ctx))]
    pub async fn count_with_context(&self, ctx: &Context, collection: &str) -> Result<i64> {
        let scope = self.open(ctx, Some(collection)).await?;
        let n = scope
            .context()
            .run(scope.collection()?.count_documents(doc! {}))
            .await?;
        Ok(n as i64)
    }

    /// Like [`MongoFix::count`], narrowed to `usize`.
    ///
    /// Fixture collections are assumed to be small; the narrowing is not
    /// checked.
    pub async fn count_int(&self, collection: &str) -> Result<usize> {
        self.count_int_with_context(&Context::background(), collection)
            .await
    }

    pub async fn count_int_with_context(&self, ctx: &Context, collection: &str) -> Result<usize> {
        let n = self.count_with_context(ctx, collection).await?;
        Ok(n as usize)
    }

    /// Document in `collection` whose `_id` equals `id`.
    ///
    /// Fails with [`FixtureError::NotFound`] when nothing matches.
    pub async fn find(&self, collection: &str, id: impl Into<Bson>) -> Result<Document> {
        self.find_with_context(&Context::background(), collection, id)
            .await
    }

    /// Same as [`MongoFix::find`], bounded by `ctx`
    pub async fn find_with_context(
        &self,
        ctx: &Context,
        collection: &str,
        id: impl Into<Bson>,
    ) -> Result<Document> {
        self.find_by_bson_id(ctx, collection, id.into()).await
    }

    #[instrument(skip(self, ctx))]
    async fn find_by_bson_id(&self, ctx: &Context, collection: &str, id: Bson) -> Result<Document> {
        let scope = self.open(ctx, Some(collection)).await?;
        let found = scope
            .context()
            .run(scope.collection()?.find_one(doc! { "_id": id.clone() }))
            .await?;
        found.ok_or_else(|| FixtureError::NotFound {
            collection: collection.to_string(),
            id: display_id(&id),
        })
    }
}

/// `_id` as shown in error messages, without quotes around strings
fn display_id(id: &Bson) -> String {
    match id {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
