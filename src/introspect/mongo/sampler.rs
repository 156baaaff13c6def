//! Random document sampling via the server-side `$sample` stage

use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::Database;

use crate::introspect::IntrospectResult;

/// Samples documents from collections
pub struct MongoSampler {
    database: Database,
}

impl MongoSampler {
    /// Create a sampler over a database handle
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Draw a random sample of up to `size` documents
    pub async fn sample_documents(
        &self,
        collection: &str,
        size: usize,
    ) -> IntrospectResult<Vec<Document>> {
        let coll = self.database.collection::<Document>(collection);
        let pipeline = vec![doc! { "$sample": { "size": size as i64 } }];
        let documents = coll
            .aggregate(pipeline)
            .await?
            .try_collect::<Vec<Document>>()
            .await?;
        Ok(documents)
    }

    /// List all collection names
    pub async fn list_collections(&self) -> IntrospectResult<Vec<String>> {
        Ok(self.database.list_collection_names().await?)
    }
}
