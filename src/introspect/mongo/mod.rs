//! Document introspection - sampling-based schema inference
//!
//! The document store has no authoritative schema, so the introspector
//! samples documents from each collection, accumulates per-field-path type
//! statistics, and resolves each path to a catalog field.

pub mod infer;
pub mod resolve;
pub mod sampler;

use mongodb::Client;

use crate::config::ModelConfig;
use crate::introspect::{IntrospectError, IntrospectResult};

pub use infer::{infer_schema, CollectionStats, FieldStats};
pub use resolve::{model_from_stats, resolve_field_type};
pub use sampler::MongoSampler;

/// Documents sampled per collection when the caller does not say otherwise
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Introspects a MongoDB database into a catalog config
pub struct MongoIntrospector {
    client: Client,
    sampler: MongoSampler,
}

impl MongoIntrospector {
    /// Connect and verify the connection
    pub async fn connect(uri: &str, database: &str) -> IntrospectResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(bson::doc! { "ping": 1 }).await?;
        Ok(Self {
            sampler: MongoSampler::new(db),
            client,
        })
    }

    /// The underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Introspect the given collections, or every collection when none are
    /// specified. Unsampleable or empty collections are skipped with a
    /// warning; producing no models at all is an error.
    pub async fn introspect(
        &self,
        collections: Option<Vec<String>>,
        sample_size: usize,
    ) -> IntrospectResult<ModelConfig> {
        let collections = match collections {
            Some(list) if !list.is_empty() => list,
            _ => {
                let all = self.sampler.list_collections().await?;
                if all.is_empty() {
                    return Err(IntrospectError::NoCollections);
                }
                tracing::info!(count = all.len(), "found collections in database");
                all
            }
        };

        let mut models = Vec::with_capacity(collections.len());
        for collection in &collections {
            tracing::info!(collection, "analyzing collection");

            let documents = match self.sampler.sample_documents(collection, sample_size).await {
                Ok(docs) => docs,
                Err(e) => {
                    tracing::warn!(collection, error = %e, "failed to sample, skipping");
                    continue;
                }
            };

            if documents.is_empty() {
                tracing::warn!(collection, "collection is empty, skipping");
                continue;
            }

            let stats = infer_schema(&documents);
            let model = model_from_stats(collection, &stats);
            tracing::info!(
                collection,
                fields = model.fields.len(),
                "generated model from samples"
            );
            models.push(model);
        }

        if models.is_empty() {
            return Err(IntrospectError::NoModels);
        }

        Ok(ModelConfig { models })
    }
}
