//! MongoDB client and collection wrapper
//!
//! Typed collections apply their schema's indexes when opened, so the
//! unique index on usernames exists before the first write.

use bson::{doc, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::GatehouseError;

/// MongoDB duplicate key error code
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Whether a driver error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => err.to_string().contains("E11000"),
    }
}

/// Map a write error, keeping duplicate keys distinguishable
fn map_write_error(context: &str, err: mongodb::error::Error) -> GatehouseError {
    if is_duplicate_key(&err) {
        GatehouseError::Conflict("Duplicate key".into())
    } else {
        GatehouseError::Database(format!("{} failed: {}", context, err))
    }
}

/// MongoDB client wrapper
#[derive(Clone, Debug)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, GatehouseError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GatehouseError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let mongo = Self {
            client,
            db_name: db_name.to_string(),
        };
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    /// Run the `ping` command against the database
    pub async fn ping(&self) -> Result<(), GatehouseError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| GatehouseError::Database(format!("MongoDB ping failed: {}", e)))
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, GatehouseError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, GatehouseError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), GatehouseError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| GatehouseError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, filling in missing metadata timestamps
    ///
    /// A unique index violation comes back as `Conflict`.
    pub async fn insert_one(&self, mut item: T) -> Result<(), GatehouseError> {
        item.mut_metadata().stamp_missing();

        self.inner
            .insert_one(item)
            .await
            .map(|_| ())
            .map_err(|e| map_write_error("Insert", e))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, GatehouseError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| GatehouseError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, GatehouseError> {
        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| GatehouseError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| GatehouseError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Update one document, refreshing `metadata.updated_at`
    ///
    /// A unique index violation comes back as `Conflict`.
    pub async fn update_one(
        &self,
        filter: Document,
        mut set: Document,
    ) -> Result<UpdateResult, GatehouseError> {
        set.insert("metadata.updated_at", DateTime::now());
        let modifications = UpdateModifications::Document(doc! { "$set": set });

        self.inner
            .update_one(filter, modifications)
            .await
            .map_err(|e| map_write_error("Update", e))
    }
}
