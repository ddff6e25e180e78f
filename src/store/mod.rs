//! Document store boundary.
//!
//! The data access layer talks to a document database through the
//! [`DocumentStore`] trait: documents are JSON objects addressed by a
//! collection and an ID. The shipped implementation is [`SqliteStore`].
//!
//! ```text
//! users/<id>  { "name": ..., "displayName": ..., "photo": ..., "posts": [<post id>, ...] }
//! posts/<id>  { "title": ..., "author": <user id>, "published": false, "slug": ..., ... }
//! ```

mod sqlite;

pub use sqlite::{init_store, SqliteStore};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// Collections known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Posts,
}

impl Collection {
    /// Returns the collection name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Posts => "posts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// A single field mutation applied by [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: FieldValue::Set(value.into()),
        }
    }

    pub fn array_union(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            value: FieldValue::ArrayUnion(values),
        }
    }

    pub fn array_remove(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            value: FieldValue::ArrayRemove(values),
        }
    }

    pub fn server_timestamp(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: FieldValue::ServerTimestamp,
        }
    }
}

/// How a field is rewritten.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Replace the field with a value.
    Set(Value),
    /// Append each value not already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each value.
    ArrayRemove(Vec<Value>),
    /// The store's current time, RFC 3339 in UTC.
    ServerTimestamp,
}

/// Errors raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document at {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {collection}/{id}: {source}")]
    Malformed {
        collection: Collection,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document {collection}/{id}: {source}")]
    Encode {
        collection: Collection,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Minimal document database client.
///
/// No operation spans more than one document, so callers that touch several
/// documents get no atomicity across them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. Returns `Ok(None)` if it doesn't exist.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document wholesale, replacing anything stored at `id`.
    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Insert a document under a store-assigned ID and return that ID.
    async fn add(&self, collection: Collection, fields: Fields) -> Result<String, StoreError>;

    /// Apply field mutations to an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document is absent.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        updates: &[FieldUpdate],
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document succeeds.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Every document of a collection, ordered by ID.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    /// Documents whose top-level `field` equals `value`, ordered by ID.
    ///
    /// `field` is a single key; dots and brackets are matched literally.
    /// It must not contain a double quote.
    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;
}

/// Apply field mutations to a document body in place.
pub fn apply_updates(fields: &mut Fields, updates: &[FieldUpdate]) {
    for update in updates {
        match &update.value {
            FieldValue::Set(value) => {
                fields.insert(update.field.clone(), value.clone());
            }
            FieldValue::ArrayUnion(values) => {
                let mut array = take_array(fields, &update.field);
                for value in values {
                    if !array.contains(value) {
                        array.push(value.clone());
                    }
                }
                fields.insert(update.field.clone(), Value::Array(array));
            }
            FieldValue::ArrayRemove(values) => {
                let mut array = take_array(fields, &update.field);
                array.retain(|item| !values.contains(item));
                fields.insert(update.field.clone(), Value::Array(array));
            }
            FieldValue::ServerTimestamp => {
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
                fields.insert(update.field.clone(), Value::String(now));
            }
        }
    }
}

/// Removes the array stored at `field`; a missing or non-array value reads as empty.
fn take_array(fields: &mut Fields, field: &str) -> Vec<Value> {
    match fields.remove(field) {
        Some(Value::Array(array)) => array,
        _ => Vec::new(),
    }
}
