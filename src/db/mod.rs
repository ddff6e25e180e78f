mod blog_repo;
mod sitemap;

pub use blog_repo::BlogRepository;
pub use sitemap::{render_sitemap, SitemapPost, SitemapUser};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::error::DbError;
use crate::store::{init_store, Collection, Fields, SqliteStore, StoreError};

/// Open the SQLite-backed store at `db_path` and wrap it in a repository.
pub async fn init_db(db_path: &Path) -> Result<BlogRepository<SqliteStore>, DbError> {
    let store = init_store(db_path).await?;
    Ok(BlogRepository::new(store))
}

/// Read a stored document body into a model type.
fn decode<T: DeserializeOwned>(
    collection: Collection,
    id: &str,
    fields: Fields,
) -> Result<T, DbError> {
    serde_json::from_value(Value::Object(fields)).map_err(|source| DbError::Decode {
        collection,
        id: id.to_string(),
        source,
    })
}

/// Turn a model value into a document body.
fn encode<T: Serialize>(collection: Collection, id: &str, value: &T) -> Result<Fields, DbError> {
    let encode_error = |source: serde_json::Error| StoreError::Encode {
        collection,
        id: id.to_string(),
        source,
    };

    match serde_json::to_value(value).map_err(encode_error)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(encode_error(<serde_json::Error as serde::ser::Error>::custom(
            "document body must be an object",
        ))
        .into()),
    }
}
