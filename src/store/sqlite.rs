use async_trait::async_trait;
use rand::distr::{Alphanumeric, SampleString};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::{apply_updates, Collection, Document, DocumentStore, FieldUpdate, Fields, StoreError};

/// Length of store-assigned document IDs.
const AUTO_ID_LEN: usize = 20;

/// Open (or create) the SQLite database at `path` and run migrations.
pub async fn init_store(path: &Path) -> Result<SqliteStore, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(SqliteStore::new(pool))
}

/// Document store kept in a single SQLite table.
///
/// Each row holds one document as JSON text, keyed by `(collection, id)`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode(collection: Collection, row: DocumentRow) -> Result<Document, StoreError> {
        let fields: Fields = serde_json::from_str(&row.data).map_err(|source| {
            StoreError::Malformed {
                collection,
                id: row.id.clone(),
                source,
            }
        })?;
        Ok(Document { id: row.id, fields })
    }

    fn encode(collection: Collection, id: &str, fields: &Fields) -> Result<String, StoreError> {
        serde_json::to_string(fields).map_err(|source| StoreError::Encode {
            collection,
            id: id.to_string(),
            source,
        })
    }

    async fn update_in(
        conn: &mut SqliteConnection,
        collection: Collection,
        id: &str,
        updates: &[FieldUpdate],
    ) -> Result<(), StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        };

        let mut doc = Self::decode(collection, row)?;
        apply_updates(&mut doc.fields, updates);
        let data = Self::encode(collection, id, &doc.fields)?;

        sqlx::query("UPDATE documents SET data = ? WHERE collection = ? AND id = ?")
            .bind(&data)
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|row| Self::decode(collection, row)).transpose()
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), StoreError> {
        let data = Self::encode(collection, id, &fields)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)
            ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add(&self, collection: Collection, fields: Fields) -> Result<String, StoreError> {
        let id = Alphanumeric.sample_string(&mut rand::rng(), AUTO_ID_LEN);
        let data = Self::encode(collection, &id, &fields)?;

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(&data)
            .execute(&self.pool)
            .await?;

        tracing::debug!(%collection, %id, "added document");
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        updates: &[FieldUpdate],
    ) -> Result<(), StoreError> {
        // Take the write lock up front so concurrent read-modify-writes queue
        // instead of failing on lock upgrade. Dropping `tx` without commit
        // rolls back, including when this future is cancelled.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        Self::update_in(&mut *tx, collection, id, updates).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ? ORDER BY id")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| Self::decode(collection, row))
            .collect()
    }

    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        // Quoted so dots and brackets in a field name stay part of the key.
        let path = format!("$.\"{}\"", field);

        let rows: Vec<DocumentRow> = sqlx::query_as(
            r#"
            SELECT id, data FROM documents
            WHERE collection = ? AND json_extract(data, ?) = json_extract(?, '$')
            ORDER BY id
            "#,
        )
        .bind(collection.as_str())
        .bind(&path)
        .bind(value.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Self::decode(collection, row))
            .collect()
    }
}
