//! Data access error types.

use thiserror::Error;

use crate::store::{Collection, StoreError};

/// Errors returned by [`BlogRepository`](crate::db::BlogRepository) operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Lookup by ID or by name matched no user.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Lookup by ID matched no post, or no post of the author has the slug.
    #[error("post not found: {0}")]
    PostNotFound(String),

    /// Another user already holds the name.
    #[error("user name already taken: {0}")]
    NameTaken(String),

    /// A stored document doesn't have the expected shape.
    #[error("failed to decode {collection}/{id}: {source}")]
    Decode {
        collection: Collection,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Store faults pass through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DbError {
    /// Stable code for callers that discriminate on strings.
    pub fn code(&self) -> &'static str {
        match self {
            DbError::UserNotFound(_) => "user/not-found",
            DbError::PostNotFound(_) => "post/not-found",
            DbError::NameTaken(_) => "user/name-taken",
            DbError::Decode { .. } => "store/decode",
            DbError::Store(_) => "store/failure",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::UserNotFound(_) | DbError::PostNotFound(_))
    }
}
