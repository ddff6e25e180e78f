//! Abyss blog storage.
//!
//! Users and posts live in a document store as two collections. A user
//! document lists its post IDs in order and each post names its author;
//! [`db::BlogRepository`] keeps both sides in step.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod store;

pub use config::{Config, ConfigError};
pub use db::{init_db, render_sitemap, BlogRepository, SitemapPost, SitemapUser};
pub use error::DbError;
pub use models::{Post, PostData, PostEdit, Profile, User, UserData};
pub use store::{Collection, DocumentStore, SqliteStore, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
