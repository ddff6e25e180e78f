use futures::future::try_join_all;
use serde_json::json;

use super::{decode, encode};
use crate::error::DbError;
use crate::models::{Post, PostData, PostEdit, Profile, User, UserData};
use crate::store::{Collection, Document, DocumentStore, FieldUpdate, StoreError};

/// Reads and writes users and posts, keeping `User.posts` and `Post.author`
/// pointing at each other.
///
/// Multi-document writes are separate store round trips with no transaction
/// around them. A failure part way through can leave a post that no user
/// lists, or a user listing a post that no longer exists.
pub struct BlogRepository<S> {
    store: S,
}

impl<S: DocumentStore> BlogRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn user_exists(&self, id: &str) -> Result<bool, DbError> {
        Ok(self.store.get(Collection::Users, id).await?.is_some())
    }

    pub async fn user_with_name_exists(&self, name: &str) -> Result<bool, DbError> {
        let matches = self
            .store
            .query_eq(Collection::Users, "name", &json!(name))
            .await?;
        Ok(!matches.is_empty())
    }

    /// Fetch a user and all of their posts.
    pub async fn get_user(&self, id: &str) -> Result<User, DbError> {
        tracing::debug!(user_id = id, "get user");
        let doc = self
            .store
            .get(Collection::Users, id)
            .await?
            .ok_or_else(|| DbError::UserNotFound(id.to_string()))?;
        self.hydrate_user(doc).await
    }

    /// Fetch a user by name and all of their posts.
    ///
    /// Takes the first match if several users somehow share the name.
    pub async fn get_user_by_name(&self, name: &str) -> Result<User, DbError> {
        tracing::debug!(name, "get user by name");
        let doc = self
            .store
            .query_eq(Collection::Users, "name", &json!(name))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::UserNotFound(name.to_string()))?;
        self.hydrate_user(doc).await
    }

    pub async fn get_post(&self, id: &str) -> Result<Post, DbError> {
        let doc = self
            .store
            .get(Collection::Posts, id)
            .await?
            .ok_or_else(|| DbError::PostNotFound(id.to_string()))?;
        decode_post(doc)
    }

    pub async fn get_post_by_username_and_slug(
        &self,
        username: &str,
        slug: &str,
    ) -> Result<Post, DbError> {
        self.find_post_by_username_and_slug(username, slug)
            .await?
            .ok_or_else(|| DbError::PostNotFound(format!("{}/{}", username, slug)))
    }

    pub async fn get_post_by_user_id_and_slug(
        &self,
        user_id: &str,
        slug: &str,
    ) -> Result<Post, DbError> {
        self.find_post_by_user_id_and_slug(user_id, slug)
            .await?
            .ok_or_else(|| DbError::PostNotFound(format!("{}/{}", user_id, slug)))
    }

    pub async fn post_exists(&self, id: &str) -> Result<bool, DbError> {
        Ok(self.store.get(Collection::Posts, id).await?.is_some())
    }

    /// Like [`get_post_by_username_and_slug`](Self::get_post_by_username_and_slug),
    /// but an unmatched slug is `Ok(None)`. A missing author is still an error.
    pub async fn find_post_by_username_and_slug(
        &self,
        username: &str,
        slug: &str,
    ) -> Result<Option<Post>, DbError> {
        let user = self.get_user_by_name(username).await?;
        Ok(take_slug(user.posts, slug))
    }

    pub async fn find_post_by_user_id_and_slug(
        &self,
        user_id: &str,
        slug: &str,
    ) -> Result<Option<Post>, DbError> {
        let user = self.get_user(user_id).await?;
        Ok(take_slug(user.posts, slug))
    }

    /// Write a user document wholesale.
    pub async fn set_user(&self, id: &str, data: &UserData) -> Result<(), DbError> {
        let fields = encode(Collection::Users, id, data)?;
        self.store.set(Collection::Users, id, fields).await?;
        Ok(())
    }

    /// Write a post document wholesale.
    pub async fn set_post(&self, id: &str, data: &PostData) -> Result<(), DbError> {
        let fields = encode(Collection::Posts, id, data)?;
        self.store.set(Collection::Posts, id, fields).await?;
        Ok(())
    }

    /// Create a user with no posts after checking the name is free.
    ///
    /// The check and the write are separate, so two concurrent registrations
    /// of the same name can both succeed.
    pub async fn register_user(&self, id: &str, profile: Profile) -> Result<(), DbError> {
        if self.user_with_name_exists(&profile.name).await? {
            tracing::warn!(name = %profile.name, "user name already taken");
            return Err(DbError::NameTaken(profile.name));
        }

        self.set_user(id, &UserData::new(profile)).await?;
        tracing::info!(user_id = id, "registered user");
        Ok(())
    }

    /// Create an empty draft owned by `user_id` and return its ID.
    ///
    /// Three writes: add the post, set its slug to its ID, append the ID to
    /// the user's post list. If the user doesn't exist the last write fails
    /// and the post is left behind.
    pub async fn create_post_for_user(&self, user_id: &str) -> Result<String, DbError> {
        let mut fields = encode(Collection::Posts, "", &PostData::draft(user_id))?;
        // Filled in once the store has picked the ID.
        fields.remove("slug");

        let post_id = self.store.add(Collection::Posts, fields).await?;

        self.store
            .update(
                Collection::Posts,
                &post_id,
                &[FieldUpdate::set("slug", post_id.clone())],
            )
            .await?;

        self.store
            .update(
                Collection::Users,
                user_id,
                &[FieldUpdate::array_union("posts", vec![json!(post_id)])],
            )
            .await?;

        tracing::info!(user_id, post_id = %post_id, "created post");
        Ok(post_id)
    }

    /// Delete a post, then drop its ID from the user's post list.
    pub async fn remove_post_for_user(&self, user_id: &str, post_id: &str) -> Result<(), DbError> {
        self.store.delete(Collection::Posts, post_id).await?;

        self.store
            .update(
                Collection::Users,
                user_id,
                &[FieldUpdate::array_remove("posts", vec![json!(post_id)])],
            )
            .await?;

        tracing::info!(user_id, post_id, "removed post");
        Ok(())
    }

    /// Every post whose author is `user_id`, most recently edited first.
    ///
    /// Queries posts by author rather than walking the user's list, so
    /// orphaned posts show up too.
    pub async fn list_posts_by_author(&self, user_id: &str) -> Result<Vec<Post>, DbError> {
        let docs = self
            .store
            .query_eq(Collection::Posts, "author", &json!(user_id))
            .await?;

        let mut posts = docs
            .into_iter()
            .map(decode_post)
            .collect::<Result<Vec<_>, _>>()?;
        posts.sort_by(|a, b| b.data.last_edited.cmp(&a.data.last_edited));
        Ok(posts)
    }

    /// Apply a partial edit and stamp `lastEdited` with the store's clock.
    pub async fn edit_post(&self, post_id: &str, edit: &PostEdit) -> Result<Post, DbError> {
        let mut updates = Vec::new();
        if let Some(title) = &edit.title {
            updates.push(FieldUpdate::set("title", title.as_str()));
        }
        if let Some(excerpt) = &edit.excerpt {
            updates.push(FieldUpdate::set("excerpt", excerpt.as_str()));
        }
        if let Some(content) = &edit.content {
            updates.push(FieldUpdate::set("content", content.as_str()));
        }
        if let Some(slug) = &edit.slug {
            updates.push(FieldUpdate::set("slug", slug.as_str()));
        }
        if let Some(published) = edit.published {
            updates.push(FieldUpdate::set("published", published));
        }
        updates.push(FieldUpdate::server_timestamp("lastEdited"));

        match self.store.update(Collection::Posts, post_id, &updates).await {
            Err(StoreError::NotFound { .. }) => {
                return Err(DbError::PostNotFound(post_id.to_string()))
            }
            result => result?,
        }

        tracing::info!(post_id, "edited post");
        self.get_post(post_id).await
    }

    /// Replace the stored post IDs with the posts themselves, fetched
    /// concurrently. Any missing post fails the whole read.
    async fn hydrate_user(&self, doc: Document) -> Result<User, DbError> {
        let data: UserData = decode(Collection::Users, &doc.id, doc.fields)?;
        let posts = try_join_all(data.posts.iter().map(|post_id| self.get_post(post_id))).await?;

        Ok(User {
            id: doc.id,
            profile: data.profile,
            posts,
        })
    }
}

fn decode_post(doc: Document) -> Result<Post, DbError> {
    let data: PostData = decode(Collection::Posts, &doc.id, doc.fields)?;
    Ok(Post::new(doc.id, data))
}

fn take_slug(posts: Vec<Post>, slug: &str) -> Option<Post> {
    posts.into_iter().find(|post| post.data.slug == slug)
}
