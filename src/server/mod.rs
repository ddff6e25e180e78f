//! HTTP API over the blog repository.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check (no auth required)
//! - `GET /users/{name}`: Public profile with published posts
//! - `GET /users/{name}/posts/{slug}`: A published post
//! - `GET /sitemap.xml`: Sitemap of every published post
//! - `GET /me`: Current user with all posts (auth required)
//! - `GET /dashboard/posts`: Current user's posts, newest first (auth required)
//! - `POST /dashboard/posts`: Create an empty draft (auth required)
//! - `PATCH /dashboard/posts/{id}`: Edit one of your posts (auth required)
//! - `DELETE /dashboard/posts/{id}`: Remove one of your posts (auth required)

mod auth;
mod handlers;

pub use auth::{auth_middleware, ApiKeyStore, AuthUser};
pub use handlers::CreatedResponse;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::BlogRepository;
use crate::error::DbError;
use crate::store::SqliteStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<BlogRepository<SqliteStore>>,
    pub api_keys: Arc<ApiKeyStore>,
    pub base_url: String,
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Data access failure turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError(DbError);

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            DbError::NameTaken(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(ErrorBody {
                error: self.0.code().to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/users/{name}", get(handlers::public_user))
        .route("/users/{name}/posts/{slug}", get(handlers::public_post))
        .route("/sitemap.xml", get(handlers::sitemap));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .route(
            "/dashboard/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/dashboard/posts/{id}",
            axum::routing::patch(handlers::edit_post).delete(handlers::delete_post),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeyEntry;
    use crate::db::init_db;
    use crate::models::{Post, PostData, Profile, User, UserData};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestContext {
        app: Router,
        repo: Arc<BlogRepository<SqliteStore>>,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(init_db(&temp_dir.path().join("test.db")).await.unwrap());

        repo.set_user("u1", &UserData::new(Profile::new("alice")))
            .await
            .unwrap();
        repo.set_user("u2", &UserData::new(Profile::new("bob")))
            .await
            .unwrap();

        let api_keys = ApiKeyStore::from_entries(&[
            ApiKeyEntry {
                key: "alice-key".into(),
                user_id: "u1".into(),
            },
            ApiKeyEntry {
                key: "bob-key".into(),
                user_id: "u2".into(),
            },
        ]);

        let state = AppState {
            repo: repo.clone(),
            api_keys: Arc::new(api_keys),
            base_url: "https://blog.example".into(),
        };

        TestContext {
            app: router(state),
            repo,
            _temp_dir: temp_dir,
        }
    }

    fn request(method: Method, uri: &str, key: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let ctx = setup().await;
        let (status, body) = send(&ctx.app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_auth_required() {
        let ctx = setup().await;

        let (status, body) = send(&ctx.app, request(Method::GET, "/me", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "missing_auth");

        let (status, _) = send(&ctx.app, request(Method::GET, "/me", Some("wrong"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let basic = Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&ctx.app, basic).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "invalid_auth");
    }

    #[tokio::test]
    async fn test_create_list_and_me() {
        let ctx = setup().await;

        let (status, body) = send(
            &ctx.app,
            request(Method::POST, "/dashboard/posts", Some("alice-key"), None),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: CreatedResponse = serde_json::from_slice(&body).unwrap();

        let (status, body) = send(
            &ctx.app,
            request(Method::GET, "/dashboard/posts", Some("alice-key"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let posts: Vec<Post> = serde_json::from_slice(&body).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, created.id);
        assert_eq!(posts[0].data.slug, created.id);

        let (status, body) =
            send(&ctx.app, request(Method::GET, "/me", Some("alice-key"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let me: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(me.id, "u1");
        assert_eq!(me.posts.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_makes_post_public() {
        let ctx = setup().await;
        let pid = ctx.repo.create_post_for_user("u1").await.unwrap();

        let uri = format!("/users/alice/posts/{}", pid);
        let (status, body) = send(&ctx.app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "post/not-found");

        let edit_uri = format!("/dashboard/posts/{}", pid);
        let (status, body) = send(
            &ctx.app,
            request(
                Method::PATCH,
                &edit_uri,
                Some("alice-key"),
                Some(r#"{"title":"Hello","slug":"hello","published":true}"#),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let edited: Post = serde_json::from_slice(&body).unwrap();
        assert!(edited.data.published);

        let (status, body) = send(
            &ctx.app,
            request(Method::GET, "/users/alice/posts/hello", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let post: Post = serde_json::from_slice(&body).unwrap();
        assert_eq!(post.id, pid);
        assert_eq!(post.data.title, "Hello");

        let (status, body) = send(&ctx.app, request(Method::GET, "/sitemap.xml", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let xml = String::from_utf8(body).unwrap();
        assert!(xml.contains("<loc>https://blog.example/alice/hello</loc>"));
    }

    #[tokio::test]
    async fn test_public_profile_hides_drafts() {
        let ctx = setup().await;
        ctx.repo
            .set_post("p1", &PostData::draft("u1").with_slug("live").published(true))
            .await
            .unwrap();
        ctx.repo.set_post("p2", &PostData::draft("u1")).await.unwrap();
        ctx.repo
            .set_user(
                "u1",
                &UserData::new(Profile::new("alice")).with_posts(vec!["p1".into(), "p2".into()]),
            )
            .await
            .unwrap();

        let (status, body) = send(&ctx.app, request(Method::GET, "/users/alice", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let user: User = serde_json::from_slice(&body).unwrap();
        let ids: Vec<&str> = user.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);

        let (status, body) = send(&ctx.app, request(Method::GET, "/users/nobody", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "user/not-found");
    }

    #[tokio::test]
    async fn test_only_author_can_delete() {
        let ctx = setup().await;
        let pid = ctx.repo.create_post_for_user("u1").await.unwrap();
        let uri = format!("/dashboard/posts/{}", pid);

        let (status, _) = send(&ctx.app, request(Method::DELETE, &uri, Some("bob-key"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(ctx.repo.post_exists(&pid).await.unwrap());

        let (status, _) =
            send(&ctx.app, request(Method::DELETE, &uri, Some("alice-key"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!ctx.repo.post_exists(&pid).await.unwrap());
        assert!(ctx.repo.get_user("u1").await.unwrap().posts.is_empty());
    }
}
