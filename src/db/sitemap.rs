//! Read-only traversal of every user's published posts, for sitemap tooling.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::{decode, BlogRepository};
use crate::error::DbError;
use crate::models::{PostData, UserData};
use crate::store::{Collection, DocumentStore};

/// Public fields of a published post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SitemapPost {
    pub id: String,
    pub slug: String,
    pub last_edited: DateTime<Utc>,
    pub title: String,
}

/// A user with at least one published post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SitemapUser {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub posts: Vec<SitemapPost>,
}

impl<S: DocumentStore> BlogRepository<S> {
    /// Every user with at least one published post, each listing only those
    /// posts in reference order.
    ///
    /// Users are walked one at a time; each user's posts are fetched
    /// concurrently. Posts that no longer exist or don't decode are skipped,
    /// but any store fault fails the whole traversal.
    pub async fn users_with_published_posts(&self) -> Result<Vec<SitemapUser>, DbError> {
        let docs = self.store().list(Collection::Users).await?;
        let mut users = Vec::new();

        for doc in docs {
            let data: UserData = decode(Collection::Users, &doc.id, doc.fields)?;
            if data.posts.is_empty() {
                continue;
            }

            let post_docs = try_join_all(
                data.posts
                    .iter()
                    .map(|post_id| self.store().get(Collection::Posts, post_id)),
            )
            .await?;

            let mut posts = Vec::new();
            for post_doc in post_docs.into_iter().flatten() {
                let post: PostData =
                    match decode(Collection::Posts, &post_doc.id, post_doc.fields) {
                        Ok(post) => post,
                        Err(err) => {
                            tracing::warn!(
                                post_id = %post_doc.id,
                                error = %err,
                                "skipping malformed post"
                            );
                            continue;
                        }
                    };
                if post.published {
                    posts.push(SitemapPost {
                        id: post_doc.id,
                        slug: post.slug,
                        last_edited: post.last_edited,
                        title: post.title,
                    });
                }
            }

            if posts.is_empty() {
                continue;
            }

            users.push(SitemapUser {
                id: doc.id,
                name: data.profile.name,
                photo: data.profile.photo,
                display_name: data.profile.display_name,
                posts,
            });
        }

        tracing::debug!(users = users.len(), "collected sitemap entries");
        Ok(users)
    }
}

/// Render sitemap XML: one entry per user page and one per published post.
pub fn render_sitemap(base_url: &str, users: &[SitemapUser]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" \
         xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\">\n",
    );

    for user in users {
        let user_url = format!("{}/{}", base, urlencoding::encode(&user.name));

        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(&user_url)));
        if let Some(latest) = user.posts.iter().map(|post| post.last_edited).max() {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", latest.format("%Y-%m-%d")));
        }
        if let Some(photo) = &user.photo {
            let title = user.display_name.as_deref().unwrap_or(&user.name);
            xml.push_str("    <image:image>\n");
            xml.push_str(&format!("      <image:loc>{}</image:loc>\n", xml_escape(photo)));
            xml.push_str(&format!("      <image:title>{}</image:title>\n", xml_escape(title)));
            xml.push_str("    </image:image>\n");
        }
        xml.push_str("  </url>\n");

        for post in &user.posts {
            let post_url = format!("{}/{}", user_url, urlencoding::encode(&post.slug));
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(&post_url)));
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                post.last_edited.format("%Y-%m-%d")
            ));
            xml.push_str("  </url>\n");
        }
    }

    xml.push_str("</urlset>\n");
    xml
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::Profile;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_only_users_with_published_posts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_db(&temp_dir.path().join("test.db")).await.unwrap();

        repo.set_post(
            "a1",
            &PostData::draft("A")
                .with_title("Live")
                .with_slug("live")
                .published(true),
        )
        .await
        .unwrap();
        repo.set_post("a2", &PostData::draft("A").with_title("Draft"))
            .await
            .unwrap();
        repo.set_user(
            "A",
            &UserData::new(Profile::new("alice").with_photo("https://img/a.png"))
                .with_posts(vec!["a1".into(), "a2".into()]),
        )
        .await
        .unwrap();
        repo.set_user("B", &UserData::new(Profile::new("bob")))
            .await
            .unwrap();

        let users = repo.users_with_published_posts().await.unwrap();

        assert_eq!(users.len(), 1);
        let alice = &users[0];
        assert_eq!(alice.id, "A");
        assert_eq!(alice.name, "alice");
        assert_eq!(alice.photo.as_deref(), Some("https://img/a.png"));
        assert_eq!(alice.posts.len(), 1);
        assert_eq!(alice.posts[0].id, "a1");
        assert_eq!(alice.posts[0].slug, "live");
        assert_eq!(alice.posts[0].title, "Live");
    }

    #[tokio::test]
    async fn test_skips_dangling_references_and_drafts_only_users() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_db(&temp_dir.path().join("test.db")).await.unwrap();

        repo.set_post("c1", &PostData::draft("C")).await.unwrap();
        repo.set_user(
            "C",
            &UserData::new(Profile::new("carol")).with_posts(vec!["gone".into(), "c1".into()]),
        )
        .await
        .unwrap();
        repo.set_post("d1", &PostData::draft("D").published(true))
            .await
            .unwrap();
        repo.set_user(
            "D",
            &UserData::new(Profile::new("dave")).with_posts(vec!["gone".into(), "d1".into()]),
        )
        .await
        .unwrap();

        let users = repo.users_with_published_posts().await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "D");
        assert_eq!(users[0].posts.len(), 1);
        assert_eq!(users[0].posts[0].id, "d1");
    }

    #[tokio::test]
    async fn test_skips_malformed_posts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_db(&temp_dir.path().join("test.db")).await.unwrap();

        let mut bad = serde_json::Map::new();
        bad.insert("author".into(), json!("E"));
        bad.insert("published".into(), json!("yes"));
        repo.store().set(Collection::Posts, "e1", bad).await.unwrap();
        repo.set_post("e2", &PostData::draft("E").with_slug("ok").published(true))
            .await
            .unwrap();
        repo.set_user(
            "E",
            &UserData::new(Profile::new("erin")).with_posts(vec!["e1".into(), "e2".into()]),
        )
        .await
        .unwrap();

        let users = repo.users_with_published_posts().await.unwrap();

        assert_eq!(users.len(), 1);
        let ids: Vec<&str> = users[0].posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["e2"]);
    }

    fn sample_users() -> Vec<SitemapUser> {
        vec![SitemapUser {
            id: "A".into(),
            name: "alice smith".into(),
            photo: Some("https://img/a.png?x=1&y=2".into()),
            display_name: Some("Alice & Co".into()),
            posts: vec![
                SitemapPost {
                    id: "a1".into(),
                    slug: "hello-world".into(),
                    last_edited: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
                    title: "Hello".into(),
                },
                SitemapPost {
                    id: "a2".into(),
                    slug: "second".into(),
                    last_edited: Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap(),
                    title: "Second".into(),
                },
            ],
        }]
    }

    #[test]
    fn test_render_sitemap() {
        let xml = render_sitemap("https://blog.example/", &sample_users());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset"));
        assert!(xml.contains("<loc>https://blog.example/alice%20smith</loc>"));
        assert!(xml.contains("<loc>https://blog.example/alice%20smith/hello-world</loc>"));
        assert!(xml.contains("<lastmod>2024-03-05</lastmod>"));
        // User page takes the newest post's date.
        assert_eq!(xml.matches("<lastmod>2024-04-01</lastmod>").count(), 2);
        assert!(xml.contains("<image:loc>https://img/a.png?x=1&amp;y=2</image:loc>"));
        assert!(xml.contains("<image:title>Alice &amp; Co</image:title>"));
        assert_eq!(xml.matches("<url>").count(), 3);
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn test_render_empty_sitemap() {
        let xml = render_sitemap("https://blog.example", &[]);
        assert!(!xml.contains("<url>"));
        assert!(xml.contains("</urlset>"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&apos;");
    }
}
