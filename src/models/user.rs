use serde::{Deserialize, Serialize};
use std::fmt;

use super::post::{format_date, Post};

/// Public profile fields of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique handle used in public URLs.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            photo: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }
}

/// Stored body of a user document: the profile plus post IDs in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserData {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default)]
    pub posts: Vec<String>,
}

impl UserData {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            posts: Vec::new(),
        }
    }

    pub fn with_posts(mut self, posts: Vec<String>) -> Self {
        self.posts = posts;
        self
    }
}

/// A user with every referenced post fetched, in reference order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub posts: Vec<Post>,
}

impl User {
    /// Only the published posts, in reference order.
    pub fn published_posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(|post| post.data.published)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = self
            .profile
            .display_name
            .as_deref()
            .unwrap_or(&self.profile.name);
        writeln!(f, "{}", heading)?;
        writeln!(f, "{}", "=".repeat(heading.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Name: {}", self.profile.name)?;
        if let Some(photo) = &self.profile.photo {
            writeln!(f, "Photo: {}", photo)?;
        }

        if !self.posts.is_empty() {
            writeln!(f, "\nPosts:")?;
            for post in &self.posts {
                let marker = if post.is_draft() { " [draft]" } else { "" };
                writeln!(
                    f,
                    "  - {} {}{} ({})",
                    format_date(&post.data.last_edited),
                    post.display_title(),
                    marker,
                    post.data.slug
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostData;

    #[test]
    fn test_user_data_field_names() {
        let data = UserData::new(
            Profile::new("alice")
                .with_display_name("Alice")
                .with_photo("https://img/alice.png"),
        )
        .with_posts(vec!["p1".into()]);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["displayName"], "Alice");
        assert_eq!(json["photo"], "https://img/alice.png");
        assert_eq!(json["posts"], serde_json::json!(["p1"]));
    }

    #[test]
    fn test_missing_posts_reads_as_empty() {
        let data: UserData = serde_json::from_value(serde_json::json!({ "name": "bob" })).unwrap();
        assert_eq!(data.profile.name, "bob");
        assert!(data.profile.display_name.is_none());
        assert!(data.posts.is_empty());
    }

    #[test]
    fn test_published_posts() {
        let user = User {
            id: "u1".into(),
            profile: Profile::new("alice"),
            posts: vec![
                Post::new("p1", PostData::draft("u1").published(true)),
                Post::new("p2", PostData::draft("u1")),
            ],
        };

        let ids: Vec<&str> = user.published_posts().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn test_user_display() {
        let user = User {
            id: "u1".into(),
            profile: Profile::new("alice").with_display_name("Alice A."),
            posts: vec![Post::new(
                "p1",
                PostData::draft("u1").with_title("First").with_slug("first"),
            )],
        };

        let output = format!("{}", user);
        assert!(output.starts_with("Alice A.\n"));
        assert!(output.contains("Name: alice"));
        assert!(output.contains("First [draft] (first)"));
    }
}
