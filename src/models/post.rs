use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored body of a post document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Rich text, stored as HTML.
    #[serde(default)]
    pub content: String,
    /// ID of the owning user.
    pub author: String,
    #[serde(default)]
    pub published: bool,
    pub last_edited: DateTime<Utc>,
    #[serde(default)]
    pub slug: String,
}

impl PostData {
    /// An empty, unpublished draft by `author`.
    pub fn draft(author: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            excerpt: String::new(),
            content: String::new(),
            author: author.into(),
            published: false,
            last_edited: Utc::now(),
            slug: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn with_last_edited(mut self, last_edited: DateTime<Utc>) -> Self {
        self.last_edited = last_edited;
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }
}

/// A post together with its document ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    #[serde(flatten)]
    pub data: PostData,
}

impl Post {
    pub fn new(id: impl Into<String>, data: PostData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Plain-text title, or `Untitled` when there is none.
    pub fn display_title(&self) -> String {
        let title = html_to_text(&self.data.title);
        if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        }
    }

    pub fn is_draft(&self) -> bool {
        !self.data.published
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.display_title();
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Slug: {}", self.data.slug)?;
        writeln!(f, "Author: {}", self.data.author)?;
        writeln!(
            f,
            "Status: {}",
            if self.data.published { "published" } else { "draft" }
        )?;
        writeln!(f, "Last edited: {}", format_date(&self.data.last_edited))?;

        let excerpt = html_to_text(&self.data.excerpt);
        if !excerpt.is_empty() {
            writeln!(f, "\n{}", excerpt)?;
        }

        Ok(())
    }
}

/// Partial edit of a post; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostEdit {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub slug: Option<String>,
    pub published: Option<bool>,
}

impl PostEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.excerpt.is_none()
            && self.content.is_none()
            && self.slug.is_none()
            && self.published.is_none()
    }
}

/// Dashboard date format: `dd-mm-yyyy`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Strip markup from a rich-text fragment and decode the common entities.
pub fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_draft_defaults() {
        let data = PostData::draft("u1");
        assert_eq!(data.author, "u1");
        assert!(!data.published);
        assert!(data.title.is_empty());
        assert!(data.excerpt.is_empty());
        assert!(data.content.is_empty());
    }

    #[test]
    fn test_stored_field_names_are_camel_case() {
        let data = PostData::draft("u1").with_slug("hello");
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("lastEdited").is_some());
        assert!(json.get("last_edited").is_none());
        assert_eq!(json["slug"], "hello");
    }

    #[test]
    fn test_post_flattens_data() {
        let post = Post::new("p1", PostData::draft("u1").with_title("Hi"));
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["title"], "Hi");
        assert_eq!(json["author"], "u1");

        let parsed: Post = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, post);
    }

    #[test]
    fn test_missing_slug_reads_as_empty() {
        let json = serde_json::json!({
            "author": "u1",
            "lastEdited": "2024-03-05T10:00:00Z",
        });
        let data: PostData = serde_json::from_value(json).unwrap();
        assert_eq!(data.slug, "");
        assert!(!data.published);
    }

    #[test]
    fn test_display_title() {
        let untitled = Post::new("p1", PostData::draft("u1"));
        assert_eq!(untitled.display_title(), "Untitled");

        let tagged = Post::new("p2", PostData::draft("u1").with_title("<p>Hello <b>world</b></p>"));
        assert_eq!(tagged.display_title(), "Hello world");

        let blank = Post::new("p3", PostData::draft("u1").with_title("<p> </p>"));
        assert_eq!(blank.display_title(), "Untitled");
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        assert_eq!(html_to_text("Fish &amp; Chips"), "Fish & Chips");
        assert_eq!(html_to_text("a &lt;b&gt; c"), "a <b> c");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(format_date(&date), "05-03-2024");
    }

    #[test]
    fn test_post_display() {
        let post = Post::new(
            "p1",
            PostData::draft("u1")
                .with_title("Hello")
                .with_excerpt("<p>Short intro</p>")
                .with_slug("hello"),
        );
        let output = format!("{}", post);
        assert!(output.contains("Hello\n====="));
        assert!(output.contains("Slug: hello"));
        assert!(output.contains("Status: draft"));
        assert!(output.contains("Short intro"));
    }

    #[test]
    fn test_post_edit_is_empty() {
        assert!(PostEdit::default().is_empty());
        let edit = PostEdit {
            published: Some(true),
            ..Default::default()
        };
        assert!(!edit.is_empty());
    }
}
