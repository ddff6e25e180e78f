use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::OutputFormat;
use abyss::db::BlogRepository;
use abyss::models::{format_date, html_to_text, Post, PostEdit};
use abyss::store::DocumentStore;

#[derive(Args)]
pub struct PostCommand {
    #[command(subcommand)]
    pub command: PostSubcommand,
}

#[derive(Subcommand)]
pub enum PostSubcommand {
    /// Create an empty draft for a user
    Create {
        /// Author's user ID
        #[arg(long)]
        user: String,
    },

    /// List a user's posts, most recently edited first
    List {
        /// Author's user ID
        #[arg(long)]
        user: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a post
    Show {
        /// Post ID, or slug when --user is given
        identifier: String,

        /// Resolve the identifier as a slug under this user name
        #[arg(long)]
        user: Option<String>,

        /// Print the full content
        #[arg(long)]
        content: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a post
    Edit {
        /// Post ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New excerpt
        #[arg(long)]
        excerpt: Option<String>,

        /// New content
        #[arg(long)]
        content: Option<String>,

        /// New slug
        #[arg(long)]
        slug: Option<String>,

        /// Publish the post
        #[arg(long, conflicts_with = "unpublish")]
        publish: bool,

        /// Turn the post back into a draft
        #[arg(long)]
        unpublish: bool,
    },

    /// Remove a post and drop it from its author's list
    Remove {
        /// Post ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl PostCommand {
    pub async fn run<S: DocumentStore>(
        &self,
        repo: &BlogRepository<S>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PostSubcommand::Create { user } => {
                let id = repo.create_post_for_user(user).await?;
                println!("Created draft: {}", id);
                Ok(())
            }

            PostSubcommand::List { user, format } => {
                let posts = repo.list_posts_by_author(user).await?;

                if posts.is_empty() {
                    println!("No posts found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&posts)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<20}  {:<10}  {:<40}  STATUS", "ID", "EDITED", "TITLE");
                        println!("{}", "-".repeat(84));
                        for post in &posts {
                            println!(
                                "{:<20}  {:<10}  {:<40}  {}",
                                post.id,
                                format_date(&post.data.last_edited),
                                truncate(&post.display_title(), 40),
                                if post.is_draft() { "draft" } else { "published" }
                            );
                        }
                        println!("\nTotal: {} post(s)", posts.len());
                    }
                }
                Ok(())
            }

            PostSubcommand::Show {
                identifier,
                user,
                content,
                format,
            } => {
                let post = match user {
                    Some(name) => repo.get_post_by_username_and_slug(name, identifier).await?,
                    None => repo.get_post(identifier).await?,
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&post)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", post);
                        if *content {
                            println!("\n{}", html_to_text(&post.data.content));
                        }
                    }
                }
                Ok(())
            }

            PostSubcommand::Edit {
                id,
                title,
                excerpt,
                content,
                slug,
                publish,
                unpublish,
            } => {
                let edit = PostEdit {
                    title: title.clone(),
                    excerpt: excerpt.clone(),
                    content: content.clone(),
                    slug: slug.clone(),
                    published: match (*publish, *unpublish) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    },
                };

                if edit.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let updated = repo.edit_post(id, &edit).await?;
                println!("Updated post:");
                print!("{}", updated);
                Ok(())
            }

            PostSubcommand::Remove { id, force } => {
                let post = repo.get_post(id).await?;

                if !force && !confirm(&post)? {
                    println!("Removal cancelled.");
                    return Ok(());
                }

                repo.remove_post_for_user(&post.data.author, &post.id).await?;
                println!("Removed post: {}", post.display_title());
                Ok(())
            }
        }
    }
}

fn confirm(post: &Post) -> io::Result<bool> {
    print!("Remove post '{}'? [y/N] ", post.display_title());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
