use clap::{Args, Subcommand};

use super::OutputFormat;
use abyss::db::BlogRepository;
use abyss::models::{Profile, User};
use abyss::store::DocumentStore;

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Register a new user
    Add {
        /// User ID
        id: String,

        /// Unique user name, used in public URLs
        name: String,

        /// Name shown on the profile page
        #[arg(long)]
        display_name: Option<String>,

        /// Profile photo URL
        #[arg(long)]
        photo: Option<String>,
    },

    /// Show a user and their posts
    Show {
        /// User ID or name
        identifier: String,

        /// Only list published posts
        #[arg(long)]
        published: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl UserCommand {
    pub async fn run<S: DocumentStore>(
        &self,
        repo: &BlogRepository<S>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            UserSubcommand::Add {
                id,
                name,
                display_name,
                photo,
            } => {
                if name.trim().is_empty() {
                    return Err("User name cannot be empty".into());
                }

                let mut profile = Profile::new(name.trim());
                if let Some(display_name) = display_name {
                    profile = profile.with_display_name(display_name);
                }
                if let Some(photo) = photo {
                    profile = profile.with_photo(photo);
                }

                repo.register_user(id, profile).await?;
                println!("Registered user: {} ({})", name.trim(), id);
                Ok(())
            }

            UserSubcommand::Show {
                identifier,
                published,
                format,
            } => {
                let mut user = find_user(repo, identifier).await?;
                if *published {
                    user.posts = user.published_posts().cloned().collect();
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&user)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", user);
                    }
                }
                Ok(())
            }
        }
    }
}

/// Look up by ID first, then fall back to name.
async fn find_user<S: DocumentStore>(
    repo: &BlogRepository<S>,
    identifier: &str,
) -> Result<User, Box<dyn std::error::Error>> {
    if repo.user_exists(identifier).await? {
        Ok(repo.get_user(identifier).await?)
    } else {
        Ok(repo.get_user_by_name(identifier).await?)
    }
}
