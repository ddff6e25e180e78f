use clap::{Args, ValueEnum};

use abyss::config::Config;
use abyss::db::{render_sitemap, BlogRepository};
use abyss::store::DocumentStore;

#[derive(Clone, ValueEnum, Default)]
pub enum SitemapFormat {
    #[default]
    Xml,
    Json,
}

#[derive(Args)]
pub struct SitemapCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "xml")]
    format: SitemapFormat,

    /// Site root for generated URLs (defaults to the configured base_url)
    #[arg(long)]
    base_url: Option<String>,
}

impl SitemapCommand {
    pub async fn run<S: DocumentStore>(
        &self,
        repo: &BlogRepository<S>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let users = repo.users_with_published_posts().await?;

        match self.format {
            SitemapFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&users)?);
            }
            SitemapFormat::Xml => {
                let base_url = self.base_url.as_deref().unwrap_or(&config.base_url.value);
                println!("{}", render_sitemap(base_url, &users));
            }
        }
        Ok(())
    }
}
