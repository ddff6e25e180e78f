mod config_cmd;
mod post;
mod sitemap;
mod user;

pub use config_cmd::ConfigCommand;
pub use post::PostCommand;
pub use sitemap::SitemapCommand;
pub use user::UserCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
