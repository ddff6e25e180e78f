use clap::{Args, Subcommand};

use super::OutputFormat;
use abyss::config::{Config, ConfigSource};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        match &config.config_file {
                            Some(path) => println!("Config file: {}", path.display()),
                            None => println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            ),
                        }
                        println!();

                        print_value(
                            "database_path",
                            config.database_path.value.display(),
                            &config.database_path.source,
                        );
                        print_value("base_url", &config.base_url.value, &config.base_url.source);
                        print_value("port", config.port.value, &config.port.source);
                        println!("api_keys: {} configured", config.api_keys.len());
                    }
                }
                Ok(())
            }
        }
    }
}

fn print_value(name: &str, value: impl std::fmt::Display, source: &ConfigSource) {
    println!("{}: {}", name, value);
    println!("  source: {}\n", source);
}
