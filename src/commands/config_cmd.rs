use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;

use super::OutputFormat;
use crate::config::Config;

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

    /// Initialize configuration file
    Init,

    /// Change UI preferences
    Prefs {
        /// Use the dark theme
        #[arg(long)]
        dark_mode: Option<bool>,

        /// Start with the sidebar collapsed
        #[arg(long)]
        sidebar_collapsed: Option<bool>,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &mut Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("created_by: {}", config.created_by.value);
                        println!("  source: {}", config.created_by.source);
                        println!();

                        println!(
                            "sync.feed_url: {}",
                            config.sync.feed_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.merge_policy: {}", config.sync.merge_policy);
                        println!();

                        println!("preferences.dark_mode: {}", config.preferences.dark_mode);
                        println!(
                            "preferences.sidebar_collapsed: {}",
                            config.preferences.sidebar_collapsed
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'arkive config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let default_config = r#"# arkive configuration

# Path to SQLite database (default: platform data dir)
# database_path: arkive.db

# User recorded on new receipts, expenses and uploads
created_by: default

# Remote feed
# sync:
#   feed_url: ws://localhost:8080/feed
#   merge_policy: remote-wins   # or newest-wins
"#;

                let mut file = fs::File::create(&config_path)?;
                file.write_all(default_config.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }

            ConfigSubcommand::Prefs {
                dark_mode,
                sidebar_collapsed,
            } => {
                if dark_mode.is_none() && sidebar_collapsed.is_none() {
                    return Err("Nothing to change. Provide at least one option.".into());
                }

                let mut preferences = config.preferences;
                if let Some(dark_mode) = dark_mode {
                    preferences.dark_mode = *dark_mode;
                }
                if let Some(collapsed) = sidebar_collapsed {
                    preferences.sidebar_collapsed = *collapsed;
                }

                config.save_preferences(preferences)?;
                println!(
                    "Saved preferences: dark_mode={}, sidebar_collapsed={}",
                    preferences.dark_mode, preferences.sidebar_collapsed
                );
                Ok(())
            }
        }
    }
}
