use clap::{Args, Subcommand};

use super::OutputFormat;
use remarkidian::config::Config;

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

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!(
                            "database_path: {}",
                            config.database_path.value.display()
                        );
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("remote:");
                        println!("  api_url: {}", config.remote.api_url);
                        println!("  auth_url: {}", config.remote.auth_url);
                        println!(
                            "  device_token: {}",
                            if config.remote.is_configured() {
                                "(set)"
                            } else {
                                "(not set)"
                            }
                        );
                        println!("  timeout_secs: {}", config.remote.timeout_secs);
                        println!("  max_retries: {}", config.remote.max_retries);
                        println!();

                        println!("server:");
                        println!("  port: {}", config.server.port);
                        match config.server.sync_interval_secs {
                            Some(secs) => println!("  sync_interval_secs: {}", secs),
                            None => println!("  sync_interval_secs: (disabled)"),
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
