use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::utils::error::Result;

#[derive(Parser, Debug)]
#[command(
    name = "stock-watcher",
    about = "Watch a storefront listing page and email when a product comes back in stock",
    version
)]
pub struct Cli {
    /// Path to a TOML configuration file (defaults to config/default.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the polling interval in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Skip the page fetch and send one test notification, then exit
    #[arg(long, conflicts_with = "check_smtp")]
    pub test: bool,

    /// Connect and authenticate to the SMTP server without sending, then exit
    #[arg(long)]
    pub check_smtp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Monitor,
    Test,
    CheckSmtp,
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        if self.test {
            RunMode::Test
        } else if self.check_smtp {
            RunMode::CheckSmtp
        } else {
            RunMode::Monitor
        }
    }

    /// Load configuration and apply command-line overrides on top.
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(interval) = self.interval {
            config.monitor.interval_secs = interval;
        }
    }
}
