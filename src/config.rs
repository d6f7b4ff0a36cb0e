use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::extractor::AvailabilityExtractor;
use crate::utils::error::{AppError, Result};

pub const DEFAULT_URL: &str =
    "https://zotac.co.jp/product-category/graphics-card/?yith_wcan=1&filter_gpu=geforce-rtx-5090&query_type_gpu=or";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Environment variables carrying the mail identity.
pub const EMAIL_ADDRESS_VAR: &str = "EMAIL_ADDRESS";
pub const EMAIL_PASSWORD_VAR: &str = "EMAIL_PASSWORD";
pub const RECIPIENT_EMAIL_VAR: &str = "RECIPIENT_EMAIL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub selectors: SelectorConfig,
    pub email: EmailSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub url: String,
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

/// CSS selectors describing the storefront's listing markup.
///
/// Storefront markup changes silently, so these live in configuration rather
/// than code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorConfig {
    pub listing: String,
    pub item: String,
    pub name: String,
    pub out_of_stock_marker: String,
    /// A bare class token (no leading dot) checked on the item container.
    pub out_of_stock_class: String,
    pub link: String,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_name: String,
}

/// Fully resolved mail identity: sender login and the single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpLogin {
    pub username: String,
    pub password: String,
    pub recipient: String,
}

/// Credential values as read from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    pub address: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

impl EnvCredentials {
    pub fn from_env() -> Self {
        Self {
            address: env::var(EMAIL_ADDRESS_VAR).ok(),
            password: env::var(EMAIL_PASSWORD_VAR).ok(),
            recipient: env::var(RECIPIENT_EMAIL_VAR).ok(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing: "ul.products".to_string(),
            item: "li.product".to_string(),
            name: ".woocommerce-loop-product__title".to_string(),
            out_of_stock_marker: ".ast-shop-product-out-of-stock".to_string(),
            out_of_stock_class: "outofstock".to_string(),
            link: "a.woocommerce-LoopProduct-link".to_string(),
            price: ".price".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl EmailSettings {
    /// Resolve the sender login and recipient, naming the first missing
    /// environment variable on failure.
    pub fn login(&self) -> Result<SmtpLogin> {
        Ok(SmtpLogin {
            username: required(&self.address, EMAIL_ADDRESS_VAR)?,
            password: required(&self.password, EMAIL_PASSWORD_VAR)?,
            recipient: required(&self.recipient, RECIPIENT_EMAIL_VAR)?,
        })
    }
}

// Blank values count as missing, but a present value is returned untouched.
fn required(value: &Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(AppError::MissingSetting { name: name.to_string() }),
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file, `WATCHER__*`
    /// variables and the mail credential variables, in that order.
    ///
    /// Without an explicit path `config/default.toml` is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let credentials = EnvCredentials::from_env();
        match path {
            Some(path) => Self::from_sources(File::from(path).required(true), credentials),
            None => {
                Self::from_sources(File::with_name("config/default").required(false), credentials)
            }
        }
    }

    pub fn from_sources<S>(file: S, credentials: EnvCredentials) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        Self::layered(file, Self::environment(), credentials)
    }

    // Add environment variables with prefix "WATCHER"
    fn environment() -> Environment {
        Environment::with_prefix("WATCHER").separator("__")
    }

    fn layered<S>(file: S, environment: Environment, credentials: EnvCredentials) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let selectors = SelectorConfig::default();

        let s = Config::builder()
            .set_default("monitor.url", DEFAULT_URL)?
            .set_default("monitor.interval_secs", 3600_i64)?
            .set_default("monitor.request_timeout_secs", 30_i64)?
            .set_default("monitor.user_agent", DEFAULT_USER_AGENT)?
            .set_default("selectors.listing", selectors.listing)?
            .set_default("selectors.item", selectors.item)?
            .set_default("selectors.name", selectors.name)?
            .set_default("selectors.out_of_stock_marker", selectors.out_of_stock_marker)?
            .set_default("selectors.out_of_stock_class", selectors.out_of_stock_class)?
            .set_default("selectors.link", selectors.link)?
            .set_default("selectors.price", selectors.price)?
            .set_default("email.smtp_host", "smtp.gmail.com")?
            .set_default("email.smtp_port", 587_i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.directory", "logs")?
            .set_default("logging.file_name", "stock_watcher.log")?
            .add_source(file)
            .add_source(environment)
            .set_override_option("email.address", credentials.address)?
            .set_override_option("email.password", credentials.password)?
            .set_override_option("email.recipient", credentials.recipient)?
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.monitor.url).map_err(|e| {
            AppError::Validation(format!("Invalid monitor URL '{}': {}", self.monitor.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Validation("Monitor URL must use http or https".into()));
        }

        if self.monitor.interval_secs == 0 {
            return Err(AppError::Validation("Monitor interval_secs must be greater than 0".into()));
        }

        if self.monitor.request_timeout_secs == 0 {
            return Err(AppError::Validation(
                "Monitor request_timeout_secs must be greater than 0".into(),
            ));
        }

        let class = &self.selectors.out_of_stock_class;
        if class.is_empty() || class.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "Selector out_of_stock_class must be a single class token".into(),
            ));
        }

        AvailabilityExtractor::new(&self.selectors)?;

        if self.email.smtp_port == 0 {
            return Err(AppError::Validation("SMTP port must be greater than 0".into()));
        }

        Ok(())
    }
}
