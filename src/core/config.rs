use crate::core::quote::normalize_currency;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AwesomeApiConfig {
    pub base_url: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for AwesomeApiConfig {
    fn default() -> Self {
        AwesomeApiConfig {
            base_url: "https://economia.awesomeapi.com.br".to_string(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub awesome_api: AwesomeApiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportsConfig {
    pub folder: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        ReportsConfig {
            folder: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AutomationConfig {
    pub interval_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        AutomationConfig {
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EmailConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub to: Option<String>,
}

impl EmailConfig {
    /// Host and credentials are present. A recipient may still come from the
    /// command line.
    pub fn is_configured(&self) -> bool {
        self.host.is_some() && self.user.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WhatsAppConfig {
    #[serde(default = "default_twilio_url")]
    pub base_url: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn default_twilio_url() -> String {
    "https://api.twilio.com".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        WhatsAppConfig {
            base_url: default_twilio_url(),
            account_sid: None,
            auth_token: None,
            from: None,
            to: None,
        }
    }
}

impl WhatsAppConfig {
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from.is_some()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlertsConfig {
    pub target: Option<f64>,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

fn default_cooldown_secs() -> u64 {
    3600
}

impl Default for AlertsConfig {
    fn default() -> Self {
        AlertsConfig {
            target: None,
            cooldown_secs: default_cooldown_secs(),
            email: EmailConfig::default(),
            whatsapp: WhatsAppConfig::default(),
        }
    }
}

fn default_currencies() -> Vec<String> {
    vec!["USD".to_string(), "EUR".to_string(), "BTC".to_string()]
}

fn default_reference_currency() -> String {
    "BRL".to_string()
}

fn default_history_days() -> u32 {
    7
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Currencies offered by default; the first one is used when a command
    /// does not name one.
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    #[serde(default = "default_reference_currency")]
    pub reference_currency: String,
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currencies: default_currencies(),
            reference_currency: default_reference_currency(),
            history_days: default_history_days(),
            providers: ProvidersConfig::default(),
            reports: ReportsConfig::default(),
            automation: AutomationConfig::default(),
            alerts: AlertsConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when it does not
    /// exist yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "dashfin", "dashfin")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "dashfin", "dashfin")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn default_currency(&self) -> &str {
        self.currencies.first().map_or("USD", String::as_str)
    }

    /// Upper-cases and checks every configured currency code.
    pub fn normalize(&mut self) -> Result<()> {
        self.reference_currency = normalize_currency(&self.reference_currency)
            .context("Invalid reference_currency")?;
        self.currencies = self
            .currencies
            .iter()
            .map(|code| normalize_currency(code))
            .collect::<Result<_>>()
            .context("Invalid entry in currencies")?;
        Ok(())
    }

    /// Overrides alert credentials with values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let email = &mut self.alerts.email;
        if let Some(host) = var("ALERT_EMAIL_HOST") {
            email.host = Some(host);
        }
        if let Some(port) = var("ALERT_EMAIL_PORT") {
            email.port = Some(
                port.trim()
                    .parse()
                    .with_context(|| format!("Invalid ALERT_EMAIL_PORT: {port}"))?,
            );
        }
        if let Some(user) = var("ALERT_EMAIL_USER") {
            email.user = Some(user);
        }
        if let Some(password) = var("ALERT_EMAIL_PASS") {
            email.password = Some(password);
        }
        if let Some(to) = var("ALERT_EMAIL_TO") {
            email.to = Some(to);
        }

        let whatsapp = &mut self.alerts.whatsapp;
        if let Some(sid) = var("TWILIO_ACCOUNT_SID") {
            whatsapp.account_sid = Some(sid);
        }
        if let Some(token) = var("TWILIO_AUTH_TOKEN") {
            whatsapp.auth_token = Some(token);
        }
        if let Some(from) = var("TWILIO_WHATSAPP_FROM") {
            whatsapp.from = Some(from);
        }
        if let Some(to) = var("ALERT_WHATSAPP_TO") {
            whatsapp.to = Some(to);
        }

        Ok(())
    }
}
