use secrecy::SecretString;
use std::net::SocketAddr;
use std::time::Duration;

use crate::utils::get_env_with_prefix;

/// Main configuration for the planwatch service.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub notifier: NotifierConfig,
    pub settings: SettingsConfig,
    /// Static API key required on `/plan-states` routes.
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Configuration for the periodic plan scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between scheduler passes.
    pub interval_seconds: u64,
    /// Trial duration used when the shared-config service has not supplied one.
    pub default_trial_days: u32,
}

/// Configuration for outbound notification calls.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Shared secret sent to the external backend on every call.
    pub service_secret: Option<SecretString>,
    /// Per-call timeout so a hung backend cannot stall a scheduler pass.
    pub timeout: Duration,
}

/// Configuration for the shared-config service client.
#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Base URL of the shared-config service. None disables remote settings.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            notifier: NotifierConfig::default(),
            settings: SettingsConfig::default(),
            api_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            default_trial_days: 14,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            service_secret: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(interval) = get_env_with_prefix("SCHEDULER_INTERVAL_SECONDS") {
            if let Ok(s) = interval.parse() {
                config.interval_seconds = s;
            }
        }
        if let Some(days) = get_env_with_prefix("DEFAULT_TRIAL_DAYS") {
            if let Ok(d) = days.parse() {
                config.default_trial_days = d;
            }
        }

        config
    }
}

impl NotifierConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secret) = get_env_with_prefix("SERVICE_SECRET") {
            config.service_secret = Some(SecretString::from(secret));
        }
        if let Some(timeout) = get_env_with_prefix("NOTIFIER_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                config.timeout = Duration::from_secs(t);
            }
        }

        config
    }
}

impl SettingsConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = get_env_with_prefix("SHARED_CONFIG_URL") {
            config.base_url = Some(url);
        }
        if let Some(timeout) = get_env_with_prefix("SHARED_CONFIG_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                config.timeout = Duration::from_secs(t);
            }
        }

        config
    }
}

/// Builder for Config with environment variable support.
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_scheduler_interval(mut self, seconds: u64) -> Self {
        self.config.scheduler.interval_seconds = seconds;
        self
    }

    pub fn with_default_trial_days(mut self, days: u32) -> Self {
        self.config.scheduler.default_trial_days = days;
        self
    }

    pub fn with_service_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.notifier.service_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_notifier_timeout(mut self, timeout: Duration) -> Self {
        self.config.notifier.timeout = timeout;
        self
    }

    pub fn with_shared_config_url(mut self, url: impl Into<String>) -> Self {
        self.config.settings.base_url = Some(url.into());
        self
    }

    /// Load configuration from environment variables with PLANWATCH_ prefix.
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = get_env_with_prefix("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(key) = get_env_with_prefix("API_KEY") {
            self.config.api_key = Some(SecretString::from(key));
        }

        self.config.scheduler = SchedulerConfig::from_env();
        self.config.notifier = NotifierConfig::from_env();
        self.config.settings = SettingsConfig::from_env();

        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> crate::error::Result<Config> {
        self.config.server.addr().map_err(|e| {
            crate::error::PlanwatchError::validation(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        if self.config.server.port == 0 {
            return Err(crate::error::PlanwatchError::validation(
                "Server port must be greater than 0",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(crate::error::PlanwatchError::validation(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.scheduler.interval_seconds == 0 {
            return Err(crate::error::PlanwatchError::validation(
                "Scheduler interval must be greater than 0",
            ));
        }

        if self.config.scheduler.default_trial_days == 0 {
            return Err(crate::error::PlanwatchError::validation(
                "Default trial duration must be at least 1 day",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
