use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use std::{env, fmt, str::FromStr, time::Duration};
use url::Url;
use validator::ValidateEmail;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Allowed cross-origin client URL(s), comma separated.
    #[serde(default = "default_client_url")]
    pub client_url: String,

    #[serde(default)]
    pub trust_x_forwarded_for: bool,

    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default)]
    pub smtp_port: Option<u16>,

    #[serde(default)]
    pub smtp_starttls: bool,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default = "default_mail_from_name")]
    pub mail_from_name: String,

    #[serde(default)]
    pub owner_email: String,

    #[serde(default = "default_owner_name")]
    pub owner_name: String,

    #[serde(default = "default_mail_timeout")]
    pub mail_timeout_secs: u64,

    #[serde(default = "default_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_api_max_requests")]
    pub rate_limit_max_requests: u64,

    #[serde(default = "default_window_secs")]
    pub contact_rate_limit_window_secs: u64,

    #[serde(default = "default_contact_max_requests")]
    pub contact_rate_limit_max_requests: u64,

    #[serde(default)]
    pub expose_error_details: Option<bool>,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Portfolio-Contact-API".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_client_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
fn default_mail_from_name() -> String {
    "Portfolio".to_string()
}
fn default_owner_name() -> String {
    "Portfolio Owner".to_string()
}
fn default_mail_timeout() -> u64 {
    10
}
fn default_window_secs() -> u64 {
    15 * 60
}
fn default_api_max_requests() -> u64 {
    100
}
fn default_contact_max_requests() -> u64 {
    5
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .ignore_empty(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if !self.owner_email.validate_email() {
            errors.push("OWNER_EMAIL must be a valid email address".into());
        }
        if self.is_production() && !self.has_smtp_credentials() {
            errors.push("SMTP_USERNAME and SMTP_PASSWORD must be set in production".into());
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production".into());
        }
        for origin in self.cors_origins().iter().filter(|o| o.as_str() != "*") {
            if Url::parse(origin).is_err() {
                errors.push(format!("CLIENT_URL entry is not a valid URL: {origin}"));
            }
        }
        if self.mail_timeout_secs == 0 {
            errors.push("MAIL_TIMEOUT_SECS must be positive".into());
        }
        if self.rate_limit_window_secs == 0 || self.contact_rate_limit_window_secs == 0 {
            errors.push("Rate limit windows must be positive".into());
        }
        if self.rate_limit_max_requests == 0 || self.contact_rate_limit_max_requests == 0 {
            errors.push("Rate limit maximums must be positive".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn has_smtp_credentials(&self) -> bool {
        !self.smtp_username.trim().is_empty() && !self.smtp_password.is_empty()
    }

    /// Stack traces and transport errors are only returned to clients outside production,
    /// unless explicitly overridden.
    pub fn expose_error_details(&self) -> bool {
        self.expose_error_details.unwrap_or(!self.is_production())
    }

    /// Sender address for outbound mail; the SMTP account, falling back to the owner inbox.
    pub fn mail_from_address(&self) -> &str {
        if self.smtp_username.validate_email() {
            &self.smtp_username
        } else {
            &self.owner_email
        }
    }

    pub fn mail_timeout(&self) -> Duration {
        Duration::from_secs(self.mail_timeout_secs)
    }

    pub fn api_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn contact_window(&self) -> Duration {
        Duration::from_secs(self.contact_rate_limit_window_secs)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.client_url
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for str {
    fn redact(&self) -> &str {
        if self.is_empty() {
            "[MISSING]"
        } else {
            "[REDACTED]"
        }
    }
}

impl Redact for String {
    fn redact(&self) -> &str {
        self.as_str().redact()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("client_url", &self.client_url)
            .field("trust_x_forwarded_for", &self.trust_x_forwarded_for)
            .field("redis_url", &self.redis_url.as_deref().map(Redact::redact))
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_starttls", &self.smtp_starttls)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.redact())
            .field("owner_email", &self.owner_email)
            .field("mail_timeout_secs", &self.mail_timeout_secs)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("contact_rate_limit_window_secs", &self.contact_rate_limit_window_secs)
            .field("contact_rate_limit_max_requests", &self.contact_rate_limit_max_requests)
            .field("expose_error_details", &self.expose_error_details())
            .finish()
    }
}
