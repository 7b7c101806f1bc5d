use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

use shared::jwt::{JwtConfig, JwtError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// JWT authentication configuration
    pub jwt: JwtAuthConfig,
    /// Email service configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Payment processor configuration
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(cfg: &DatabaseConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            max_connections: cfg.max_connections,
            min_connections: cfg.min_connections,
            connect_timeout_secs: cfg.connect_timeout_secs,
            idle_timeout_secs: cfg.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Login attempts per email (or client IP) per hour. 0 disables the limit.
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit_per_hour: u32,

    /// Registrations per client IP per hour. 0 disables the limit.
    #[serde(default = "default_register_rate_limit")]
    pub register_rate_limit_per_hour: u32,

    /// Forgot-password requests per email (or client IP) per hour.
    #[serde(default = "default_forgot_password_rate_limit")]
    pub forgot_password_rate_limit_per_hour: u32,

    /// Reset-password attempts per client IP per hour.
    #[serde(default = "default_reset_password_rate_limit")]
    pub reset_password_rate_limit_per_hour: u32,

    /// Send Strict-Transport-Security. Enable only behind TLS.
    #[serde(default)]
    pub hsts_enabled: bool,

    /// Reverse proxies allowed to set `X-Forwarded-For`. Empty means the
    /// socket peer is always the client address.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            login_rate_limit_per_hour: default_login_rate_limit(),
            register_rate_limit_per_hour: default_register_rate_limit(),
            forgot_password_rate_limit_per_hour: default_forgot_password_rate_limit(),
            reset_password_rate_limit_per_hour: default_reset_password_rate_limit(),
            hsts_enabled: false,
            trusted_proxies: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576 // 1MB
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_login_rate_limit() -> u32 {
    20
}
fn default_register_rate_limit() -> u32 {
    10
}
fn default_forgot_password_rate_limit() -> u32 {
    5
}
fn default_reset_password_rate_limit() -> u32 {
    10
}

/// Access token signing keys. Either an RSA key pair (RS256) or a shared
/// secret (HS256) must be configured; the key pair wins when both are set.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA private key in PEM format for signing tokens
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Shared HS256 secret for development setups without a key pair
    #[serde(default)]
    pub secret: String,

    /// Access token expiration in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl JwtAuthConfig {
    /// Builds the signing configuration from whichever keys are present.
    pub fn signing_config(&self) -> Result<JwtConfig, JwtError> {
        if !self.private_key.is_empty() && !self.public_key.is_empty() {
            JwtConfig::from_rsa_pem(
                &self.private_key,
                &self.public_key,
                self.access_token_expiry_secs,
                self.leeway_secs,
            )
        } else if !self.secret.is_empty() {
            Ok(JwtConfig::from_secret(
                &self.secret,
                self.access_token_expiry_secs,
                self.leeway_secs,
            ))
        } else {
            Err(JwtError::InvalidKey(
                "either jwt.private_key/jwt.public_key or jwt.secret must be set".to_string(),
            ))
        }
    }
}

fn default_access_token_expiry() -> i64 {
    3600 // 1 hour
}

fn default_jwt_leeway() -> u64 {
    30
}

/// Email service configuration for transactional mail.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email sending is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid, or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// SendGrid API key (for sendgrid provider)
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Base URL for email links (e.g., https://app.example.com)
    #[serde(default)]
    pub base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            base_url: String::new(),
        }
    }
}

fn default_email_provider() -> String {
    "console".to_string()
}

fn default_sender_email() -> String {
    "noreply@example.com".to_string()
}

fn default_sender_name() -> String {
    "Event Marketplace".to_string()
}

/// Hosted checkout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    /// Payment provider: stripe, or mock (for development)
    #[serde(default = "default_payments_provider")]
    pub provider: String,

    #[serde(default = "default_payments_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub secret_key: String,

    /// Secret used to verify webhook signatures
    #[serde(default)]
    pub webhook_secret: String,

    /// Redirect after payment. `{CHECKOUT_SESSION_ID}` is filled in by the processor.
    #[serde(default = "default_success_url")]
    pub success_url: String,

    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    #[serde(default = "default_payments_timeout")]
    pub timeout_secs: u64,

    /// Accepted age of a webhook signature timestamp
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            provider: default_payments_provider(),
            api_base: default_payments_api_base(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            timeout_secs: default_payments_timeout(),
            webhook_tolerance_secs: default_webhook_tolerance(),
        }
    }
}

fn default_payments_provider() -> String {
    "mock".to_string()
}

fn default_payments_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_success_url() -> String {
    "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/checkout/cancel".to_string()
}

fn default_payments_timeout() -> u64 {
    15
}

fn default_webhook_tolerance() -> i64 {
    300
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Return issued single-use tokens in API responses. Never enable in production.
    #[serde(default)]
    pub expose_tokens: bool,
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with EM__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("EM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .with_list_parse_key("security.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults and overrides only, without
    /// touching the file system.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            login_rate_limit_per_hour = 20
            forgot_password_rate_limit_per_hour = 5

            [jwt]
            secret = "test-secret"
            access_token_expiry_secs = 3600
            leeway_secs = 30

            [email]
            enabled = false
            provider = "console"
            sender_email = "test@example.com"
            sender_name = "Test"

            [payments]
            provider = "mock"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "EM__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        self.jwt
            .signing_config()
            .map_err(|e| ConfigValidationError::InvalidValue(e.to_string()))?;

        match self.payments.provider.as_str() {
            "mock" => {}
            "stripe" => {
                if self.payments.secret_key.is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "EM__PAYMENTS__SECRET_KEY must be set for the stripe provider".to_string(),
                    ));
                }
                if self.payments.webhook_secret.is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "EM__PAYMENTS__WEBHOOK_SECRET must be set for the stripe provider"
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "Unknown payments provider: {}",
                    other
                )));
            }
        }

        if self.email.enabled
            && self.email.provider == "sendgrid"
            && self.email.sendgrid_api_key.is_empty()
        {
            return Err(ConfigValidationError::MissingRequired(
                "EM__EMAIL__SENDGRID_API_KEY must be set for the sendgrid provider".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
