use serde::Deserialize;
use std::net::SocketAddr;

use domain::models::Coordinate;
use domain::services::EditorSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Fleet backend that persists geofences.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST API. Empty keeps geofences in memory.
    #[serde(default)]
    pub url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
    /// Page size used when a session does not ask for one
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl BackendConfig {
    pub fn is_remote(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn client_config(&self) -> persistence::BackendConfig {
        persistence::BackendConfig {
            url: self.url.trim().to_string(),
            api_token: self.api_token.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Reverse geocoding service.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Service URL (required if enabled)
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_geocoding_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            timeout_ms: default_geocoding_timeout_ms(),
        }
    }
}

/// Defaults of newly drawn geofences and session limits.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_center_lat")]
    pub default_center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub default_center_lng: f64,
    #[serde(default = "default_radius_meters")]
    pub default_radius_meters: f64,
    #[serde(default = "default_polygon_span_degrees")]
    pub default_polygon_span_degrees: f64,
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Sessions without a request for this long are closed
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl EditorConfig {
    pub fn default_center(&self) -> Coordinate {
        Coordinate::new(self.default_center_lat, self.default_center_lng)
    }

    pub fn settings(&self) -> EditorSettings {
        EditorSettings {
            default_center: self.default_center(),
            default_radius_meters: self.default_radius_meters,
            default_polygon_span_degrees: self.default_polygon_span_degrees,
            default_color: self.default_color.clone(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_backend_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    shared::pagination::DEFAULT_PAGE_SIZE
}

fn default_geocoding_timeout_ms() -> u64 {
    5_000
}

fn default_center_lat() -> f64 {
    24.8607
}

fn default_center_lng() -> f64 {
    67.0011
}

fn default_radius_meters() -> f64 {
    500.0
}

fn default_polygon_span_degrees() -> f64 {
    0.005
}

fn default_color() -> String {
    domain::models::geofence::DEFAULT_COLOR.to_string()
}

fn default_max_sessions() -> usize {
    256
}

fn default_session_idle_secs() -> u64 {
    1800
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
    /// 3. Environment variables with GEO__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("GEO")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins"),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds entirely from embedded defaults, without touching config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r##"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

            [logging]
            level = "info"
            format = "pretty"

            [security]
            cors_origins = []

            [backend]
            url = ""
            timeout_ms = 2000
            page_size = 20

            [geocoding]
            enabled = false
            url = ""
            api_key = ""
            timeout_ms = 2000

            [editor]
            default_center_lat = 24.8607
            default_center_lng = 67.0011
            default_radius_meters = 500.0
            default_polygon_span_degrees = 0.005
            default_color = "#FF0000"
            max_sessions = 8
            session_idle_secs = 1800
        "##;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Skip validation to allow tests to build invalid configs
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.editor.default_center().validate().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Default center ({}, {}) is out of range",
                self.editor.default_center_lat, self.editor.default_center_lng
            )));
        }

        if shared::validation::validate_radius_meters(self.editor.default_radius_meters).is_err() {
            return Err(ConfigValidationError::InvalidValue(
                "editor.default_radius_meters must be positive".to_string(),
            ));
        }

        let span = self.editor.default_polygon_span_degrees;
        if span.is_nan() || span <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "editor.default_polygon_span_degrees must be positive".to_string(),
            ));
        }

        if shared::validation::validate_hex_color(&self.editor.default_color).is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "editor.default_color {} is not a hex color",
                self.editor.default_color
            )));
        }

        if self.editor.max_sessions == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "editor.max_sessions must be at least 1".to_string(),
            ));
        }

        if self.editor.session_idle_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "editor.session_idle_secs must be at least 1".to_string(),
            ));
        }

        // A request timeout that fires first abandons the backend call mid-commit.
        let request_timeout_ms = self.server.request_timeout_secs.saturating_mul(1000);
        if self.backend.timeout_ms >= request_timeout_ms {
            return Err(ConfigValidationError::InvalidValue(format!(
                "backend.timeout_ms ({}) must be below server.request_timeout_secs ({}s)",
                self.backend.timeout_ms, self.server.request_timeout_secs
            )));
        }

        if self.geocoding.enabled && self.geocoding.timeout_ms >= request_timeout_ms {
            return Err(ConfigValidationError::InvalidValue(format!(
                "geocoding.timeout_ms ({}) must be below server.request_timeout_secs ({}s)",
                self.geocoding.timeout_ms, self.server.request_timeout_secs
            )));
        }

        if self.backend.page_size == 0 || self.backend.page_size > shared::pagination::MAX_PAGE_SIZE {
            return Err(ConfigValidationError::InvalidValue(format!(
                "backend.page_size must be between 1 and {}",
                shared::pagination::MAX_PAGE_SIZE
            )));
        }

        if self.geocoding.enabled && self.geocoding.url.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "GEO__GEOCODING__URL must be set when geocoding is enabled".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }
}
