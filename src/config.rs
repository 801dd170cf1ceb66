use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from study_buddy.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub limits: CardLimits,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP server and storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind: std::net::SocketAddr,
    pub database_path: String,
    pub require_auth: bool,
    pub session_ttl_days: i64,
}

/// OpenAI chat-completions configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub retries: u32,
}

/// Bounds applied to the number of cards a single request may produce
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CardLimits {
    pub min_cards: usize,
    pub max_cards: usize,
    pub default_cards: usize,
}

impl CardLimits {
    /// Resolve a requested card count against the configured bounds.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_cards)
            .clamp(self.min_cards, self.max_cards)
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            log_level: "study_buddy=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "study_buddy=info".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses STUDY_BUDDY_CONFIG environment variable or defaults to "study_buddy.toml"
    pub fn load() -> anyhow::Result<Self> {
        // Load environment variables with smart fallbacks:
        // 1) STUDY_ENV_FILE if set
        // 2) ./.env
        // 3) ../.env (repo root when running from crate dir)
        if let Ok(env_path) = std::env::var("STUDY_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
            let core_present =
                std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("STUDY_DB_PATH").is_ok();
            if !core_present {
                let _ = dotenvy::from_path("../.env");
            }
        }

        let config_path =
            std::env::var("STUDY_BUDDY_CONFIG").unwrap_or_else(|_| "study_buddy.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        // Apply env overrides (env-first)
        if let Ok(v) = std::env::var("STUDY_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            config.server.bind = bind;
        }
        if let Ok(path) = std::env::var("STUDY_DB_PATH") {
            config.server.database_path = path;
        }
        if let Ok(v) = std::env::var("STUDY_REQUIRE_AUTH") {
            config.server.require_auth = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(days) = std::env::var("STUDY_SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            && days > 0
        {
            config.server.session_ttl_days = days;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.openai.model = model;
        }
        if let Ok(url) = std::env::var("STUDY_OPENAI_BASE_URL") {
            config.openai.base_url = url;
        }
        if let Some(n) = std::env::var("MIN_FLASHCARDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.limits.min_cards = n;
        }
        if let Some(n) = std::env::var("MAX_FLASHCARDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.limits.max_cards = n;
        }
        if let Some(n) = std::env::var("DEFAULT_FLASHCARDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.limits.default_cards = n;
        }

        // Load runtime configuration from environment variables
        config.runtime = RuntimeConfig::load_from_env();

        // Validate configuration

        if !config.openai.base_url.starts_with("http://")
            && !config.openai.base_url.starts_with("https://")
        {
            tracing::warn!(
                "OpenAI base URL '{}' doesn't start with http:// or https://",
                config.openai.base_url
            );
        }

        if config.openai.max_tokens == 0 {
            anyhow::bail!("openai.max_tokens must be greater than 0");
        }
        if !(0.0..=2.0).contains(&config.openai.temperature) {
            anyhow::bail!(
                "openai.temperature must be between 0.0 and 2.0, got {}",
                config.openai.temperature
            );
        }

        // Validate and clamp retries
        if config.openai.retries == 0 {
            config.openai.retries = 1;
        } else if config.openai.retries > 10 {
            tracing::warn!(
                "openai.retries {} exceeds max 10, clamping to 10",
                config.openai.retries
            );
            config.openai.retries = 10;
        }

        // Validate and repair card limits
        if config.limits.min_cards == 0 {
            config.limits.min_cards = 1;
        }
        if config.limits.max_cards < config.limits.min_cards {
            tracing::warn!(
                "max_cards {} below min_cards {}, raising to match",
                config.limits.max_cards,
                config.limits.min_cards
            );
            config.limits.max_cards = config.limits.min_cards;
        }
        config.limits.default_cards = config
            .limits
            .default_cards
            .clamp(config.limits.min_cards, config.limits.max_cards);

        if config.server.session_ttl_days <= 0 {
            anyhow::bail!(
                "server.session_ttl_days must be positive, got {}",
                config.server.session_ttl_days
            );
        }

        if config.openai_key().is_none() {
            tracing::warn!("No usable OpenAI API key configured, running in demo mode");
        }

        Ok(config)
    }

    /// The configured OpenAI API key, if it is usable.
    /// Placeholder values from sample env files count as absent.
    pub fn openai_key(&self) -> Option<&str> {
        let key = self.runtime.openai_api_key.as_deref()?;
        let trimmed = key.trim();
        let is_placeholder = trimmed.is_empty()
            || trimmed.contains("${")
            || trimmed.eq_ignore_ascii_case("demo-mode-no-api-key")
            || trimmed.eq_ignore_ascii_case("your-api-key-here")
            || trimmed.eq_ignore_ascii_case("your-openai-api-key-here")
            || trimmed.eq_ignore_ascii_case("changeme");
        if is_placeholder { None } else { Some(key) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:5000"
                    .parse()
                    .expect("default bind address should parse"),
                database_path: "study_buddy.db".to_string(),
                require_auth: false,
                session_ttl_days: 7,
            },
            openai: OpenAiConfig {
                model: "gpt-3.5-turbo".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                max_tokens: 1000,
                temperature: 0.7,
                retries: 3,
            },
            limits: CardLimits {
                min_cards: 3,
                max_cards: 10,
                default_cards: 5,
            },
            runtime: RuntimeConfig::default(),
        }
    }
}
