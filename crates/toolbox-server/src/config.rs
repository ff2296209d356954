use clap::Parser;
use thiserror::Error;

/// Server settings, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "toolbox-server", about = "MCP tool server with OpenAI-compatible embeddings")]
pub struct ServerConfig {
    #[arg(long, env = "TOOLBOX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "TOOLBOX_PORT", default_value_t = 8787)]
    pub port: u16,

    /// Greeting used by the `hello` tool and route
    #[arg(long, env = "GREETING", default_value = toolbox_core::context::DEFAULT_GREETING)]
    pub greeting: String,

    /// Postgres URL; without it the storage capabilities are unavailable
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub database_max_connections: u32,

    /// Timeout for outbound HTTP requests, in seconds
    #[arg(long, env = "OUTBOUND_TIMEOUT_SECS", default_value_t = 30)]
    pub outbound_timeout_secs: u64,

    /// Bearer key required on the OpenAI-compatible routes
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Backend model used for every embedding request
    #[arg(long, env = "EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    #[arg(long, env = "EMBEDDING_BASE_URL")]
    pub embedding_base_url: Option<String>,

    #[arg(long, env = "EMBEDDING_API_TOKEN", hide_env_values = true)]
    pub embedding_api_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("EMBEDDING_BASE_URL and EMBEDDING_API_TOKEN must be set together")]
    PartialEmbeddingBackend,
    #[error("EMBEDDING_BASE_URL must be an http(s) URL")]
    InvalidEmbeddingBaseUrl,
    #[error("DATABASE_MAX_CONNECTIONS must be at least 1")]
    InvalidPoolSize,
    #[error("OUTBOUND_TIMEOUT_SECS must be at least 1")]
    InvalidTimeout,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    /// Parse flags and environment, then validate.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for inconsistent settings. Flag parse errors
    /// exit the process through clap.
    pub fn load() -> Result<Self, ConfigError> {
        Self::parse().validated()
    }

    /// Treat blank values as unset and check cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for inconsistent settings.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.database_url = non_empty(self.database_url);
        self.openai_api_key = non_empty(self.openai_api_key);
        self.embedding_model = non_empty(self.embedding_model);
        self.embedding_base_url = non_empty(self.embedding_base_url);
        self.embedding_api_token = non_empty(self.embedding_api_token);
        if self.greeting.trim().is_empty() {
            self.greeting = toolbox_core::context::DEFAULT_GREETING.to_string();
        }

        if self.database_max_connections == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }
        if self.outbound_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        match (&self.embedding_base_url, &self.embedding_api_token) {
            (Some(base_url), Some(_)) => {
                let parsed =
                    url::Url::parse(base_url).map_err(|_| ConfigError::InvalidEmbeddingBaseUrl)?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidEmbeddingBaseUrl);
                }
            }
            (None, None) => {}
            _ => return Err(ConfigError::PartialEmbeddingBackend),
        }

        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL and token of the embedding backend, when both are configured.
    pub fn embedding_endpoint(&self) -> Option<(&str, &str)> {
        self.embedding_base_url
            .as_deref()
            .zip(self.embedding_api_token.as_deref())
    }
}
