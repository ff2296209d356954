use std::sync::Arc;

use toolbox_core::traits::EmbeddingBackend;
use toolbox_core::ExecutionContext;
use toolbox_mcp::McpEngine;

/// Settings for the OpenAI-compatible routes.
#[derive(Debug, Clone, Default)]
pub struct OpenAiSettings {
    /// Bearer key clients must present; `None` disables the check.
    pub api_key: Option<String>,
    /// Backend model that overrides every alias.
    pub embedding_model: Option<String>,
}

/// Shared application state with injected dependencies.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<McpEngine>,
    pub embeddings: Option<Arc<dyn EmbeddingBackend>>,
    pub openai: OpenAiSettings,
}

impl AppState {
    pub fn new(engine: McpEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            embeddings: None,
            openai: OpenAiSettings::default(),
        }
    }

    #[must_use]
    pub fn with_embeddings(mut self, backend: Arc<dyn EmbeddingBackend>) -> Self {
        self.embeddings = Some(backend);
        self
    }

    #[must_use]
    pub fn with_openai(mut self, settings: OpenAiSettings) -> Self {
        self.openai = settings;
        self
    }

    /// Capabilities shared by the tools and the REST routes.
    pub fn context(&self) -> &ExecutionContext {
        self.engine.context()
    }
}
