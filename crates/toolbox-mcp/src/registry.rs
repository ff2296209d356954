use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse};

/// Definition of a tool as advertised by `tools/list`.
///
/// `input_schema` documents the accepted arguments; it is never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// One invocable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool once.
    ///
    /// Arguments are unvalidated: any field may be missing or mistyped.
    /// Bad input is answered with a 4xx response, a missing capability
    /// with a 500 response.
    ///
    /// # Errors
    ///
    /// Only for unexpected failures, such as a storage backend erroring.
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error>;
}

/// Name-keyed table of tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: Vec<Arc<dyn ToolHandler>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every shipped tool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTool`] if two shipped tools share a name.
    pub fn builtin() -> Result<Self, Error> {
        let mut registry = Self::new();
        crate::tools::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Add a tool. Names are case-sensitive and must be unique.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTool`] if the name is already taken.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), Error> {
        if self.index.contains_key(&definition.name) {
            return Err(Error::DuplicateTool(definition.name));
        }

        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
        self.handlers.push(handler);
        Ok(())
    }

    /// All definitions, in registration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Find the handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] for unregistered names.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ToolHandler>, Error> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.handlers[slot]))
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(u16);

    #[async_trait]
    impl ToolHandler for Fixed {
        async fn invoke(
            &self,
            _args: &Map<String, Value>,
            _ctx: &ExecutionContext,
        ) -> Result<HandlerResponse, Error> {
            Ok(HandlerResponse::text(self.0, "fixed"))
        }
    }

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, "test tool", json!({"type": "object"}))
    }

    #[test]
    fn all_tools_defined() {
        let registry = ToolRegistry::builtin().unwrap();
        let names: Vec<&str> = registry.list().iter().map(|t| t.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["hello", "api", "ping", "get-kv", "set-kv", "http-request", "weather"]
        );
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn tools_serialize() {
        let registry = ToolRegistry::builtin().unwrap();
        let json = serde_json::to_string(registry.list()).unwrap();
        assert!(json.contains("http-request"));
        assert!(json.contains("inputSchema"));
    }

    #[test]
    fn schemas_forbid_additional_properties() {
        let registry = ToolRegistry::builtin().unwrap();
        for tool in registry.list() {
            assert_eq!(
                tool.input_schema["additionalProperties"],
                json!(false),
                "{} schema",
                tool.name
            );
        }
    }

    #[test]
    fn set_kv_has_required_params() {
        let registry = ToolRegistry::builtin().unwrap();
        let set = registry.list().iter().find(|t| t.name == "set-kv").unwrap();
        let required = set.input_schema["required"].as_array().unwrap();

        let required_names: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
        assert!(required_names.contains(&"key"));
        assert!(required_names.contains(&"value"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = ToolRegistry::new();
        registry
            .register(definition("a"), Arc::new(Fixed(200)))
            .unwrap();
        let err = registry
            .register(definition("a"), Arc::new(Fixed(500)))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut registry = ToolRegistry::new();
        registry
            .register(definition("Echo"), Arc::new(Fixed(200)))
            .unwrap();
        assert!(registry.lookup("Echo").is_ok());
        assert!(matches!(
            registry.lookup("echo"),
            Err(Error::ToolNotFound(name)) if name == "echo"
        ));
    }

    #[test]
    fn listing_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(definition(name), Arc::new(Fixed(200)))
                .unwrap();
        }
        let names: Vec<&str> = registry.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn lookup_returns_the_registered_handler() {
        let mut registry = ToolRegistry::new();
        registry
            .register(definition("teapot"), Arc::new(Fixed(418)))
            .unwrap();
        let handler = registry.lookup("teapot").unwrap();
        let resp = handler
            .invoke(&Map::new(), &ExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(resp.status, 418);
    }
}
