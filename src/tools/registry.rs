//! Tool registry - manages and dispatches tool calls
//!
//! Holds the definitions advertised to the agent (local functions plus
//! service-hosted tools) and routes required actions to local handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{AgentError, Result, ToolCall, ToolDefinition};
use crate::tools::sales_data::{SalesData, SalesDataTool};

/// A locally executed function tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Descriptor advertised when the agent is created
    fn definition(&self) -> ToolDefinition;

    /// Execute one call and return the text to submit back to the run
    async fn call(&self, call: &ToolCall) -> Result<String>;
}

/// Registry of available tools
pub struct ToolRegistry {
    /// Advertised definitions, in registration order
    definitions: Vec<ToolDefinition>,
    /// Local handlers indexed by function name
    handlers: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("definitions", &self.definitions)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Sales data query tool first, then any hosted tools
    pub fn with_sales_data(
        sales: SalesData,
        hosted: impl IntoIterator<Item = ToolDefinition>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SalesDataTool::new(sales)));
        for definition in hosted {
            registry.register_hosted(definition);
        }
        registry
    }

    /// Register a local tool; a tool with the same name is replaced in place
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let definition = tool.definition();
        let name = definition.name().to_string();
        self.upsert(definition);
        self.handlers.insert(name, tool);
    }

    /// Register a tool the service executes itself
    pub fn register_hosted(&mut self, definition: ToolDefinition) {
        self.handlers.remove(definition.name());
        self.upsert(definition);
    }

    fn upsert(&mut self, definition: ToolDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|existing| existing.name() == definition.name())
        {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    /// Look up the local handler for a function name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.handlers.get(name).cloned()
    }

    /// All advertised definitions
    pub fn descriptors(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .resolve(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");
        tool.call(call).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
