//! Tool System
//!
//! Tools are registered once at startup through [`ToolRegistryBuilder`],
//! validated, and then invoked by the orchestration loop by name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Parsed tool arguments
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

const MAX_TOOL_NAME_LEN: usize = 64;

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID, echoed back by the matching tool turn
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as a JSON-encoded object
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Create a call for providers that omit the call ID
    pub fn with_generated_id(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::new(format!("call_{}", uuid::Uuid::new_v4().simple()), name, arguments)
    }

    /// Decode the JSON-encoded arguments into an object
    pub fn parse_arguments(&self) -> Result<ToolArguments> {
        let raw = self.arguments.trim();
        if raw.is_empty() {
            return Ok(ToolArguments::new());
        }

        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(AgentError::Parse(format!(
                "arguments for '{}' must be a JSON object, got {other}",
                self.name
            ))),
            Err(e) => Err(AgentError::Parse(format!(
                "invalid arguments for '{}': {e}",
                self.name
            ))),
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (filled in by the registry)
    pub id: Option<String>,

    /// Output handed to the model as the tool turn content
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            output: output.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// JSON Schema object describing the parameters
    pub fn parameters_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.param_type,
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with parsed arguments
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, arguments: &ToolArguments) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Collects tools before the registry is frozen
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    #[must_use]
    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Validate names and freeze the registry.
    ///
    /// Names must be unique, non-empty, at most 64 characters and made of
    /// ASCII alphanumerics, `_` or `-`.
    pub fn build(self) -> Result<ToolRegistry> {
        let mut index = HashMap::with_capacity(self.tools.len());
        let mut schemas = Vec::with_capacity(self.tools.len());

        for (i, tool) in self.tools.iter().enumerate() {
            let schema = tool.schema();
            validate_tool_name(&schema.name)?;

            if index.insert(schema.name.clone(), i).is_some() {
                return Err(AgentError::Config(format!(
                    "Tool '{}' registered twice",
                    schema.name
                )));
            }
            schemas.push(schema);
        }

        Ok(ToolRegistry {
            tools: self.tools,
            schemas,
            index,
        })
    }
}

fn validate_tool_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_TOOL_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(AgentError::Config(format!("Invalid tool name: '{name}'")))
    }
}

/// Frozen set of available tools
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    schemas: Vec<ToolSchema>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Registry with no tools
    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            schemas: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        let arguments = call.parse_arguments()?;
        tool.validate(&arguments)?;

        let result = tool.execute(&arguments).await?;
        Ok(result.with_id(call.id.clone()))
    }

    /// Tool schemas in registration order
    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
