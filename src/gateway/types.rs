//! Tool Gateway Types
//!
//! Core types shared by every [`ToolGateway`](super::ToolGateway) implementation:
//! - [`GatewayConfig`]: Process configuration (command, args, env, required credentials)
//! - [`ToolRef`]: Handle to a tool exposed by the gateway
//! - [`ToolCallRequest`]: Request to invoke a tool
//! - [`ToolCallResult`]: Result from a tool invocation
//! - [`ContentBlock`]: Content block in tool results
//! - [`ToolDefinition`]: Tool schema advertised by the gateway

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WayfarerError};

/// Credential the Mapbox MCP server needs
pub const MAPBOX_TOKEN_VAR: &str = "MAPBOX_ACCESS_TOKEN";

/// Tool gateway process configuration.
///
/// # Example TOML
///
/// ```toml
/// [gateway]
/// name = "mapbox"
/// command = "npx"
/// args = ["-y", "@mapbox/mcp-server"]
/// required_env = ["MAPBOX_ACCESS_TOKEN"]
///
/// [gateway.env]
/// MAPBOX_ACCESS_TOKEN = "pk.…"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GatewayConfig {
    /// Display name used in logs and errors
    #[serde(default = "default_name")]
    pub name: String,

    /// Command to execute (e.g., "npx", "node")
    #[serde(default = "default_command")]
    pub command: String,

    /// Command arguments
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Extra environment for the child (credentials go here)
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Variables that must be present (and non-empty) in `env` before spawning
    #[serde(default = "default_required_env")]
    pub required_env: Vec<String>,

    /// Child working directory; inherits ours when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

fn default_name() -> String {
    "mapbox".to_string()
}

fn default_command() -> String {
    "npx".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-y".to_string(), "@mapbox/mcp-server".to_string()]
}

fn default_required_env() -> Vec<String> {
    vec![MAPBOX_TOKEN_VAR.to_string()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            command: default_command(),
            args: default_args(),
            env: HashMap::new(),
            required_env: default_required_env(),
            cwd: None,
        }
    }
}

impl GatewayConfig {
    /// Create a config with no arguments and no required credentials.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            required_env: Vec::new(),
            cwd: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Declare a credential that must be set before the process is spawned.
    pub fn requires_env(mut self, key: impl Into<String>) -> Self {
        self.required_env.push(key.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Check command and credentials without touching any process.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if name or command is empty
    /// - `MissingCredential` for the first required variable that is absent or empty
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(WayfarerError::InvalidConfig {
                message: "gateway name cannot be empty".to_string(),
            });
        }
        if self.command.is_empty() {
            return Err(WayfarerError::InvalidConfig {
                message: format!("gateway '{}' command cannot be empty", self.name),
            });
        }

        for var in &self.required_env {
            let present = self.env.get(var).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(WayfarerError::MissingCredential {
                    var: var.clone(),
                    gateway: self.name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Opaque handle to a tool exposed by the gateway (its name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolRef(Arc<str>);

impl ToolRef {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::borrow::Borrow<str> for ToolRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Request to call a gateway tool.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolCallRequest {
    /// Tool name (e.g., "search_and_geocode_tool")
    pub name: String,

    /// JSON object passed as the call arguments
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_arguments(mut self, args: Value) -> Self {
        self.arguments = args;
        self
    }
}

/// Result from a tool call.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolCallResult {
    /// Blocks in server order
    pub content: Vec<ContentBlock>,

    /// Whether the tool reported an error
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn success(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Successful result with a single text block holding `value` as JSON.
    pub fn json(value: &Value) -> Self {
        Self::success(vec![ContentBlock::text(value.to_string())])
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }

    /// Extract all text content, joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| block.text.as_deref())
    }

    /// Parse the first text block that holds valid JSON.
    pub fn first_json(&self) -> Option<Value> {
        self.content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .find_map(|text| serde_json::from_str(text).ok())
    }
}

/// Content block in tool results.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ContentBlock {
    /// MCP block kind; only "text" blocks are read
    #[serde(rename = "type")]
    pub content_type: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
        }
    }

    pub fn is_text(&self) -> bool {
        self.content_type == "text"
    }
}

/// Tool definition advertised by the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Argument schema advertised by the server
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}
