//! Stdio Tool Gateway (rmcp)
//!
//! Spawns the gateway as a child process and talks MCP (JSON-RPC 2.0) over
//! its stdin/stdout using the official rmcp SDK.
//!
//! ```text
//! StdioGateway
//!     │
//!     └── rmcp::Service<RoleClient>
//!             │
//!             └── TokioChildProcess transport ──► npx -y @mapbox/mcp-server
//! ```
//!
//! Credentials are checked in [`StdioGateway::new`], so a missing token is
//! reported before any process exists.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::model::{CallToolRequestParams, ListToolsResult};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument};

use crate::error::{Result, WayfarerError};
use crate::gateway::types::{
    ContentBlock, GatewayConfig, ToolCallRequest, ToolCallResult, ToolDefinition,
};
use crate::gateway::ToolGateway;

type RmcpService = RunningService<RoleClient, ()>;

/// Child-process tool gateway.
pub struct StdioGateway {
    config: GatewayConfig,

    /// Running rmcp service (None when disconnected)
    service: AsyncMutex<Option<RmcpService>>,

    /// Protocol version reported by the server
    server_version: Mutex<Option<String>>,
}

impl std::fmt::Debug for StdioGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioGateway")
            .field("name", &self.config.name)
            .field("command", &self.config.command)
            .field("args", &self.config.args)
            .field("connected", &self.is_connected_sync())
            .finish()
    }
}

impl StdioGateway {
    /// Create a gateway from configuration without spawning anything.
    ///
    /// # Errors
    ///
    /// `MissingCredential` / `InvalidConfig` from [`GatewayConfig::validate`].
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            service: AsyncMutex::new(None),
            server_version: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Protocol version reported by the server (if connected)
    pub fn server_version(&self) -> Option<String> {
        self.server_version.lock().clone()
    }

    fn is_connected_sync(&self) -> bool {
        self.service
            .try_lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(Path::new(cwd));
        }

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        cmd
    }
}

#[async_trait]
impl ToolGateway for StdioGateway {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip(self), fields(gateway = %self.config.name))]
    async fn connect(&self) -> Result<()> {
        let mut guard = self.service.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        // Re-check: the config is public and could have been built elsewhere
        self.config.validate()?;

        let transport =
            TokioChildProcess::new(self.command()).map_err(|e| WayfarerError::GatewayStart {
                name: self.config.name.clone(),
                reason: format!("Failed to spawn '{}': {}", self.config.command, e),
            })?;

        let service = ().serve(transport).await.map_err(|e| WayfarerError::GatewayStart {
            name: self.config.name.clone(),
            reason: format!("MCP handshake failed: {}", e),
        })?;

        if let Some(info) = service.peer_info() {
            *self.server_version.lock() = Some(info.protocol_version.to_string());
        }

        info!(
            command = %self.config.command,
            protocol = ?self.server_version(),
            "Tool gateway connected"
        );

        *guard = Some(service);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let mut guard = self.service.lock().await;

        if let Some(service) = guard.take() {
            if let Err(e) = service.cancel().await {
                debug!(gateway = %self.config.name, error = %e, "Gateway cancel reported an error");
            }
            info!(gateway = %self.config.name, "Tool gateway shut down");
        }

        *self.server_version.lock() = None;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.service.lock().await.is_some()
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| WayfarerError::GatewayNotConnected {
                name: self.config.name.clone(),
            })?;

        let result: ListToolsResult = service.list_tools(Default::default()).await.map_err(|e| {
            WayfarerError::GatewayProtocol {
                name: self.config.name.clone(),
                reason: format!("tools/list failed: {}", e),
            }
        })?;

        let tools = result
            .tools
            .into_iter()
            .map(|t| {
                let tool = ToolDefinition::new(t.name.to_string())
                    .with_input_schema(serde_json::Value::Object((*t.input_schema).clone()));
                match &t.description {
                    Some(desc) => tool.with_description(desc.to_string()),
                    None => tool,
                }
            })
            .collect();

        Ok(tools)
    }

    async fn call_tool(&self, request: &ToolCallRequest) -> Result<ToolCallResult> {
        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| WayfarerError::GatewayNotConnected {
                name: self.config.name.clone(),
            })?;

        let params = CallToolRequestParams {
            meta: None,
            name: request.name.to_string().into(),
            arguments: request.arguments.as_object().cloned(),
            task: None,
        };

        let result = service
            .call_tool(params)
            .await
            .map_err(|e| WayfarerError::ToolCall {
                tool: request.name.clone(),
                reason: e.to_string(),
            })?;

        let content: Vec<ContentBlock> = result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| ContentBlock::text(t.text.clone())))
            .collect();

        Ok(ToolCallResult {
            content,
            is_error: result.is_error.unwrap_or(false),
        })
    }
}
