//! MCP Server Implementation
//!
//! This module provides the core MCP server: capability registration,
//! per-session connection state, message routing, and the stdio transport.

use crate::mcp::errors::{ErrorHandler, McpError};
use crate::mcp::protocol::*;
use crate::mcp::resources::UriTemplate;
use crate::mcp::validation::McpValidator;
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Session id used for the single connection of the stdio transport
pub const STDIO_SESSION_ID: &str = "stdio";

/// Sessions with no traffic for this long are forgotten
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// State kept for one client connection
#[derive(Debug, Clone)]
pub struct Session {
    pub state: ConnectionState,
    pub protocol_version: Option<String>,
    pub client_info: Option<Implementation>,
    pub created_at: DateTime<Utc>,
    /// Time of the last message that named this session
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            state: ConnectionState::Uninitialized,
            protocol_version: None,
            client_info: None,
            created_at: now,
            last_seen: now,
        }
    }

    /// Whether the session has been quiet for longer than `timeout` at `now`
    #[inline]
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        (now - self.last_seen)
            .to_std()
            .is_ok_and(|elapsed| elapsed > timeout)
    }
}

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

/// Resource handler trait for resolving a URI matched by a resource template
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(
        &self,
        uri: &str,
        variables: &HashMap<String, String>,
    ) -> Result<ReadResourceResult>;
}

/// Prompt handler trait for rendering prompt templates
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn handle(&self, arguments: HashMap<String, String>) -> Result<GetPromptResult>;
}

struct RegisteredTool {
    definition: Tool,
    handler: Box<dyn ToolHandler>,
}

struct RegisteredTemplate {
    definition: ResourceTemplate,
    template: UriTemplate,
    handler: Box<dyn ResourceHandler>,
}

struct RegisteredPrompt {
    definition: Prompt,
    handler: Box<dyn PromptHandler>,
}

/// Collects capability declarations before the server starts
pub struct McpServerBuilder {
    server_info: Implementation,
    instructions: Option<String>,
    tools: Vec<RegisteredTool>,
    templates: Vec<(ResourceTemplate, Box<dyn ResourceHandler>)>,
    prompts: Vec<RegisteredPrompt>,
    session_idle_timeout: Duration,
}

impl McpServerBuilder {
    #[inline]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            instructions: None,
            tools: Vec::new(),
            templates: Vec::new(),
            prompts: Vec::new(),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    /// Usage hint sent to clients in the initialize response
    #[inline]
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// How long a session may stay quiet before it is evicted
    #[inline]
    #[must_use]
    pub fn session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Register a tool with the server
    #[inline]
    #[must_use]
    pub fn tool<H>(mut self, tool: Tool, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        self.tools.push(RegisteredTool {
            definition: tool,
            handler: Box::new(handler),
        });
        self
    }

    /// Register a resource template with the server
    #[inline]
    #[must_use]
    pub fn resource_template<H>(mut self, template: ResourceTemplate, handler: H) -> Self
    where
        H: ResourceHandler + 'static,
    {
        self.templates.push((template, Box::new(handler)));
        self
    }

    /// Register a prompt with the server
    #[inline]
    #[must_use]
    pub fn prompt<H>(mut self, prompt: Prompt, handler: H) -> Self
    where
        H: PromptHandler + 'static,
    {
        self.prompts.push(RegisteredPrompt {
            definition: prompt,
            handler: Box::new(handler),
        });
        self
    }

    /// Validate the declarations and produce an immutable server
    #[inline]
    pub fn build(self) -> Result<McpServer> {
        let mut validator = McpValidator::new()?;

        let mut tools = BTreeMap::new();
        for tool in self.tools {
            let name = tool.definition.name.clone();
            if tools.contains_key(&name) {
                bail!("Duplicate tool name: {}", name);
            }
            validator.add_tool_schema(&tool.definition)?;
            debug!("Registered tool: {}", name);
            tools.insert(name, tool);
        }

        let mut resource_templates = BTreeMap::new();
        for (definition, handler) in self.templates {
            let name = definition.name.clone();
            if resource_templates.contains_key(&name) {
                bail!("Duplicate resource template name: {}", name);
            }
            let template = UriTemplate::parse(&definition.uri_template)?;
            debug!("Registered resource template: {} ({})", name, template);
            resource_templates.insert(
                name,
                RegisteredTemplate {
                    definition,
                    template,
                    handler,
                },
            );
        }

        let mut prompts = BTreeMap::new();
        for prompt in self.prompts {
            let name = prompt.definition.name.clone();
            if prompts.contains_key(&name) {
                bail!("Duplicate prompt name: {}", name);
            }
            debug!("Registered prompt: {}", name);
            prompts.insert(name, prompt);
        }

        let capabilities = ServerCapabilities {
            prompts: (!prompts.is_empty()).then_some(PromptsCapability {
                list_changed: Some(false),
            }),
            resources: (!resource_templates.is_empty()).then_some(ResourcesCapability {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            tools: (!tools.is_empty()).then_some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        Ok(McpServer {
            server_info: self.server_info,
            capabilities,
            instructions: self.instructions,
            tools,
            resource_templates,
            prompts,
            sessions: RwLock::new(HashMap::new()),
            session_idle_timeout: self.session_idle_timeout,
            validator,
            started_at: Utc::now(),
        })
    }
}

/// MCP Server state and configuration
pub struct McpServer {
    /// Server implementation information
    pub server_info: Implementation,
    /// Server capabilities
    pub capabilities: ServerCapabilities,
    /// Instructions returned from initialize
    pub instructions: Option<String>,
    tools: BTreeMap<String, RegisteredTool>,
    resource_templates: BTreeMap<String, RegisteredTemplate>,
    prompts: BTreeMap<String, RegisteredPrompt>,
    sessions: RwLock<HashMap<String, Session>>,
    session_idle_timeout: Duration,
    validator: McpValidator,
    started_at: DateTime<Utc>,
}

/// Message handler for processing incoming messages of one session
pub struct MessageHandler {
    server: Arc<McpServer>,
    session_id: String,
}

impl McpServer {
    /// Start declaring capabilities for a new server
    #[inline]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> McpServerBuilder {
        McpServerBuilder::new(name, version)
    }

    /// Parse a raw JSON value into a validated JSON-RPC message
    #[inline]
    pub fn parse_message(&self, value: &Value) -> Result<JsonRpcMessage> {
        self.validator.validate_raw_message(value)
    }

    /// Whether the server accepts the given protocol version
    #[inline]
    pub fn supports_protocol_version(&self, version: &str) -> bool {
        self.validator.is_protocol_version_supported(version)
    }

    /// Route a message from a session, returning the reply if one is due
    #[inline]
    pub async fn handle_message(
        self: &Arc<Self>,
        session_id: &str,
        message: JsonRpcMessage,
    ) -> Option<JsonRpcMessage> {
        MessageHandler::new(Arc::clone(self), session_id)
            .process_message(message)
            .await
    }

    /// Open a new session with a random id, evicting idle ones first
    #[inline]
    pub async fn create_session(&self) -> String {
        self.evict_idle_sessions().await;
        let session_id = Uuid::new_v4().to_string();
        self.open_session(&session_id).await;
        session_id
    }

    /// Open (or reset) a session under a caller-chosen id
    #[inline]
    pub async fn open_session(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), Session::new());
        debug!("Opened session {}", session_id);
    }

    /// Forget a session. Returns false when the id was unknown.
    #[inline]
    pub async fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            debug!("Closed session {}", session_id);
        }
        removed
    }

    /// Record activity on a session.
    ///
    /// Returns false when the id is unknown or the session had already gone
    /// idle, in which case it is removed.
    #[inline]
    pub async fn touch_session(&self, session_id: &str) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        if self.expires(session_id, session, now) {
            sessions.remove(session_id);
            debug!("Session {} expired", session_id);
            return false;
        }

        session.last_seen = now;
        true
    }

    /// Drop every session that has been idle past the timeout.
    /// The stdio session lives as long as its connection and is never evicted.
    #[inline]
    pub async fn evict_idle_sessions(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, session| !self.expires(id, session, now));

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }

    #[inline]
    pub fn session_idle_timeout(&self) -> Duration {
        self.session_idle_timeout
    }

    fn expires(&self, session_id: &str, session: &Session, now: DateTime<Utc>) -> bool {
        session_id != STDIO_SESSION_ID && session.is_idle(now, self.session_idle_timeout)
    }

    #[inline]
    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    #[inline]
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Get current connection state of a session
    #[inline]
    pub async fn connection_state(&self, session_id: &str) -> Option<ConnectionState> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.state)
    }

    async fn set_connection_state(&self, session_id: &str, state: ConnectionState) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(Session::new)
            .state = state;
    }

    /// Summary used by the health endpoint
    #[inline]
    pub async fn health_status(&self) -> ServerHealthStatus {
        let now = Utc::now();
        let active_sessions = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(id, session)| {
                session.state != ConnectionState::Closed && !self.expires(id, session, now)
            })
            .count();

        ServerHealthStatus {
            status: "ok".to_string(),
            active_sessions,
            tools_registered: self.tools.len(),
            resource_templates_registered: self.resource_templates.len(),
            prompts_registered: self.prompts.len(),
            started_at: self.started_at,
            uptime_seconds: (Utc::now() - self.started_at).num_seconds(),
        }
    }

    /// Detailed view of registrations and sessions
    #[inline]
    pub async fn server_statistics(&self) -> ServerStatistics {
        let sessions = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.state))
            .collect();

        ServerStatistics {
            server_info: self.server_info.clone(),
            capabilities: self.capabilities.clone(),
            sessions,
            registered_tools: self.tools.keys().cloned().collect(),
            registered_resource_templates: self
                .resource_templates
                .values()
                .map(|t| t.definition.uri_template.clone())
                .collect(),
            registered_prompts: self.prompts.keys().cloned().collect(),
        }
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("Starting MCP server with stdio transport");

        self.serve_io(BufReader::new(io::stdin()), io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC over an arbitrary reader/writer pair
    #[inline]
    pub async fn serve_io<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.open_session(STDIO_SESSION_ID).await;

        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    // First parse as raw JSON
                    let raw_value: Value = match serde_json::from_str(line) {
                        Ok(value) => value,
                        Err(e) => {
                            error!("Failed to parse JSON: {}", e);
                            let error_response =
                                JsonRpcErrorResponse::new(JsonRpcError::parse_error(), None);
                            send_message(
                                &mut writer,
                                &JsonRpcMessage::ErrorResponse(error_response),
                            )
                            .await?;
                            continue;
                        }
                    };

                    // Validate and parse as MCP message
                    match self.parse_message(&raw_value) {
                        Ok(message) => {
                            if let Some(reply) =
                                self.handle_message(STDIO_SESSION_ID, message).await
                            {
                                send_message(&mut writer, &reply).await?;
                            }
                        }
                        Err(e) => {
                            error!("Message validation failed: {}", e);
                            let error_response = JsonRpcErrorResponse::new(
                                JsonRpcError::invalid_request(Some(e.to_string())),
                                None,
                            );
                            send_message(
                                &mut writer,
                                &JsonRpcMessage::ErrorResponse(error_response),
                            )
                            .await?;
                        }
                    }
                }
                Err(e) => {
                    error!("Error reading from stdin: {}", e);
                    break;
                }
            }
        }

        self.set_connection_state(STDIO_SESSION_ID, ConnectionState::Closed)
            .await;

        info!("MCP server stopped");
        Ok(())
    }
}

/// Send a message to the client
async fn send_message<W>(writer: &mut W, message: &JsonRpcMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

impl MessageHandler {
    /// Create a new message handler
    #[inline]
    pub fn new(server: Arc<McpServer>, session_id: impl Into<String>) -> Self {
        Self {
            server,
            session_id: session_id.into(),
        }
    }

    /// Process an incoming message
    #[inline]
    pub async fn process_message(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    /// Handle a JSON-RPC request
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!(
            "Session {} request {:?}: {}",
            self.session_id, request.id, request.method
        );

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "ping" => Ok(Self::handle_ping()),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            "resources/list" => self.handle_list_resources(),
            "resources/templates/list" => self.handle_list_resource_templates(),
            "resources/read" => self.handle_read_resource(request.params).await,
            "prompts/list" => self.handle_list_prompts(),
            "prompts/get" => self.handle_get_prompt(request.params).await,
            method => Err(McpError::MethodNotFound {
                method: method.to_string(),
            }
            .into()),
        };

        match response {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(e) => ErrorHandler::handle_error(&e, Some(request.id)),
        }
    }

    /// Handle a JSON-RPC notification
    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => self.handle_initialized().await,
            "notifications/cancelled" => {
                debug!("Received cancellation notification");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    /// Validate and decode method parameters
    fn parse_params<T: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<T> {
        let params = params.ok_or_else(|| McpError::InvalidParameters {
            message: format!("Request '{}' missing parameters", method),
        })?;

        self.server.validator.validate_method_params(method, &params)?;

        serde_json::from_value(params).map_err(|e| {
            McpError::InvalidParameters {
                message: format!("Invalid parameters for '{}': {}", method, e),
            }
            .into()
        })
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = self.parse_params("initialize", params)?;

        // Check protocol version compatibility
        if !self
            .server
            .supports_protocol_version(&params.protocol_version)
        {
            let supported = self.server.validator.supported_protocol_versions();
            return Err(McpError::UnsupportedProtocolVersion {
                version: params.protocol_version,
                supported: supported.iter().map(ToString::to_string).collect(),
            }
            .into());
        }

        {
            let mut sessions = self.server.sessions.write().await;
            let session = sessions
                .entry(self.session_id.clone())
                .or_insert_with(Session::new);
            session.state = ConnectionState::Initializing;
            session.protocol_version = Some(params.protocol_version.clone());
            session.client_info = Some(params.client_info.clone());
        }

        let result = InitializeResult {
            protocol_version: params.protocol_version,
            capabilities: self.server.capabilities.clone(),
            server_info: self.server.server_info.clone(),
            instructions: self.server.instructions.clone(),
        };

        info!(
            "Client initialized: {} {} (session {})",
            params.client_info.name, params.client_info.version, self.session_id
        );
        Ok(serde_json::to_value(result)?)
    }

    /// Handle initialized notification
    async fn handle_initialized(&self) {
        self.server
            .set_connection_state(&self.session_id, ConnectionState::Ready)
            .await;

        info!("Session {} ready to handle requests", self.session_id);
    }

    /// Handle ping request
    fn handle_ping() -> Value {
        serde_json::json!({})
    }

    /// Handle list tools request
    #[inline]
    pub fn handle_list_tools(&self) -> Result<Value> {
        let tools = self
            .server
            .tools
            .values()
            .map(|t| t.definition.clone())
            .collect();

        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = self.parse_params("tools/call", params)?;

        let registered =
            self.server
                .tools
                .get(&params.name)
                .ok_or_else(|| McpError::ToolNotFound {
                    name: params.name.clone(),
                })?;

        self.server
            .validator
            .validate_tool_arguments(&params.name, &params.arguments_value())?;

        let tool_name = params.name.clone();
        let result = match registered.handler.handle(params).await {
            Ok(result) => result,
            Err(e) if e.downcast_ref::<McpError>().is_some() => return Err(e),
            Err(e) => {
                // Execution failures are reported to the model, not as protocol errors
                error!("Tool '{}' failed: {:#}", tool_name, e);
                CallToolResult {
                    content: vec![ToolContent::Text {
                        text: format!("Error executing tool {}: {}", tool_name, e),
                    }],
                    structured_content: None,
                    is_error: Some(true),
                }
            }
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list resources request
    #[inline]
    pub fn handle_list_resources(&self) -> Result<Value> {
        // Only templated resources are registered, so there is nothing concrete to list
        let result = ListResourcesResult {
            resources: Vec::new(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle list resource templates request
    #[inline]
    pub fn handle_list_resource_templates(&self) -> Result<Value> {
        let resource_templates = self
            .server
            .resource_templates
            .values()
            .map(|t| t.definition.clone())
            .collect();

        Ok(serde_json::to_value(ListResourceTemplatesResult {
            resource_templates,
        })?)
    }

    /// Handle read resource request
    #[inline]
    pub async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        let params: ReadResourceParams = self.parse_params("resources/read", params)?;

        for registered in self.server.resource_templates.values() {
            if let Some(variables) = registered.template.match_uri(&params.uri) {
                debug!(
                    "Resource {} matched template {}",
                    params.uri, registered.template
                );
                let result = registered.handler.handle(&params.uri, &variables).await?;
                return Ok(serde_json::to_value(result)?);
            }
        }

        Err(McpError::ResourceNotFound { uri: params.uri }.into())
    }

    /// Handle list prompts request
    #[inline]
    pub fn handle_list_prompts(&self) -> Result<Value> {
        let prompts = self
            .server
            .prompts
            .values()
            .map(|p| p.definition.clone())
            .collect();

        Ok(serde_json::to_value(ListPromptsResult { prompts })?)
    }

    /// Handle get prompt request
    #[inline]
    pub async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        let params: GetPromptParams = self.parse_params("prompts/get", params)?;

        let registered =
            self.server
                .prompts
                .get(&params.name)
                .ok_or_else(|| McpError::PromptNotFound {
                    name: params.name.clone(),
                })?;

        let arguments = params.arguments.unwrap_or_default();
        if let Some(missing) = registered
            .definition
            .arguments
            .iter()
            .find(|arg| arg.required && !arguments.contains_key(&arg.name))
        {
            return Err(McpError::InvalidParameters {
                message: format!(
                    "Missing required argument '{}' for prompt '{}'",
                    missing.name, params.name
                ),
            }
            .into());
        }

        let result = registered.handler.handle(arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}
