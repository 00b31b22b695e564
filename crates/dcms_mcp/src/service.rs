//! `DcmsMcpService`: the eleven MCP tools, wired onto the `rmcp` tool
//! router.

use std::sync::Arc;

use dcms_cma_client::CmaClient;
use dcms_config::{Config, ExecutionConfig};
use dcms_hyperschema::HyperschemaLoader;
use dcms_introspector::Introspector;
use dcms_resource_schema::ResourceSchemaLoader;
use dcms_script_store::{Replacement, ScriptStore};
use dcms_workspace::Workspace;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::ToolCallContext;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler, tool, tool_router};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::models::{
    CreateScriptInput, ExecuteMethodInput, ExecuteScriptInput, ReplacementInput,
    ResourceActionInput, ResourceActionMethodInput, ResourceInput, SchemaInfoInput,
    UpdateScriptInput, ViewScriptInput,
};
use crate::markdown;
use crate::tools::execute::ExecutionContext;
use crate::tools::{discovery, execute, internal_error, schema_info, scripts};

type McpResult<T> = Result<T, ErrorData>;

/// Tools that do nothing useful, or leak data from a project the caller
/// has no credential for, without a configured `DATOCMS_API_TOKEN`. Every
/// other tool (discovery and script storage) stays registered and usable.
const GATED_TOOLS: &[&str] = &[
    "resource_action_readonly_method_execute",
    "resource_action_destructive_method_execute",
    "schema_info",
    "execute_script",
];

#[derive(Clone)]
pub struct DcmsMcpService {
    name: String,
    version: String,
    description: String,
    api_token: Option<String>,
    environment: Option<String>,
    base_url: String,
    execution_config: ExecutionConfig,
    hyperschema: Arc<HyperschemaLoader>,
    resource_schema: Arc<ResourceSchemaLoader>,
    introspector: Arc<Introspector>,
    workspace: Arc<Workspace>,
    cma_client: Option<Arc<CmaClient>>,
    script_store: Arc<Mutex<ScriptStore>>,
    tool_router: ToolRouter<DcmsMcpService>,
}

#[tool_router]
impl DcmsMcpService {
    /// `api_token` is the already-resolved secret (callers resolve
    /// `config.client.api_token` themselves, since [`dcms_config::auth::SecretString::resolve`]
    /// is async and this constructor is not).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Config,
        api_token: Option<String>,
        hyperschema: Arc<HyperschemaLoader>,
        resource_schema: Arc<ResourceSchemaLoader>,
        introspector: Arc<Introspector>,
        workspace: Arc<Workspace>,
        cma_client: Option<Arc<CmaClient>>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            description: config.description.clone(),
            api_token,
            environment: config.client.environment.clone(),
            base_url: config.client.base_url.to_string(),
            execution_config: config.execution.clone(),
            hyperschema,
            resource_schema,
            introspector,
            workspace,
            cma_client,
            script_store: Arc::new(Mutex::new(ScriptStore::new())),
            tool_router: Self::tool_router(),
        }
    }

    fn has_token(&self) -> bool {
        self.api_token.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn resource_schema(&self) -> &Arc<ResourceSchemaLoader> {
        &self.resource_schema
    }

    fn execution_context(&self) -> ExecutionContext<'_> {
        ExecutionContext {
            workspace: &self.workspace,
            config: &self.execution_config,
            api_token: self.api_token.as_deref(),
            environment: self.environment.as_deref(),
            base_url: &self.base_url,
            cma_client: self.cma_client.as_deref(),
        }
    }

    #[tool(
        title = "List Resources",
        description = "Lists every DatoCMS Content Management API resource this server knows about, by namespace and JSON:API type. Call this first."
    )]
    async fn resources(&self) -> McpResult<CallToolResult> {
        let resource_schema = self.resource_schema.get().await.map_err(internal_error)?;
        let summaries = discovery::list_resources(&resource_schema);
        let text = markdown::render_resources(&summaries);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Resource",
        description = "Describes one resource: its overview documentation and the actions (hyperschema links) it exposes."
    )]
    async fn resource(&self, Parameters(input): Parameters<ResourceInput>) -> McpResult<CallToolResult> {
        let hyperschema = self.hyperschema.get().await.map_err(internal_error)?;
        let resource_schema = self.resource_schema.get().await.map_err(internal_error)?;
        let output = discovery::get_resource(&hyperschema, &resource_schema, &input.resource, &input.expand_details)
            .map_err(internal_error)?;
        let text = markdown::render_resource(&output);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Resource Action",
        description = "Describes one action (hyperschema link) on a resource, and lists every client method bound to it."
    )]
    async fn resource_action(
        &self,
        Parameters(input): Parameters<ResourceActionInput>,
    ) -> McpResult<CallToolResult> {
        let hyperschema = self.hyperschema.get().await.map_err(internal_error)?;
        let resource_schema = self.resource_schema.get().await.map_err(internal_error)?;
        let output = discovery::get_resource_action(
            &hyperschema,
            &resource_schema,
            &input.resource,
            &input.action,
            &input.expand_details,
        )
        .map_err(internal_error)?;
        let text = markdown::render_resource_action(&output);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Resource Action Method",
        description = "Returns a client method's full signature (parameters, return type, doc comment) and expands its referenced types from the installed SDK's declaration file."
    )]
    async fn resource_action_method(
        &self,
        Parameters(input): Parameters<ResourceActionMethodInput>,
    ) -> McpResult<CallToolResult> {
        let resource_schema = self.resource_schema.get().await.map_err(internal_error)?;
        let Some(namespace) = discovery::resolve_namespace(&resource_schema, &input.resource) else {
            return Err(internal_error(format!("no resource matches '{}'", input.resource)));
        };

        let found = discovery::get_method_signature(
            &self.introspector,
            &namespace,
            &input.method,
            input.max_depth,
            input.expand_types,
        )
        .await
        .map_err(internal_error)?;

        let Some((signature, expanded)) = found else {
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "No method `{}` exists on `{namespace}`.",
                input.method
            ))]));
        };

        let text = markdown::render_method_signature(&signature, &expanded);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Execute Read-Only Method",
        description = "Invokes a GET-backed (read-only) client method with the given positional arguments and returns its result, optionally filtered by a JSON-path-like selector. Requires DATOCMS_API_TOKEN."
    )]
    async fn resource_action_readonly_method_execute(
        &self,
        Parameters(input): Parameters<ExecuteMethodInput>,
    ) -> McpResult<CallToolResult> {
        self.execute_method_checked(input, true).await
    }

    #[tool(
        title = "Execute Destructive Method",
        description = "Invokes a non-GET (create/update/destroy) client method with the given positional arguments and returns its result, optionally filtered by a JSON-path-like selector. Requires DATOCMS_API_TOKEN."
    )]
    async fn resource_action_destructive_method_execute(
        &self,
        Parameters(input): Parameters<ExecuteMethodInput>,
    ) -> McpResult<CallToolResult> {
        self.execute_method_checked(input, false).await
    }

    #[tool(
        title = "Schema Info",
        description = "Fuzzy-searches the live project's models by api_key/name/id, optionally pulling in referenced block models, reverse references, and block embedders. Requires DATOCMS_API_TOKEN."
    )]
    async fn schema_info(&self, Parameters(input): Parameters<SchemaInfoInput>) -> McpResult<CallToolResult> {
        let Some(client) = &self.cma_client else {
            return Err(internal_error("DATOCMS_API_TOKEN is not configured"));
        };

        let output = schema_info::run(
            client,
            &input.query,
            input.include_blocks,
            input.include_reverse_references,
            input.include_block_embedders,
            &input.fields_details,
            input.field_allowlist.as_deref(),
        )
        .await
        .map_err(internal_error)?;

        let text = schema_info::render(&output);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Create Script",
        description = "Saves a new named TypeScript script. Optionally tsc-validates and/or executes it immediately (both require DATOCMS_API_TOKEN)."
    )]
    async fn create_script(&self, Parameters(input): Parameters<CreateScriptInput>) -> McpResult<CallToolResult> {
        let ctx = self.execution_context();
        let ctx = (input.validate || input.execute).then_some(&ctx);
        let mut store = self.script_store.lock().await;
        let (result, outcome) =
            scripts::create(&mut store, &self.workspace, ctx, &input.name, &input.content, input.validate, input.execute)
                .await
                .map_err(internal_error)?;
        let text = markdown::render_script_save(&result.script.name, &result.script.content, &outcome);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Update Script",
        description = "Applies an ordered list of exact-match string replacements to an existing script. Optionally tsc-validates and/or executes the result (both require DATOCMS_API_TOKEN)."
    )]
    async fn update_script(&self, Parameters(input): Parameters<UpdateScriptInput>) -> McpResult<CallToolResult> {
        let ctx = self.execution_context();
        let ctx = (input.validate || input.execute).then_some(&ctx);
        let replacements: Vec<Replacement> = input
            .replacements
            .into_iter()
            .map(|ReplacementInput { old_str, new_str }| Replacement { old_str, new_str })
            .collect();
        let mut store = self.script_store.lock().await;
        let (result, outcome) =
            scripts::update(&mut store, &self.workspace, ctx, &input.name, &replacements, input.validate, input.execute)
                .await
                .map_err(internal_error)?;
        let text = markdown::render_script_save(&result.script.name, &result.script.content, &outcome);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(title = "View Script", description = "Returns the current content of a saved script.")]
    async fn view_script(&self, Parameters(input): Parameters<ViewScriptInput>) -> McpResult<CallToolResult> {
        let store = self.script_store.lock().await;
        let script = scripts::view(&store, &input.name).map_err(internal_error)?;
        let text = markdown::render_script_view(script);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        title = "Execute Script",
        description = "Executes a saved script in the sandboxed workspace and returns its stdout/stderr. Requires DATOCMS_API_TOKEN."
    )]
    async fn execute_script(&self, Parameters(input): Parameters<ExecuteScriptInput>) -> McpResult<CallToolResult> {
        let ctx = self.execution_context();
        let store = self.script_store.lock().await;
        let outcome = scripts::execute(&store, &ctx, &input.name, input.timeout_seconds, input.max_output_bytes)
            .await
            .map_err(internal_error)?;
        let text = markdown::render_execute_result("script", &input.name, &outcome, None);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    async fn execute_method_checked(&self, input: ExecuteMethodInput, expect_readonly: bool) -> McpResult<CallToolResult> {
        let resource_schema = self.resource_schema.get().await.map_err(internal_error)?;
        let Some(namespace) = discovery::resolve_namespace(&resource_schema, &input.resource) else {
            return Err(internal_error(format!("no resource matches '{}'", input.resource)));
        };

        let Some(endpoint) = discovery::find_endpoint_by_method(&resource_schema, &namespace, &input.method) else {
            return Err(internal_error(format!("no method `{}` exists on `{namespace}`", input.method)));
        };

        let is_readonly = endpoint.method.eq_ignore_ascii_case("get");
        if is_readonly != expect_readonly {
            return Err(internal_error(format!(
                "`{}.{}` is a {} method; call the other execute tool instead",
                namespace,
                input.method,
                if is_readonly { "read-only" } else { "destructive" }
            )));
        }

        let ctx = self.execution_context();
        let execution = execute::execute_method(&ctx, &namespace, &input.method, &input.args, input.filter.as_deref())
            .await
            .map_err(internal_error)?;

        let mut res = CallToolResult::success(vec![Content::text(markdown::render_execute_result(
            &namespace,
            &input.method,
            &execution.outcome,
            execution.filtered.as_ref(),
        ))]);
        if let Some(value) = &execution.filtered {
            res.structured_content = Some(json!(value));
        }
        Ok(res)
    }
}

impl ServerHandler for DcmsMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                title: Some(self.name.clone()),
                version: self.version.clone(),
                ..Default::default()
            },
            instructions: Some(self.description.clone()),
        }
    }

    #[instrument(skip_all, fields(mcp.method = "tools/list", mcp.id = %ctx.id))]
    async fn list_tools(
        &self,
        _req: Option<PaginatedRequestParam>,
        ctx: RequestContext<RoleServer>,
    ) -> McpResult<ListToolsResult> {
        let all = self.tool_router.list_all();
        let visible = if self.has_token() {
            all
        } else {
            all.into_iter().filter(|t| !GATED_TOOLS.contains(&t.name.as_ref())).collect()
        };
        let res = ListToolsResult::with_all_items(visible);
        info!(tools.length = res.tools.len(), "tools/list");
        Ok(res)
    }

    #[instrument(skip_all, fields(mcp.method = "tools/call", mcp.id = %ctx.id, mcp.tool.name = %req.name))]
    async fn call_tool(
        &self,
        req: CallToolRequestParam,
        ctx: RequestContext<RoleServer>,
    ) -> McpResult<CallToolResult> {
        if !self.has_token() && GATED_TOOLS.contains(&req.name.as_ref()) {
            return Err(ErrorData::invalid_request(
                format!("tool '{}' requires DATOCMS_API_TOKEN to be configured", req.name),
                None,
            ));
        }

        let tool_name = req.name.clone();
        let tcc = ToolCallContext::new(self, req, ctx);
        let res = self.tool_router.call(tcc).await?;

        info!(
            tool.result.is_error = res.is_error.unwrap_or_default(),
            tool.result.has_structured_content = res.structured_content.is_some(),
            "tools/call - {tool_name}"
        );

        Ok(res)
    }
}
