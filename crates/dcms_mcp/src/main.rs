//! `dcms-mcp`: local binary entrypoint. Loads configuration, materializes
//! the script workspace, wires the loaders/introspector/CMA client, and
//! serves the tool registry over stdio (the default, matching how MCP
//! clients like Claude Desktop launch local servers) or streamable HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dcms_cma_client::CmaClient;
use dcms_config::logger::{Transport, init_logger};
use dcms_config::Config;
use dcms_hyperschema::HyperschemaLoader;
use dcms_introspector::Introspector;
use dcms_mcp::{DcmsMcpServer, DcmsMcpService};
use dcms_resource_schema::ResourceSchemaLoader;
use dcms_workspace::{PackageManager, Workspace};
use tracing::info;
use url::Url;

/// Resources.json ships inside the base client package the Node
/// declaration is rooted at (see `dcms_introspector::script`), not the
/// `-node` wrapper package, which only re-exports it.
const RESOURCE_MANIFEST_RELATIVE_PATH: &str = "node_modules/@datocms/cma-client/resources.json";
const HYPERSCHEMA_PATH: &str = "site-api-hyperschema.json";

#[derive(Debug, Parser)]
#[command(name = "dcms-mcp", about = "Code-mode MCP server for the DatoCMS Content Management API")]
struct Cli {
    /// Serve over stdio instead of streamable HTTP (the default for local MCP clients).
    #[arg(long)]
    stdio: bool,

    /// Host address to bind to when serving over HTTP.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on when serving over HTTP.
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Don't print the startup banner.
    #[arg(long)]
    no_banner: bool,

    /// Path to a `dcms.json` config file. Defaults to the OS user-config directory.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path().context("resolving default config path")?,
    };
    let config = Config::load(&config_path).context("loading configuration")?;

    let transport = if cli.stdio { Transport::Stdio } else { Transport::Http };
    init_logger(&config.logger, transport);

    let api_token = match &config.client.api_token {
        Some(secret) => Some(secret.resolve().await.context("resolving DATOCMS_API_TOKEN")?),
        None => None,
    };
    if api_token.is_none() {
        info!("DATOCMS_API_TOKEN not configured; execute/schema_info tools will stay unregistered");
    }

    let workspace_root = Workspace::default_root().context("resolving workspace directory")?;
    let workspace = Arc::new(Workspace::new(workspace_root, PackageManager::default()));
    workspace.ensure().await.context("materializing the script workspace")?;

    let hyperschema_url: Url = config
        .client
        .base_url
        .join(HYPERSCHEMA_PATH)
        .context("building hyperschema URL")?;
    let http_client = reqwest::Client::builder().build().context("building HTTP client")?;
    let hyperschema = Arc::new(HyperschemaLoader::new(hyperschema_url, http_client));

    let resources_json_path = workspace.root().join(RESOURCE_MANIFEST_RELATIVE_PATH);
    let resource_schema = Arc::new(ResourceSchemaLoader::new(resources_json_path));

    let introspector = Arc::new(Introspector::new(workspace.clone()));

    let cma_client = api_token
        .as_ref()
        .map(|token| Arc::new(CmaClient::new(&config.client, token.clone())));

    let service = DcmsMcpService::new(
        &config,
        api_token,
        hyperschema,
        resource_schema,
        introspector,
        workspace,
        cma_client,
    );

    let server = DcmsMcpServer::new(&cli.host, cli.port, !cli.no_banner);
    if cli.stdio {
        server.serve_stdio(service).await?;
    } else {
        server.serve(service).await?;
    }

    info!("shutting down");
    Ok(())
}
