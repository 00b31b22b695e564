//! `DcmsMcpServer`: serves [`DcmsMcpService`] over stdio or streamable HTTP,
//! wiring request-id propagation, a tracing layer, graceful shutdown, and
//! a startup banner listing registered resources.

use anyhow::Result;
use opentelemetry::global;
use opentelemetry::trace::TraceContextExt;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::StreamableHttpServerConfig;
use tabled::builder::Builder;
use tabled::settings::object::{Cell, Columns, Rows};
use tabled::settings::peaker::Priority;
use tabled::settings::width::MinWidth;
use tabled::settings::{Alignment, Color, Panel, Style, Width};
use tabled::Table;
use terminal_size::terminal_size;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::extractors::HeaderExtractor;
use crate::service::DcmsMcpService;
use crate::utils::LOGO;
use crate::utils::styles::{fmt_cyan, fmt_dimmed};

/// Host/port/banner knobs for the HTTP transport; `new` defaults `banner`
/// to off, since the stdio transport is the common case and stray stdout
/// writes there would corrupt the JSON-RPC framing.
pub struct DcmsMcpServer {
    host: String,
    port: u16,
    banner: bool,
}

impl DcmsMcpServer {
    pub fn new(host: &str, port: u16, banner: bool) -> Self {
        Self { host: host.into(), port, banner }
    }

    /// Serves over streamable HTTP with ctrl-c shutdown.
    ///
    /// # Panics
    ///
    /// Panics if the ctrl-c handler cannot be installed.
    ///
    /// # Errors
    ///
    /// Errors if the server cannot bind its host/port.
    pub async fn serve(&self, service: DcmsMcpService) -> Result<()> {
        let shutdown_signal = async {
            tokio::signal::ctrl_c().await.expect("failed graceful shutdown");
        };
        self.serve_with_shutdown(service, shutdown_signal).await
    }

    /// # Errors
    ///
    /// Errors if the server cannot bind its host/port.
    pub async fn serve_with_shutdown<F>(&self, service: DcmsMcpService, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.banner_http(&service).await;

        let mcp_service = service.clone();
        let http_service = StreamableHttpService::new(
            move || Ok(mcp_service.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig { stateful_mode: false, ..Default::default() },
        );

        let router = axum::Router::new().nest_service("/mcp", http_service).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestId>()
                        .map_or("unknown".to_string(), |id| id.header_value().to_str().unwrap_or("invalid").to_string());

                    let parent_cx =
                        global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(request.headers())));
                    let is_valid = parent_cx.span().span_context().is_valid();
                    debug!(traceparent = ?request.headers().get("traceparent"), parent_valid = %is_valid, "extracting trace context");

                    let span = tracing::error_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                        request_id = %request_id,
                    );
                    if is_valid {
                        if let Err(e) = span.set_parent(parent_cx) {
                            warn!(err = ?e, "failed setting parent span context");
                        }
                    }
                    span
                })),
        );

        let listener = tokio::net::TcpListener::bind(format!("{}:{}", self.host, self.port)).await?;
        let _ = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal).await;
        Ok(())
    }

    /// Serves over stdio with ctrl-c shutdown.
    ///
    /// # Panics
    ///
    /// Panics if the ctrl-c handler cannot be installed.
    ///
    /// # Errors
    ///
    /// Errors if the stdio transport fails to start or the serving task panics.
    pub async fn serve_stdio(&self, service: DcmsMcpService) -> Result<()> {
        let shutdown_signal = async {
            tokio::signal::ctrl_c().await.expect("failed graceful shutdown");
        };
        self.serve_stdio_with_shutdown(service, shutdown_signal).await
    }

    /// # Errors
    ///
    /// Errors if the stdio transport fails to start or the serving task panics.
    pub async fn serve_stdio_with_shutdown<F>(&self, service: DcmsMcpService, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.banner_stdio(&service).await;

        let mut shutdown_signal = Box::pin(shutdown_signal);
        let mut serve_task = tokio::spawn(service.serve(stdio()));
        let running = tokio::select! {
            () = &mut shutdown_signal => {
                serve_task.abort();
                return Ok(());
            }
            res = &mut serve_task => {
                res.map_err(|e| anyhow::anyhow!(e))?.map_err(|e| anyhow::anyhow!("{e}"))?
            }
        };

        let cancel_token = running.cancellation_token();
        let mut join_handle = tokio::spawn(async move { running.waiting().await });

        tokio::select! {
            () = shutdown_signal => {
                cancel_token.cancel();
                let _ = join_handle.await;
            }
            res = &mut join_handle => {
                match res {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => return Err(anyhow::anyhow!(e)),
                    Err(e) => return Err(anyhow::anyhow!(e)),
                }
            }
        }

        Ok(())
    }

    async fn banner(&self, service: &DcmsMcpService, transport_label: &str, transport_value: &str) -> Option<String> {
        if !self.banner {
            return None;
        }

        let logo_max_length = LOGO.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let min_term_width = logo_max_length + 4;
        let term_width = terminal_size().map(|(w, _)| w.0).unwrap_or_default() as usize;
        if term_width < min_term_width {
            return None;
        }

        let namespaces: Vec<String> = service
            .resource_schema()
            .get()
            .await
            .ok()
            .map(|schema| schema.entities().iter().map(|e| e.namespace.clone()).collect())
            .unwrap_or_default();

        let mut builder = Builder::default();
        builder.push_record(["Server Name", service.name()]);
        builder.push_record(["Server Version", service.version()]);
        builder.push_record([transport_label, transport_value]);
        builder.push_record(["Resources", &namespaces.len().to_string()]);
        builder.push_record(["Docs", &fmt_dimmed("https://www.datocms.com/docs/content-management-api")]);

        if !namespaces.is_empty() {
            builder.push_record(["", ""]);
            builder.push_record(["Namespaces", &fmt_cyan(&namespaces[0])]);
            for ns in &namespaces[1..] {
                builder.push_record(["", &fmt_cyan(ns)]);
            }
        }

        let table_width = term_width.min(80);
        let info_table = builder
            .build()
            .with(Style::empty())
            .modify(Columns::first(), Color::BOLD)
            .modify(Cell::new(2, 1), Color::FG_CYAN)
            .modify(Columns::first(), MinWidth::new(20))
            .modify(Columns::new(..2), Width::wrap((term_width - 6) / 2))
            .to_string();

        let logo_panel = Panel::header(format!("\n{LOGO}\n\n"));
        let version_panel = Panel::header(format!("dcms-mcp v{}\n\n", service.version()));

        let style = Style::rounded().remove_horizontals().remove_vertical();
        let banner = Table::from_iter([[info_table]])
            .with(style)
            .with(version_panel)
            .with(logo_panel)
            .with(Alignment::center())
            .modify(Rows::single(0), Color::FG_BLUE)
            .modify(Rows::single(1), Color::FG_BLUE | Color::BOLD)
            .with((
                Width::wrap(table_width).priority(Priority::max(true)),
                Width::increase(table_width).priority(Priority::min(true)),
            ))
            .to_string();

        Some(format!("\n{banner}\n"))
    }

    async fn banner_http(&self, service: &DcmsMcpService) {
        let mcp_url = format!("http://{}:{}/mcp", self.host, self.port);
        if let Some(banner) = self.banner(service, "Server URL", &mcp_url).await {
            println!("{banner}");
        }
        info!("dcms-mcp listening at {mcp_url}...");
    }

    async fn banner_stdio(&self, service: &DcmsMcpService) {
        if let Some(banner) = self.banner(service, "Transport", "stdio").await {
            eprintln!("{banner}");
        }
        info!("dcms-mcp listening via stdio...");
    }
}
