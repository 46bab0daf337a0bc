//! Process bootstrap: parse the CLI, resolve configuration, bind the OTLP
//! ingress, and serve the MCP tool surface over the configured transport.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use otlp_mcp_cli::{Cli, Command, Config, ConfigOverrides, DoctorArgs, ServeArgs};
use otlp_mcp_ingress::Ingress;
use otlp_mcp_mcp::McpSession;
use otlp_mcp_storage::{ObservabilityStore, StoreConfig};
use rmcp::ServiceExt;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn overrides_from_serve_args(args: &ServeArgs) -> ConfigOverrides {
    ConfigOverrides {
        bind_host: args.bind_host.clone(),
        otlp_ports: if args.otlp_ports.is_empty() {
            None
        } else {
            Some(args.otlp_ports.clone())
        },
        mcp_transport: args.transport.clone(),
        mcp_http_port: args.mcp_http_port,
        verbose: Some(args.verbose),
    }
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    init_logging(args.verbose);
    let project_dir = std::env::current_dir()?;
    let overrides = overrides_from_serve_args(&args);
    let config = Config::resolve(&project_dir, overrides)?;

    let store = ObservabilityStore::new(StoreConfig {
        trace_capacity: config.buffer_capacity,
        log_capacity: config.buffer_capacity,
        metric_capacity: config.buffer_capacity,
        max_attributes_per_summary: config.max_attributes_per_summary,
    });

    let mut file_sources = Vec::new();
    if let Some(replay_path) = &args.replay {
        let (ingested, skipped) = otlp_mcp_fileplay::replay_file(&store, replay_path).await?;
        tracing::info!(ingested, skipped, "replayed fileplay recording");
        file_sources.push(replay_path.display().to_string());
    }

    let addrs: Vec<SocketAddr> = config
        .otlp_ports
        .iter()
        .map(|port| format!("{}:{port}", config.bind_host).parse())
        .collect::<Result<_, _>>()?;
    let ingress = Ingress::bind(store.clone(), &addrs).await?;
    tracing::info!(endpoints = ?ingress.endpoints().await, "OTLP ingress listening");

    let shutdown = tokio_util::sync::CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let session = McpSession::new(store, ingress.clone()).with_file_sources(file_sources);
    match config.mcp_transport.as_str() {
        "http" => serve_http(session, config.mcp_http_port, shutdown).await?,
        _ => serve_stdio(session, shutdown).await?,
    }

    ingress.stop().await;
    Ok(())
}

async fn serve_stdio(
    session: McpSession,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    let service = session.serve(rmcp::transport::stdio()).await?;
    tokio::select! {
        result = service.waiting() => { result?; }
        _ = shutdown.cancelled() => {
            tracing::info!("shutdown requested, closing MCP stdio transport");
        }
    }
    Ok(())
}

async fn serve_http(
    session: McpSession,
    port: u16,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    use rmcp::transport::sse_server::SseServer;

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let (sse_server, router) = SseServer::new(Default::default());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let cancellation = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move { cancellation.cancelled().await })
            .await;
    });
    let ct = sse_server.with_service(move || session.clone());
    tracing::info!(%addr, "MCP HTTP/SSE transport listening");
    shutdown.cancelled().await;
    ct.cancel();
    let _ = server_handle.await;
    Ok(())
}

fn spawn_signal_handler(shutdown: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("received shutdown signal");
        shutdown.cancel();
    });
}

fn run_doctor(args: DoctorArgs) -> anyhow::Result<()> {
    init_logging(args.verbose);
    let project_dir = std::env::current_dir()?;
    let overrides = ConfigOverrides {
        verbose: Some(args.verbose),
        ..Default::default()
    };
    let config = Config::resolve(&project_dir, overrides)?;
    let report = otlp_mcp_cli::doctor::run(config);
    print!("{}", report.render());
    if !report.primary_bind_ok {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(std::env::args());
    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => run_serve(args).await,
        Command::Doctor(args) => run_doctor(args),
    }
}
