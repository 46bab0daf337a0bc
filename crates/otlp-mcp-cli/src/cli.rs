//! `clap`-derived command line surface (§6.3).

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "otlp-mcp", about = "Local OTLP observability daemon with an MCP tool surface")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon: bind the OTLP ingress and serve the MCP tool surface.
    /// This is the default when no subcommand is given.
    Serve(ServeArgs),
    /// Validate configuration and report whether the primary OTLP address
    /// can be bound, without actually serving anything.
    Doctor(DoctorArgs),
}

#[derive(Debug, Parser, Default)]
pub struct ServeArgs {
    /// Host/IP every OTLP listener binds to.
    #[arg(long)]
    pub bind_host: Option<String>,

    /// OTLP/gRPC listener ports to bind at startup. Repeat the flag for
    /// multiple ports.
    #[arg(long = "otlp-port")]
    pub otlp_ports: Vec<u16>,

    /// MCP transport to serve.
    #[arg(long, value_parser = ["stdio", "http"])]
    pub transport: Option<String>,

    /// Bind port for the MCP HTTP/SSE transport (only used with
    /// `--transport http`).
    #[arg(long)]
    pub mcp_http_port: Option<u16>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Replay a JSONL telemetry recording into the store at startup, before
    /// serving begins.
    #[arg(long)]
    pub replay: Option<std::path::PathBuf>,
}

#[derive(Debug, Parser, Default)]
pub struct DoctorArgs {
    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}
