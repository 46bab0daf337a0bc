//! Configuration loading: flags > project config > global config > defaults
//! (§6.3).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROJECT_CONFIG_FILENAME: &str = ".otlp-mcp.json";
pub const GLOBAL_CONFIG_DIRNAME: &str = "otlp-mcp";
pub const GLOBAL_CONFIG_FILENAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk configuration. `deny_unknown_fields` so a typo'd key is a hard
/// error rather than a silently ignored one; the single exception is
/// `comment`, reserved for operators annotating their config files, which
/// every layer accepts and ignores.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Reserved, always ignored. Lets operators annotate config files
    /// in-place without fighting `deny_unknown_fields`.
    pub comment: Option<String>,

    /// Host/IP every OTLP listener binds to.
    pub bind_host: String,
    /// Initial set of OTLP/gRPC listener ports, bound at startup.
    pub otlp_ports: Vec<u16>,

    /// MCP transport: `"stdio"` or `"http"`.
    pub mcp_transport: String,
    /// Bind port for the MCP HTTP/SSE transport (ignored for stdio).
    pub mcp_http_port: u16,

    /// Per-signal ring buffer capacity.
    pub buffer_capacity: usize,
    /// Attribute count cap applied to every returned summary.
    pub max_attributes_per_summary: usize,

    /// Enable debug-level logging.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            comment: None,
            bind_host: "127.0.0.1".to_string(),
            otlp_ports: vec![4317],
            mcp_transport: "stdio".to_string(),
            mcp_http_port: 4318,
            buffer_capacity: otlp_mcp_storage::DEFAULT_CAPACITY,
            max_attributes_per_summary: otlp_mcp_storage::DEFAULT_ATTRIBUTE_CAP,
            verbose: false,
        }
    }
}

impl Config {
    fn load_file(path: &Path) -> Result<Option<Config>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIRNAME).join(GLOBAL_CONFIG_FILENAME))
    }

    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_CONFIG_FILENAME)
    }

    /// Resolve the effective configuration: defaults, overridden by the
    /// global config file (if present), overridden by the project config
    /// file (if present), overridden finally by `overrides`.
    pub fn resolve(project_dir: &Path, overrides: ConfigOverrides) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::load_file(&global_path)? {
                config = global;
            }
        }

        let project_path = Self::project_config_path(project_dir);
        if let Some(project) = Self::load_file(&project_path)? {
            config = project;
        }

        overrides.apply(&mut config);
        Ok(config)
    }
}

/// CLI-flag-sourced overrides, applied last so flags always win (§6.3
/// precedence: "flags > project > global > defaults").
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_host: Option<String>,
    pub otlp_ports: Option<Vec<u16>>,
    pub mcp_transport: Option<String>,
    pub mcp_http_port: Option<u16>,
    pub verbose: Option<bool>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(bind_host) = self.bind_host {
            config.bind_host = bind_host;
        }
        if let Some(otlp_ports) = self.otlp_ports {
            config.otlp_ports = otlp_ports;
        }
        if let Some(mcp_transport) = self.mcp_transport {
            config.mcp_transport = mcp_transport;
        }
        if let Some(mcp_http_port) = self.mcp_http_port {
            config.mcp_http_port = mcp_http_port;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
    }
}
