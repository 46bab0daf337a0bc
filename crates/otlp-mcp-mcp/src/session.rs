//! The MCP server: `Arc`-shared store and ingress, wired to the tool router
//! and resource surface (§4.8).

use std::sync::Arc;

use otlp_mcp_ingress::Ingress;
use otlp_mcp_storage::ObservabilityStore;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    Implementation, ListResourceTemplatesResult, ListResourcesResult, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ResourceTemplate, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{tool_handler, ErrorData as McpError, RoleServer, ServerHandler};

use crate::resources::{list_static_resources, read_resource, resource_templates};

/// Holds everything a tool call or resource read needs: the observability
/// store and the ingress, both already `Arc`-wrapped by their owners.
#[derive(Clone)]
pub struct McpSession {
    pub(crate) store: Arc<ObservabilityStore>,
    pub(crate) ingress: Arc<Ingress>,
    pub(crate) file_sources: Arc<Vec<String>>,
    tool_router: ToolRouter<McpSession>,
}

impl McpSession {
    pub fn new(store: Arc<ObservabilityStore>, ingress: Arc<Ingress>) -> Self {
        Self {
            store,
            ingress,
            file_sources: Arc::new(Vec::new()),
            tool_router: Self::tool_router(),
        }
    }

    /// Record the JSONL files replayed into the store at startup, surfaced
    /// read-only via `otlp://file-sources` (§4.8).
    pub fn with_file_sources(mut self, file_sources: Vec<String>) -> Self {
        self.file_sources = Arc::new(file_sources);
        self
    }
}

#[tool_handler]
impl ServerHandler for McpSession {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "otlp-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Query buffered OTLP traces, logs and metrics; manage OTLP ingress ports \
                 and named snapshots."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: list_static_resources(),
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = resource_templates()
            .into_iter()
            .map(|(uri_template, description)| ResourceTemplate {
                uri_template: uri_template.to_string(),
                name: uri_template.to_string(),
                description: Some(description.to_string()),
                mime_type: Some("application/json".to_string()),
            })
            .collect();
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let contents = read_resource(&self.store, &self.ingress, &self.file_sources, &request.uri)
            .await
            .ok_or_else(|| McpError::resource_not_found(request.uri.clone(), None))?;
        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}
