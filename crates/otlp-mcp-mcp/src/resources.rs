//! The five static resource URIs and two templated resources (§4.8), returned
//! as plain JSON bodies mirroring the corresponding tools, pretty-printed.

use std::sync::Arc;

use otlp_mcp_ingress::Ingress;
use otlp_mcp_storage::query::Filter;
use otlp_mcp_storage::store::QuerySignals;
use otlp_mcp_storage::ObservabilityStore;
use rmcp::model::{RawResource, Resource, ResourceContents};

const URI_ENDPOINT: &str = "otlp://endpoint";
const URI_STATS: &str = "otlp://stats";
const URI_SERVICES: &str = "otlp://services";
const URI_SNAPSHOTS: &str = "otlp://snapshots";
const URI_FILE_SOURCES: &str = "otlp://file-sources";

const TEMPLATE_SERVICE_SUMMARY: &str = "otlp://services/{service_name}";
const TEMPLATE_SNAPSHOT_BY_NAME: &str = "otlp://snapshots/{name}";

/// Static resource listing. Templated resources are advertised separately
/// via `list_resource_templates` in the MCP protocol, not enumerated here.
pub fn list_static_resources() -> Vec<Resource> {
    [
        (URI_ENDPOINT, "The primary OTLP/gRPC endpoint and its exporter environment variables"),
        (URI_STATS, "Buffer occupancy, distinct key counts and snapshot count"),
        (URI_SERVICES, "Every distinct service name seen across all three signals"),
        (URI_SNAPSHOTS, "All named snapshots, in creation order"),
        (URI_FILE_SOURCES, "The JSONL recordings, if any, replayed into the store at startup"),
    ]
    .into_iter()
    .map(|(uri, description)| {
        Resource::new(
            RawResource::new(uri, uri.trim_start_matches("otlp://").replace('/', " ")),
            Some(description.to_string()),
        )
    })
    .collect()
}

pub fn resource_templates() -> Vec<(&'static str, &'static str)> {
    vec![
        (TEMPLATE_SERVICE_SUMMARY, "Recent traces, logs and metrics for a single service"),
        (TEMPLATE_SNAPSHOT_BY_NAME, "A single named snapshot's position tuple"),
    ]
}

/// Read a resource URI, returning its JSON body. Templated URIs are matched
/// by prefix since `rmcp`'s static resource list doesn't expand templates
/// for us.
pub async fn read_resource(
    store: &Arc<ObservabilityStore>,
    ingress: &Arc<Ingress>,
    file_sources: &Arc<Vec<String>>,
    uri: &str,
) -> Option<ResourceContents> {
    let body = match uri {
        URI_ENDPOINT => {
            let addr = ingress.primary_endpoint().await.ok()?;
            serde_json::to_string_pretty(&format!("http://{addr}")).ok()?
        }
        URI_STATS => serde_json::to_string_pretty(&store.stats()).ok()?,
        URI_SERVICES => serde_json::to_string_pretty(&store.services()).ok()?,
        URI_SNAPSHOTS => {
            let snapshots = store.list_snapshots();
            serde_json::to_string_pretty(&snapshots).ok()?
        }
        URI_FILE_SOURCES => serde_json::to_string_pretty(file_sources.as_ref()).ok()?,
        other => return read_templated_resource(store, other).await,
    };
    Some(ResourceContents::text(body, uri))
}

async fn read_templated_resource(store: &Arc<ObservabilityStore>, uri: &str) -> Option<ResourceContents> {
    if let Some(service_name) = uri.strip_prefix("otlp://services/") {
        let filter = Filter {
            service_name: Some(service_name.to_string()),
            ..Default::default()
        };
        let result = store.query(&filter, QuerySignals::ALL);
        let body = serde_json::to_string_pretty(&result).ok()?;
        return Some(ResourceContents::text(body, uri));
    }
    if let Some(name) = uri.strip_prefix("otlp://snapshots/") {
        let snapshot = store.get_snapshot(name)?;
        let body = serde_json::to_string_pretty(&snapshot).ok()?;
        return Some(ResourceContents::text(body, uri));
    }
    None
}
