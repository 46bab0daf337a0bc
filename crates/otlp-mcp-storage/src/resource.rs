//! Resource-level helpers shared by the three signal ingestion paths.

use opentelemetry_proto::tonic::resource::v1::Resource;

use crate::attrs::find_attribute_string;

/// Default service name used when a resource carries none (§3).
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Extract `service.name` from a resource's attributes, defaulting to
/// [`UNKNOWN_SERVICE`] when the resource is absent or the attribute is
/// missing.
pub fn service_name_of(resource: Option<&Resource>) -> String {
    resource
        .and_then(|r| find_attribute_string(&r.attributes, "service.name"))
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, KeyValue};

    #[test]
    fn absent_resource_falls_back_to_unknown() {
        assert_eq!(service_name_of(None), UNKNOWN_SERVICE);
    }

    #[test]
    fn reads_service_name_attribute() {
        let resource = Resource {
            attributes: vec![KeyValue {
                key: "service.name".into(),
                value: Some(AnyValue {
                    value: Some(Value::StringValue("checkout".into())),
                }),
            }],
            dropped_attributes_count: 0,
            entity_refs: vec![],
        };
        assert_eq!(service_name_of(Some(&resource)), "checkout");
    }
}
