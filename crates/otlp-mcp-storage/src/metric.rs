//! The metric signal's stored entry type and its OTLP ingestion path (§3).
//!
//! Open Question (b) is resolved per-data-point: each OTLP number/histogram
//! data point becomes its own [`MetricPoint`], never aggregated across the
//! metric's full time series at ingestion time. Aggregation, if ever needed,
//! is a query-time concern.

use opentelemetry_proto::tonic::metrics::v1::{metric::Data, number_data_point, ResourceMetrics};
use serde::Serialize;
use serde_json::Map;

use crate::attrs::attributes_to_json;
use crate::resource::service_name_of;

/// The OTLP metric shape this point was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Gauge,
    Sum,
    Histogram,
    ExponentialHistogram,
    Summary,
    Unknown,
}

/// The point's numeric payload, tagged by [`MetricType`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    Number { value: f64 },
    Histogram { count: u64, sum: Option<f64> },
    Summary { count: u64, sum: f64 },
}

/// One ingested metric data point.
#[derive(Debug, Clone)]
pub struct MetricPoint {
    pub metric_name: String,
    pub metric_type: MetricType,
    pub service_name: String,
    pub unit: String,
    pub time_unix_nano: u64,
    pub value: MetricValue,
    pub attributes: Map<String, serde_json::Value>,
}

fn number_value(point: &opentelemetry_proto::tonic::metrics::v1::NumberDataPoint) -> f64 {
    match point.value {
        Some(number_data_point::Value::AsDouble(d)) => d,
        Some(number_data_point::Value::AsInt(i)) => i as f64,
        None => 0.0,
    }
}

/// Walk `ResourceMetrics -> ScopeMetrics -> Metric[] -> DataPoint[]`,
/// yielding one [`MetricPoint`] per OTLP data point.
pub fn flatten_resource_metrics(resource_metrics: &[ResourceMetrics]) -> Vec<MetricPoint> {
    let mut out = Vec::new();
    for rm in resource_metrics {
        let service_name = service_name_of(rm.resource.as_ref());
        for scope_metrics in &rm.scope_metrics {
            for metric in &scope_metrics.metrics {
                let Some(data) = &metric.data else { continue };
                match data {
                    Data::Gauge(g) => {
                        for p in &g.data_points {
                            out.push(MetricPoint {
                                metric_name: metric.name.clone(),
                                metric_type: MetricType::Gauge,
                                service_name: service_name.clone(),
                                unit: metric.unit.clone(),
                                time_unix_nano: p.time_unix_nano,
                                value: MetricValue::Number {
                                    value: number_value(p),
                                },
                                attributes: attributes_to_json(&p.attributes),
                            });
                        }
                    }
                    Data::Sum(s) => {
                        for p in &s.data_points {
                            out.push(MetricPoint {
                                metric_name: metric.name.clone(),
                                metric_type: MetricType::Sum,
                                service_name: service_name.clone(),
                                unit: metric.unit.clone(),
                                time_unix_nano: p.time_unix_nano,
                                value: MetricValue::Number {
                                    value: number_value(p),
                                },
                                attributes: attributes_to_json(&p.attributes),
                            });
                        }
                    }
                    Data::Histogram(h) => {
                        for p in &h.data_points {
                            out.push(MetricPoint {
                                metric_name: metric.name.clone(),
                                metric_type: MetricType::Histogram,
                                service_name: service_name.clone(),
                                unit: metric.unit.clone(),
                                time_unix_nano: p.time_unix_nano,
                                value: MetricValue::Histogram {
                                    count: p.count,
                                    sum: p.sum,
                                },
                                attributes: attributes_to_json(&p.attributes),
                            });
                        }
                    }
                    Data::ExponentialHistogram(h) => {
                        for p in &h.data_points {
                            out.push(MetricPoint {
                                metric_name: metric.name.clone(),
                                metric_type: MetricType::ExponentialHistogram,
                                service_name: service_name.clone(),
                                unit: metric.unit.clone(),
                                time_unix_nano: p.time_unix_nano,
                                value: MetricValue::Histogram {
                                    count: p.count,
                                    sum: p.sum,
                                },
                                attributes: attributes_to_json(&p.attributes),
                            });
                        }
                    }
                    Data::Summary(s) => {
                        for p in &s.data_points {
                            out.push(MetricPoint {
                                metric_name: metric.name.clone(),
                                metric_type: MetricType::Summary,
                                service_name: service_name.clone(),
                                unit: metric.unit.clone(),
                                time_unix_nano: p.time_unix_nano,
                                value: MetricValue::Summary {
                                    count: p.count,
                                    sum: p.sum,
                                },
                                attributes: attributes_to_json(&p.attributes),
                            });
                        }
                    }
                }
            }
        }
    }
    out
}

/// MCP-facing projection of a [`MetricPoint`] (§3/§6.1). `value`/`count`/`sum`
/// are flat optionals rather than a tagged enum so the wire shape matches the
/// documented external contract directly: a gauge/sum point carries `value`,
/// a histogram/summary point carries `count` and `sum`. `data_point_count` is
/// always `1` given this store's per-data-point granularity (Open Question (b)).
#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub metric_name: String,
    pub metric_type: MetricType,
    pub service_name: String,
    pub unit: String,
    pub timestamp_unix_nano: u64,
    pub value: Option<f64>,
    pub count: Option<u64>,
    pub sum: Option<f64>,
    pub data_point_count: u64,
    pub attributes: Map<String, serde_json::Value>,
}

impl MetricSummary {
    pub fn from_point(point: &MetricPoint, attribute_cap: usize) -> Self {
        let (value, count, sum) = match &point.value {
            MetricValue::Number { value } => (Some(*value), None, None),
            MetricValue::Histogram { count, sum } => (None, Some(*count), *sum),
            MetricValue::Summary { count, sum } => (None, Some(*count), Some(*sum)),
        };
        Self {
            metric_name: point.metric_name.clone(),
            metric_type: point.metric_type,
            service_name: point.service_name.clone(),
            unit: point.unit.clone(),
            timestamp_unix_nano: point.time_unix_nano,
            value,
            count,
            sum,
            data_point_count: 1,
            attributes: point
                .attributes
                .iter()
                .take(attribute_cap)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::metrics::v1::{
        number_data_point::Value as NdpValue, Gauge, Metric, NumberDataPoint, ResourceMetrics,
        ScopeMetrics, Sum,
    };
    use opentelemetry_proto::tonic::resource::v1::Resource;

    fn resource_with_gauge() -> ResourceMetrics {
        ResourceMetrics {
            resource: Some(Resource {
                attributes: vec![],
                dropped_attributes_count: 0,
                entity_refs: vec![],
            }),
            scope_metrics: vec![ScopeMetrics {
                scope: None,
                metrics: vec![Metric {
                    name: "queue.depth".into(),
                    description: String::new(),
                    unit: "items".into(),
                    metadata: vec![],
                    data: Some(Data::Gauge(Gauge {
                        data_points: vec![NumberDataPoint {
                            attributes: vec![],
                            start_time_unix_nano: 0,
                            time_unix_nano: 7,
                            exemplars: vec![],
                            flags: 0,
                            value: Some(NdpValue::AsDouble(3.5)),
                        }],
                    })),
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }
    }

    #[test]
    fn flattens_gauge_points() {
        let points = flatten_resource_metrics(&[resource_with_gauge()]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].metric_name, "queue.depth");
        assert_eq!(points[0].metric_type, MetricType::Gauge);
        match points[0].value {
            MetricValue::Number { value } => assert_eq!(value, 3.5),
            _ => panic!("expected number value"),
        }
    }

    #[test]
    fn sum_points_carry_unit_and_service() {
        let mut rm = resource_with_gauge();
        rm.scope_metrics[0].metrics[0].data = Some(Data::Sum(Sum {
            data_points: vec![NumberDataPoint {
                attributes: vec![],
                start_time_unix_nano: 0,
                time_unix_nano: 9,
                exemplars: vec![],
                flags: 0,
                value: Some(NdpValue::AsInt(42)),
            }],
            aggregation_temporality: 0,
            is_monotonic: true,
        }));
        let points = flatten_resource_metrics(&[rm]);
        assert_eq!(points[0].metric_type, MetricType::Sum);
        assert_eq!(points[0].unit, "items");
    }

    #[test]
    fn summary_flattens_number_value_and_counts_one_data_point() {
        let points = flatten_resource_metrics(&[resource_with_gauge()]);
        let summary = MetricSummary::from_point(&points[0], 20);
        assert_eq!(summary.value, Some(3.5));
        assert_eq!(summary.count, None);
        assert_eq!(summary.sum, None);
        assert_eq!(summary.data_point_count, 1);
        assert_eq!(summary.timestamp_unix_nano, 7);
    }

    #[test]
    fn summary_flattens_histogram_into_count_and_sum() {
        let point = MetricPoint {
            metric_name: "latency".into(),
            metric_type: MetricType::Histogram,
            service_name: "svc".into(),
            unit: "ms".into(),
            time_unix_nano: 1,
            value: MetricValue::Histogram {
                count: 4,
                sum: Some(12.0),
            },
            attributes: Map::new(),
        };
        let summary = MetricSummary::from_point(&point, 20);
        assert_eq!(summary.value, None);
        assert_eq!(summary.count, Some(4));
        assert_eq!(summary.sum, Some(12.0));
    }
}
