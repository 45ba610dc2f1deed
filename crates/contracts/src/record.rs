//! Telemetry records - producer output
//!
//! The three record kinds fanned out by the demultiplexer: metric points,
//! discrete events and trace spans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Dimension map (`key -> value`) attached to points and events
pub type Dimensions = HashMap<String, String>;

/// Record kind, one sink list per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Metric datapoints
    Points,
    /// Discrete events
    Events,
    /// Trace spans
    Spans,
}

impl RecordKind {
    /// All kinds in canonical order
    pub const ALL: [RecordKind; 3] = [RecordKind::Points, RecordKind::Events, RecordKind::Spans];

    /// Lowercase label used in logs, metrics and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Events => "events",
            Self::Spans => "spans",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== Datapoints =====

/// Metric datapoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Metric name
    pub metric: String,

    /// Dimensions identifying the time series
    #[serde(default)]
    pub dimensions: Dimensions,

    /// Observed value
    pub value: Value,

    /// Metric type
    #[serde(default)]
    pub metric_type: MetricType,

    /// Observation time
    pub timestamp: DateTime<Utc>,
}

impl Datapoint {
    /// Create a gauge datapoint stamped with the current time
    pub fn gauge(metric: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            metric: metric.into(),
            dimensions: Dimensions::new(),
            value: value.into(),
            metric_type: MetricType::Gauge,
            timestamp: Utc::now(),
        }
    }

    /// Create a counter datapoint stamped with the current time
    pub fn counter(metric: impl Into<String>, value: i64) -> Self {
        Self {
            metric_type: MetricType::Counter,
            ..Self::gauge(metric, value)
        }
    }

    /// Add a dimension
    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }
}

/// Datapoint value
///
/// Human-readable formats carry the bare scalar (`3`, `3.5`, `"up"`).
/// Binary formats carry the variant tag, since they cannot infer the type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    #[default]
    Gauge,
    Counter,
    CumulativeCounter,
    Enum,
    Timestamp,
}

// ===== Events =====

/// Discrete event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type (e.g. "deployment")
    pub event_type: String,

    /// Event category
    #[serde(default)]
    pub category: EventCategory,

    /// Dimensions
    #[serde(default)]
    pub dimensions: Dimensions,

    /// Free-form properties
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,

    /// Event time
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a user-defined event stamped with the current time
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            category: EventCategory::UserDefined,
            dimensions: Dimensions::new(),
            properties: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = category;
        self
    }

    /// Add a property
    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    #[default]
    UserDefined,
    Alert,
    Audit,
    Job,
    Collectd,
    ServiceDiscovery,
    Exception,
    Agent,
}

/// Event property value, encoded like [`Value`]
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

// ===== Spans =====

/// Trace span (Zipkin v2 shape)
///
/// Absent optional fields are written as `null` rather than skipped, so
/// positional formats see every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Hex trace id
    pub trace_id: String,

    /// Hex span id
    pub id: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: Option<SpanKind>,

    /// Start time, microseconds since epoch
    #[serde(default)]
    pub timestamp_us: Option<i64>,

    /// Duration in microseconds
    #[serde(default)]
    pub duration_us: Option<i64>,

    #[serde(default)]
    pub local_endpoint: Option<Endpoint>,

    #[serde(default)]
    pub remote_endpoint: Option<Endpoint>,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default)]
    pub shared: Option<bool>,
}

impl Span {
    /// Create a root span with the given ids
    pub fn new(trace_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            id: id.into(),
            parent_id: None,
            name: None,
            kind: None,
            timestamp_us: None,
            duration_us: None,
            local_endpoint: None,
            remote_endpoint: None,
            tags: HashMap::new(),
            annotations: Vec::new(),
            debug: None,
            shared: None,
        }
    }

    /// Set the operation name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the parent span id
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Span kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanKind {
    Client,
    Server,
    Producer,
    Consumer,
}

/// Network endpoint of a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Timestamped span annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Microseconds since epoch
    pub timestamp_us: i64,
    pub value: String,
}

// ===== Scalar encoding =====

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self, serializer.is_human_readable()) {
            (Self::Int(v), true) => serializer.serialize_i64(*v),
            (Self::Float(v), true) => serializer.serialize_f64(*v),
            (Self::Str(v), true) => serializer.serialize_str(v),
            (Self::Int(v), false) => serializer.serialize_newtype_variant("Value", 0, "Int", v),
            (Self::Float(v), false) => serializer.serialize_newtype_variant("Value", 1, "Float", v),
            (Self::Str(v), false) => serializer.serialize_newtype_variant("Value", 2, "Str", v),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged, rename = "Value")]
        enum Bare {
            Int(i64),
            Float(f64),
            Str(String),
        }

        // Variant order matches the indices written by `serialize`
        #[derive(Deserialize)]
        #[serde(rename = "Value")]
        enum Tagged {
            Int(i64),
            Float(f64),
            Str(String),
        }

        if deserializer.is_human_readable() {
            Ok(match Bare::deserialize(deserializer)? {
                Bare::Int(v) => Self::Int(v),
                Bare::Float(v) => Self::Float(v),
                Bare::Str(v) => Self::Str(v),
            })
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Int(v) => Self::Int(v),
                Tagged::Float(v) => Self::Float(v),
                Tagged::Str(v) => Self::Str(v),
            })
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const NAME: &str = "PropertyValue";
        match (self, serializer.is_human_readable()) {
            (Self::Bool(v), true) => serializer.serialize_bool(*v),
            (Self::Int(v), true) => serializer.serialize_i64(*v),
            (Self::Float(v), true) => serializer.serialize_f64(*v),
            (Self::Str(v), true) => serializer.serialize_str(v),
            (Self::Bool(v), false) => serializer.serialize_newtype_variant(NAME, 0, "Bool", v),
            (Self::Int(v), false) => serializer.serialize_newtype_variant(NAME, 1, "Int", v),
            (Self::Float(v), false) => serializer.serialize_newtype_variant(NAME, 2, "Float", v),
            (Self::Str(v), false) => serializer.serialize_newtype_variant(NAME, 3, "Str", v),
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged, rename = "PropertyValue")]
        enum Bare {
            Bool(bool),
            Int(i64),
            Float(f64),
            Str(String),
        }

        #[derive(Deserialize)]
        #[serde(rename = "PropertyValue")]
        enum Tagged {
            Bool(bool),
            Int(i64),
            Float(f64),
            Str(String),
        }

        if deserializer.is_human_readable() {
            Ok(match Bare::deserialize(deserializer)? {
                Bare::Bool(v) => Self::Bool(v),
                Bare::Int(v) => Self::Int(v),
                Bare::Float(v) => Self::Float(v),
                Bare::Str(v) => Self::Str(v),
            })
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Bool(v) => Self::Bool(v),
                Tagged::Int(v) => Self::Int(v),
                Tagged::Float(v) => Self::Float(v),
                Tagged::Str(v) => Self::Str(v),
            })
        }
    }
}

// ===== Tagged union =====

/// A record of any kind, tagged with `"type"` on the wire
///
/// Used by producers that read mixed streams (e.g. JSON lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Point(Datapoint),
    Event(Event),
    Span(Span),
}

impl TelemetryRecord {
    /// Kind of the wrapped record
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Point(_) => RecordKind::Points,
            Self::Event(_) => RecordKind::Events,
            Self::Span(_) => RecordKind::Spans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_labels() {
        let labels: Vec<_> = RecordKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["points", "events", "spans"]);
    }

    #[test]
    fn test_value_untagged_parsing() {
        let int: Value = serde_json::from_str("3").unwrap();
        let float: Value = serde_json::from_str("3.5").unwrap();
        let text: Value = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(int, Value::Int(3));
        assert_eq!(float, Value::Float(3.5));
        assert_eq!(text, Value::Str("up".into()));
    }

    #[test]
    fn test_property_value_bare_in_json() {
        let event = Event::new("deploy")
            .with_property("ok", PropertyValue::Bool(true))
            .with_property("build", PropertyValue::Int(42));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["properties"]["ok"], true);
        assert_eq!(json["properties"]["build"], 42);

        let point: serde_json::Value =
            serde_json::to_value(Datapoint::gauge("cpu", 1.5)).unwrap();
        assert_eq!(point["value"], 1.5);
    }

    #[test]
    fn test_span_writes_absent_fields_as_null() {
        let json = serde_json::to_value(Span::new("t", "1")).unwrap();
        assert!(json["parent_id"].is_null());
        assert!(json.as_object().unwrap().contains_key("parent_id"));

        let back: Span = serde_json::from_value(json).unwrap();
        assert_eq!(back, Span::new("t", "1"));
    }

    #[test]
    fn test_bincode_round_trip() {
        let span = Span::new("t", "1");
        let decoded: Span = bincode::deserialize(&bincode::serialize(&span).unwrap()).unwrap();
        assert_eq!(decoded, span);

        let full = Span::new("t", "2").with_parent("1").with_name("GET /");
        let decoded: Span = bincode::deserialize(&bincode::serialize(&full).unwrap()).unwrap();
        assert_eq!(decoded, full);

        for value in [Value::Int(3), Value::Float(1.5), Value::from("up")] {
            let point = Datapoint::gauge("cpu", value).with_dimension("host", "a");
            let bytes = bincode::serialize(&point).unwrap();
            let decoded: Datapoint = bincode::deserialize(&bytes).unwrap();
            assert_eq!(decoded, point);
        }

        let event = Event::new("deploy")
            .with_category(EventCategory::Audit)
            .with_property("ok", PropertyValue::Bool(false))
            .with_property("ratio", PropertyValue::Float(0.25))
            .with_property("by", PropertyValue::Str("ci".into()));
        let decoded: Event = bincode::deserialize(&bincode::serialize(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_tagged_record_parsing() {
        let line = r#"{"type":"span","trace_id":"abc","id":"01","name":"GET /"}"#;
        let record: TelemetryRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.kind(), RecordKind::Spans);
        match record {
            TelemetryRecord::Span(span) => {
                assert_eq!(span.name.as_deref(), Some("GET /"));
                assert!(span.tags.is_empty());
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn test_point_defaults() {
        let line = r#"{"type":"point","metric":"cpu.util","value":0.5,"timestamp":"2024-01-01T00:00:00Z"}"#;
        let record: TelemetryRecord = serde_json::from_str(line).unwrap();
        let TelemetryRecord::Point(point) = record else {
            panic!("expected a point");
        };
        assert_eq!(point.metric_type, MetricType::Gauge);
        assert!(point.dimensions.is_empty());
    }

    #[test]
    fn test_counter_builder() {
        let point = Datapoint::counter("requests", 7).with_dimension("host", "a");
        assert_eq!(point.metric_type, MetricType::Counter);
        assert_eq!(point.value, Value::Int(7));
        assert_eq!(point.dimensions.get("host").map(String::as_str), Some("a"));
    }
}
