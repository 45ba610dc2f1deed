//! Resolved routing: which sinks receive each record kind

use contracts::{DemuxBlueprint, RecordKind};

/// Sink names per record kind, in invocation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routing {
    points: Vec<String>,
    events: Vec<String>,
    spans: Vec<String>,
}

impl Routing {
    /// Resolve the per-kind lists of a blueprint
    ///
    /// A sink joins every list named in its `kinds`, in config order.
    pub fn resolve(blueprint: &DemuxBlueprint) -> Self {
        let names = |kind| {
            blueprint
                .sinks_for(kind)
                .map(|s| s.name.clone())
                .collect::<Vec<_>>()
        };

        Self {
            points: names(RecordKind::Points),
            events: names(RecordKind::Events),
            spans: names(RecordKind::Spans),
        }
    }

    /// Sinks receiving `kind`
    pub fn sinks(&self, kind: RecordKind) -> &[String] {
        match kind {
            RecordKind::Points => &self.points,
            RecordKind::Events => &self.events,
            RecordKind::Spans => &self.spans,
        }
    }

    /// Kinds no sink receives; their batches are accepted and discarded
    pub fn unrouted(&self) -> Vec<RecordKind> {
        RecordKind::ALL
            .into_iter()
            .filter(|kind| self.sinks(*kind).is_empty())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordKind, &[String])> + '_ {
        RecordKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.sinks(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_resolve_keeps_config_order() {
        let content = r#"
[[sinks]]
name = "archive"
sink_type = "memory"
kinds = ["spans", "points"]

[[sinks]]
name = "console"
sink_type = "log"
kinds = ["points"]

[[sinks]]
name = "tracer"
sink_type = "log"
kinds = ["spans"]
"#;
        let blueprint = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let routing = ConfigLoader::routing(&blueprint);

        assert_eq!(routing.sinks(RecordKind::Points), ["archive", "console"]);
        assert_eq!(routing.sinks(RecordKind::Spans), ["archive", "tracer"]);
        assert!(routing.sinks(RecordKind::Events).is_empty());
        assert_eq!(routing.unrouted(), vec![RecordKind::Events]);
    }

    #[test]
    fn test_default_kinds_route_everywhere() {
        let content = r#"{"sinks": [{"name": "all", "sink_type": "memory"}]}"#;
        let blueprint = ConfigLoader::load_from_str(content, ConfigFormat::Json).unwrap();
        let routing = Routing::resolve(&blueprint);

        assert!(routing.unrouted().is_empty());
        let lists: Vec<_> = routing.iter().map(|(kind, sinks)| (kind, sinks.len())).collect();
        assert_eq!(
            lists,
            vec![
                (RecordKind::Points, 1),
                (RecordKind::Events, 1),
                (RecordKind::Spans, 1)
            ]
        );
    }

    #[test]
    fn test_empty_blueprint_routes_nothing() {
        let routing = Routing::resolve(&DemuxBlueprint::default());
        assert_eq!(routing.unrouted(), RecordKind::ALL.to_vec());
        assert_eq!(routing, Routing::default());
    }
}
