//! Config validation
//!
//! Rules:
//! - derive-level checks on `DemuxBlueprint` (non-empty names, non-empty kinds)
//! - sink names unique
//! - no kind listed twice for one sink
//! - network sinks carry a parseable `addr` and a known `format`
//! - memory sink `capacity`, when given, is an integer

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, DemuxBlueprint, SinkConfig, SinkType};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a DemuxBlueprint
///
/// Returns the first error found, or Ok(()).
pub fn validate(blueprint: &DemuxBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(first_violation)?;
    validate_sink_names(blueprint)?;
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        validate_sink_kinds(idx, sink)?;
        validate_sink_params(idx, sink)?;
    }
    Ok(())
}

/// Flatten derive errors and keep the first by path
fn first_violation(errors: ValidationErrors) -> ContractError {
    let mut flat = Vec::new();
    flatten(&errors, String::new(), &mut flat);
    flat.sort();

    match flat.into_iter().next() {
        Some((field, message)) => ContractError::config_validation(field, message),
        None => ContractError::config_validation("<root>", errors.to_string()),
    }
}

fn flatten(errors: &ValidationErrors, prefix: String, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push((path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten(inner, format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

fn validate_sink_names(blueprint: &DemuxBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &blueprint.sinks {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_sink_kinds(idx: usize, sink: &SinkConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for kind in &sink.kinds {
        if !seen.insert(*kind) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].kinds"),
                format!("duplicate kind '{kind}' for sink '{}'", sink.name),
            ));
        }
    }
    Ok(())
}

fn validate_sink_params(idx: usize, sink: &SinkConfig) -> Result<(), ContractError> {
    match sink.sink_type {
        SinkType::Network => {
            let addr = sink.params.get("addr").ok_or_else(|| {
                ContractError::config_validation(
                    format!("sinks[{idx}].params.addr"),
                    "network sink requires 'addr'",
                )
            })?;
            addr.parse::<SocketAddr>().map_err(|e| {
                ContractError::config_validation(
                    format!("sinks[{idx}].params.addr"),
                    format!("invalid address '{addr}': {e}"),
                )
            })?;
            if let Some(format) = sink.params.get("format") {
                if !matches!(format.as_str(), "json" | "bincode") {
                    return Err(ContractError::config_validation(
                        format!("sinks[{idx}].params.format"),
                        format!("unknown format '{format}', expected json or bincode"),
                    ));
                }
            }
        }
        SinkType::Memory => {
            if let Some(capacity) = sink.params.get("capacity") {
                capacity.parse::<usize>().map_err(|e| {
                    ContractError::config_validation(
                        format!("sinks[{idx}].params.capacity"),
                        format!("invalid capacity '{capacity}': {e}"),
                    )
                })?;
            }
        }
        SinkType::Log | SinkType::File => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RecordKind;
    use std::collections::HashMap;

    fn sink(name: &str, sink_type: SinkType) -> SinkConfig {
        SinkConfig {
            name: name.into(),
            sink_type,
            kinds: RecordKind::ALL.to_vec(),
            params: HashMap::new(),
        }
    }

    fn minimal_blueprint() -> DemuxBlueprint {
        DemuxBlueprint {
            sinks: vec![sink("log", SinkType::Log), sink("mem", SinkType::Memory)],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_no_sinks_is_valid() {
        assert!(validate(&DemuxBlueprint::default()).is_ok());
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(sink("log", SinkType::File));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate sink name"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[1].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
        assert!(err.contains("sinks[1].name"), "got: {err}");
    }

    #[test]
    fn test_empty_kinds() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].kinds.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one record kind"), "got: {err}");
    }

    #[test]
    fn test_duplicate_kind() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].kinds = vec![RecordKind::Spans, RecordKind::Spans];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate kind 'spans'"), "got: {err}");
    }

    #[test]
    fn test_network_requires_addr() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(sink("net", SinkType::Network));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("requires 'addr'"), "got: {err}");

        bp.sinks[2]
            .params
            .insert("addr".into(), "not-an-address".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("invalid address"), "got: {err}");

        bp.sinks[2]
            .params
            .insert("addr".into(), "127.0.0.1:9411".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_memory_capacity_must_parse() {
        let mut bp = minimal_blueprint();
        bp.sinks[1]
            .params
            .insert("capacity".into(), "lots".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("invalid capacity"), "got: {err}");
    }
}
