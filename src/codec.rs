//! Translation between the resource handle and the SLO document
//!
//! `decode` validates the configuration against the schema, projects it into
//! a typed `Slo` and then runs the cross-field pass over the typed record.
//! `encode` writes a server document back into the handle, scalars first and
//! the nested `compliance` and `indicator` blocks last.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde_json::{Map, Value, json};
use tracing::{debug, trace};

use crate::error::{SloError, SloResult, ValidationError, ViolationKind};
use crate::model::{
    Compliance, ComplianceType, EvaluationType, Indicator, Query, QueryGroup, QueryGroupType,
    SLO_CONTENT_TYPE, Slo, SloKind,
};
use crate::resource::ResourceState;
use crate::schema::SLO_SCHEMA;

/// Decode the handle's configuration into an SLO tagged with `kind`.
///
/// Schema violations and cross-field violations are reported together
/// whenever the configuration can still be projected into a record.
pub fn decode<S>(state: &S, kind: SloKind) -> SloResult<Slo>
where
    S: ResourceState + ?Sized,
{
    let mut values = state.values().clone();
    SLO_SCHEMA.apply_defaults(&mut values);

    let mut errors = SLO_SCHEMA.validate(&values);

    if values.get("post_request_map").is_some_and(|v| !v.is_null()) {
        debug!("post_request_map is set but not sent to the server");
    }

    let slo = match project(state.id(), &values, kind) {
        Ok(slo) => slo,
        // the schema pass already explains why projection failed
        Err(_) if !errors.is_empty() => return Err(SloError::Validation(errors)),
        Err(e) => return Err(e),
    };

    errors.extend(check_relations(&slo));
    if !errors.is_empty() {
        return Err(SloError::Validation(errors));
    }

    trace!(name = %slo.name, ?kind, "decoded configuration");
    Ok(slo)
}

fn project(id: &str, values: &Map<String, Value>, kind: SloKind) -> SloResult<Slo> {
    Ok(Slo {
        id: id.to_string(),
        name: string(values, "name"),
        description: string(values, "description"),
        version: values.get("version").and_then(Value::as_i64).unwrap_or_default(),
        created_at: string(values, "created_at"),
        created_by: string(values, "created_by"),
        modified_at: string(values, "modified_at"),
        modified_by: string(values, "modified_by"),
        parent_id: string(values, "parent_id"),
        content_type: SLO_CONTENT_TYPE.to_string(),
        kind,
        is_system: boolean(values, "is_system"),
        is_mutable: boolean(values, "is_mutable"),
        is_locked: boolean(values, "is_locked"),
        signal_type: optional_enum(values, "signal_type", "signal_type")?,
        service: optional_string(values, "service"),
        application: optional_string(values, "application"),
        compliance: decode_compliance(block(values, "compliance"))?,
        indicator: decode_indicator(block(values, "indicator"))?,
    })
}

/// Write every server-managed and user-provided field of `slo` into the
/// handle. The id is left untouched.
pub fn encode<S>(slo: &Slo, state: &mut S) -> SloResult<()>
where
    S: ResourceState + ?Sized,
{
    write(state, "name", json!(slo.name))?;
    write(state, "description", json!(slo.description))?;
    write(state, "version", json!(slo.version))?;
    write(state, "created_at", json!(slo.created_at))?;
    write(state, "created_by", json!(slo.created_by))?;
    write(state, "modified_at", json!(slo.modified_at))?;
    write(state, "modified_by", json!(slo.modified_by))?;
    write(state, "parent_id", json!(slo.parent_id))?;
    write(state, "is_system", json!(slo.is_system))?;
    write(state, "is_mutable", json!(slo.is_mutable))?;
    write(state, "is_locked", json!(slo.is_locked))?;
    write(state, "service", json!(slo.service))?;
    write(state, "application", json!(slo.application))?;
    write(
        state,
        "signal_type",
        json!(slo.signal_type.map(|s| s.as_str())),
    )?;

    write(state, "compliance", encode_compliance(&slo.compliance))?;
    write(state, "indicator", encode_indicator(&slo.indicator))?;

    Ok(())
}

fn write<S>(state: &mut S, field: &str, value: Value) -> SloResult<()>
where
    S: ResourceState + ?Sized,
{
    state
        .set(field, value)
        .map_err(|reason| SloError::StateWriteFailed {
            field: field.to_string(),
            reason,
        })
}

fn encode_compliance(compliance: &Compliance) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), json!(compliance.compliance_type.as_str()));
    map.insert("target".into(), json!(compliance.target));
    if let Some(timezone) = &compliance.timezone {
        map.insert("timezone".into(), json!(timezone));
    }
    if let Some(size) = &compliance.size {
        map.insert("size".into(), json!(size));
    }
    Value::Object(map)
}

fn encode_indicator(indicator: &Indicator) -> Value {
    let queries: Vec<Value> = indicator
        .queries
        .iter()
        .map(|group| {
            let rows: Vec<Value> = group.query_group.iter().map(encode_query).collect();
            json!({
                "query_group_type": group.query_group_type.as_str(),
                "query_group": rows,
            })
        })
        .collect();

    json!({
        "evaluation_type": indicator.evaluation_type.as_str(),
        "query_type": indicator.query_type.as_str(),
        "threshold": indicator.threshold,
        "op": indicator.op.as_str(),
        "aggregation": indicator.aggregation,
        "size": indicator.size,
        "queries": queries,
    })
}

fn encode_query(query: &Query) -> Value {
    let mut map = Map::new();
    map.insert("row_id".into(), json!(query.row_id));
    map.insert("query".into(), json!(query.query));
    map.insert("use_row_count".into(), json!(query.use_row_count));
    if let Some(field) = &query.field {
        map.insert("field".into(), json!(field));
    }
    Value::Object(map)
}

fn decode_compliance(map: &Map<String, Value>) -> SloResult<Compliance> {
    Ok(Compliance {
        compliance_type: required_enum(map, "type", "compliance.type")?,
        target: map.get("target").and_then(Value::as_i64).unwrap_or_default(),
        timezone: optional_string(map, "timezone"),
        size: optional_string(map, "size"),
    })
}

fn decode_indicator(map: &Map<String, Value>) -> SloResult<Indicator> {
    let mut queries = Vec::new();
    for (i, group) in list(map, "queries").iter().enumerate() {
        let path = format!("indicator.queries.{i}");
        queries.push(decode_query_group(group, &path)?);
    }

    Ok(Indicator {
        evaluation_type: required_enum(map, "evaluation_type", "indicator.evaluation_type")?,
        query_type: required_enum(map, "query_type", "indicator.query_type")?,
        threshold: map.get("threshold").and_then(Value::as_f64).unwrap_or_default(),
        op: required_enum(map, "op", "indicator.op")?,
        aggregation: string(map, "aggregation"),
        size: string(map, "size"),
        queries,
    })
}

fn decode_query_group(group: &Value, path: &str) -> SloResult<QueryGroup> {
    let empty = Map::new();
    let map = group.as_object().unwrap_or(&empty);

    let query_group = list(map, "query_group")
        .iter()
        .map(|row| {
            let row = row.as_object().unwrap_or(&empty);
            Query {
                row_id: string(row, "row_id"),
                query: string(row, "query"),
                use_row_count: boolean(row, "use_row_count"),
                field: optional_string(row, "field"),
            }
        })
        .collect();

    Ok(QueryGroup {
        query_group_type: required_enum(map, "query_group_type", &format!("{path}.query_group_type"))?,
        query_group,
    })
}

/// Cross-field rules that field-local validators cannot express.
pub fn check_relations(slo: &Slo) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let compliance = &slo.compliance;
    match compliance.compliance_type {
        ComplianceType::Rolling if compliance.size.is_none() => {
            errors.push(ValidationError::missing("compliance.size"));
        }
        ComplianceType::Calendar if compliance.timezone.is_none() => {
            errors.push(ValidationError::missing("compliance.timezone"));
        }
        _ => {}
    }

    let mut seen = HashSet::new();
    for (i, group) in slo.indicator.queries.iter().enumerate() {
        for (j, query) in group.query_group.iter().enumerate() {
            // a missing row_id is reported by the schema pass
            if query.row_id.is_empty() {
                continue;
            }
            if !seen.insert(query.row_id.as_str()) {
                errors.push(ValidationError::new(
                    format!("indicator.queries.{i}.query_group.{j}.row_id"),
                    ViolationKind::DuplicateRowId {
                        row_id: query.row_id.clone(),
                    },
                ));
            }
        }
    }

    if let Some(reason) = query_group_problem(&slo.indicator) {
        errors.push(ValidationError::new(
            "indicator.queries",
            ViolationKind::InvalidQueryGroups { reason },
        ));
    }

    errors
}

fn query_group_problem(indicator: &Indicator) -> Option<String> {
    let mut counts: HashMap<QueryGroupType, usize> = HashMap::new();
    for group in &indicator.queries {
        *counts.entry(group.query_group_type).or_default() += 1;
    }

    if let Some((kind, _)) = counts.iter().find(|(_, n)| **n > 1) {
        return Some(format!("query group type {kind} is used more than once"));
    }

    if indicator.evaluation_type == EvaluationType::Threshold
        && !counts.contains_key(&QueryGroupType::Threshold)
    {
        return Some("threshold evaluation needs exactly one Threshold query group".to_string());
    }

    None
}

fn string(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn boolean(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or_default()
}

fn block<'a>(map: &'a Map<String, Value>, key: &str) -> &'a Map<String, Value> {
    static EMPTY: std::sync::LazyLock<Map<String, Value>> = std::sync::LazyLock::new(Map::new);
    map.get(key).and_then(Value::as_object).unwrap_or(&EMPTY)
}

fn list<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn optional_enum<T>(map: &Map<String, Value>, key: &str, path: &str) -> SloResult<Option<T>>
where
    T: FromStr,
{
    match map.get(key).and_then(Value::as_str) {
        None => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| invalid_variant(path, text)),
    }
}

fn required_enum<T>(map: &Map<String, Value>, key: &str, path: &str) -> SloResult<T>
where
    T: FromStr,
{
    optional_enum(map, key, path)?.ok_or_else(|| ValidationError::missing(path).into())
}

fn invalid_variant(path: &str, text: &str) -> SloError {
    SloError::invalid(
        path,
        ViolationKind::InvalidEnum {
            value: text.to_string(),
            allowed: Vec::new(),
        },
    )
}
