//! Field declarations of the SLO resource

use serde_json::json;

use super::{Field, Validator};
use crate::model::{
    ComplianceType, EvaluationType, Operator, QueryGroupType, QueryType, SignalType,
};

pub const AGGREGATION_PATTERN: &str = r"^(Avg|Min|Max|Sum|p[5-9][0-9](\.\d{1,3})?)$";

// TODO: the window is nominally bounded to 1m..1h; the pattern only checks the shape.
pub const WINDOW_PATTERN: &str = r"^[0-9]{1,2}(m|h)$";

pub const COMPLIANCE_SIZES: &[&str] = &[
    "1d", "2d", "3d", "4d", "5d", "6d", "7d", "8d", "9d", "10d", "11d", "12d", "13d", "14d",
];

fn query_fields() -> Vec<Field> {
    vec![
        Field::string("row_id").required(),
        Field::string("query").required(),
        Field::bool("use_row_count").default_value(json!(false)),
        Field::string("field"),
    ]
}

fn query_group_fields() -> Vec<Field> {
    vec![
        Field::string("query_group_type")
            .required()
            .validate_with(Validator::StringInSlice(QueryGroupType::ALL)),
        Field::list("query_group", query_fields())
            .required()
            .validate_with(Validator::Cardinality {
                min: 1,
                max: usize::MAX,
            }),
    ]
}

fn compliance_fields() -> Vec<Field> {
    vec![
        Field::string("type")
            .required()
            .validate_with(Validator::Enum(ComplianceType::ALL)),
        Field::int("target")
            .required()
            .validate_with(Validator::IntRange { min: 0, max: 100 }),
        Field::string("timezone").validate_with(Validator::IanaTimezone),
        Field::string("size").validate_with(Validator::StringInSlice(COMPLIANCE_SIZES)),
    ]
}

fn indicator_fields() -> Vec<Field> {
    vec![
        Field::string("evaluation_type")
            .required()
            .validate_with(Validator::Enum(EvaluationType::ALL)),
        Field::string("query_type")
            .required()
            .validate_with(Validator::StringInSlice(QueryType::ALL)),
        Field::float("threshold").required(),
        Field::string("op")
            .required()
            .validate_with(Validator::StringInSlice(Operator::ALL)),
        Field::string("aggregation")
            .required()
            .validate_with(Validator::pattern(AGGREGATION_PATTERN)),
        Field::string("size")
            .required()
            .validate_with(Validator::pattern(WINDOW_PATTERN)),
        Field::list("queries", query_group_fields())
            .required()
            .validate_with(Validator::Cardinality { min: 1, max: 2 }),
    ]
}

/// Top-level fields of the SLO resource
pub fn slo_fields() -> Vec<Field> {
    vec![
        Field::string("name").required(),
        Field::string("description").required(),
        Field::int("version").optional_computed(),
        Field::string("created_at").optional_computed(),
        Field::string("created_by").optional_computed(),
        Field::string("modified_at").optional_computed(),
        Field::string("modified_by").optional_computed(),
        Field::string("parent_id").optional_computed(),
        Field::bool("is_system").optional_computed(),
        Field::bool("is_mutable").optional_computed(),
        Field::bool("is_locked"),
        Field::string("service").optional_computed(),
        Field::string("application").optional_computed(),
        Field::string("signal_type").validate_with(Validator::Enum(SignalType::ALL)),
        Field::block("compliance", compliance_fields()).required(),
        Field::block("indicator", indicator_fields()).required(),
        Field::string_map("post_request_map"),
    ]
}
