//! SLO document model
//!
//! Typed records for the server-side document. Field names are snake_case in
//! Rust and camelCase on the wire. Enumerations are stored as tagged variants
//! and serialized verbatim to their canonical names; nothing is lowercased or
//! aliased.

use serde::{Deserialize, Serialize};

/// Literal stored in every SLO's `contentType`
pub const SLO_CONTENT_TYPE: &str = "slo";

/// Declares a wire enumeration whose variant names are its canonical strings.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Canonical names of every variant, in declaration order
            pub const ALL: &'static [&'static str] = &[$(stringify!($variant)),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == stringify!($variant) {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("invalid {}: {}", stringify!($name), s))
            }
        }
    };
}

wire_enum! {
    /// Document tag sent in the `type` field
    SloKind {
        /// Used when creating
        SlosLibrarySlo,
        /// Used when updating
        SlosLibrarySloUpdate,
    }
}

impl Default for SloKind {
    fn default() -> Self {
        SloKind::SlosLibrarySlo
    }
}

wire_enum! {
    SignalType { Latency, Error, Throughput, Availability, Other }
}

wire_enum! {
    /// How the compliance window is aligned
    ComplianceType { Rolling, Calendar }
}

wire_enum! {
    EvaluationType { Threshold, Range }
}

wire_enum! {
    QueryType { Logs, Metrics }
}

wire_enum! {
    /// Comparison applied between the aggregated value and the threshold
    Operator { LessThan, GreaterThan, LessThanOrEqual, GreaterThanOrEqual }
}

wire_enum! {
    /// Role of a query group within the indicator
    QueryGroupType { Successful, Unsuccessful, Total, Threshold }
}

/// A Service Level Objective as stored on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slo {
    /// Server-assigned; empty until created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub name: String,

    pub description: String,

    /// Bumped by the server on every successful update
    #[serde(default)]
    pub version: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modified_at: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modified_by: String,

    /// Owning folder; resolved to the root folder on create when empty
    #[serde(default)]
    pub parent_id: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(rename = "type", default)]
    pub kind: SloKind,

    #[serde(default)]
    pub is_system: bool,

    #[serde(default)]
    pub is_mutable: bool,

    #[serde(default)]
    pub is_locked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_type: Option<SignalType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,

    pub compliance: Compliance,

    pub indicator: Indicator,
}

fn default_content_type() -> String {
    SLO_CONTENT_TYPE.to_string()
}

/// Period over which attainment is measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub compliance_type: ComplianceType,

    /// Attainment target in percent (0-100)
    pub target: i64,

    /// Required for calendar windows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Rolling window length, e.g. "7d"; required for rolling windows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// The measured quantity and the queries producing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub evaluation_type: EvaluationType,
    pub query_type: QueryType,
    pub threshold: f64,
    pub op: Operator,
    pub aggregation: String,
    pub size: String,
    /// Order is meaningful to the server
    pub queries: Vec<QueryGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGroup {
    pub query_group_type: QueryGroupType,
    pub query_group: Vec<Query>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub row_id: String,
    pub query: String,
    #[serde(default)]
    pub use_row_count: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// A folder in the SLO library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Indicator {
    /// Every query across all groups, in document order
    pub fn all_queries(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter().flat_map(|group| group.query_group.iter())
    }
}
