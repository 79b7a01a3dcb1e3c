// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod builder;
pub mod vars;

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One request unit as authored by the query editor. Field names on the wire
/// follow the backend JSON contract. The core reads queries as immutable
/// values; normalization always produces fresh copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CassandraQuery {
    /// Unique within a batch, correlates submitted queries with their frames.
    pub ref_id: String,
    pub query_type: QueryType,
    /// Selects raw mode (free-text CQL) over structured field selection.
    pub raw_query: bool,
    /// Raw CQL text, used when `raw_query` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_id: Option<String>,
    /// Series-name template, passed through to the backend untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "filtering")]
    pub allow_filtering: bool,
    /// Limit results to one row per partition.
    pub instant: bool,
    /// Excluded from execution when set.
    pub hide: bool,
    pub datasource_id: i64,
}

impl CassandraQuery {
    pub fn is_raw(&self) -> bool {
        self.raw_query
    }

    /// A query is complete (executable) iff raw mode has non-empty text and
    /// structured mode has every selection field set.
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Wire name of the first unset field required by the query's mode.
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        if self.raw_query {
            return (!filled(&self.target)).then_some("target");
        }

        [
            ("keyspace", &self.keyspace),
            ("table", &self.table),
            ("columnTime", &self.column_time),
            ("columnValue", &self.column_value),
            ("columnId", &self.column_id),
            ("valueId", &self.value_id),
        ]
        .into_iter()
        .find(|(_, value)| !filled(value))
        .map(|(name, _)| name)
    }

    /// Copy with a new keyspace; the table and column selections depend on
    /// it and are cleared.
    pub fn with_keyspace(&self, keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: Some(keyspace.into()),
            table: None,
            column_time: None,
            column_value: None,
            column_id: None,
            ..self.clone()
        }
    }

    /// Copy with a new table; the column selections are cleared.
    pub fn with_table(&self, table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column_time: None,
            column_value: None,
            column_id: None,
            ..self.clone()
        }
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

/// Backend protocol query kinds. New kinds extend this tag set instead of
/// widening the query shape with loose optional fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Query,
    Search,
    Keyspaces,
    Tables,
    Connection,
    Alert,
}

impl Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Search => write!(f, "search"),
            Self::Keyspaces => write!(f, "keyspaces"),
            Self::Tables => write!(f, "tables"),
            Self::Connection => write!(f, "connection"),
            Self::Alert => write!(f, "alert"),
        }
    }
}

/// Column discovery filter used by the structured editor's selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Timestamp,
    Numeric,
    Identifier,
}

impl ColumnKind {
    /// Type tag the backend uses for this kind in discovery results.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Numeric => "int",
            Self::Identifier => "uuid",
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_tag())
    }
}

/// Dashboard time window shared by every query in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn from_ms(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_ms(&self) -> i64 {
        self.to.timestamp_millis()
    }

    pub fn from_secs(&self) -> i64 {
        self.from.timestamp()
    }

    pub fn to_secs(&self) -> i64 {
        self.to.timestamp()
    }
}
