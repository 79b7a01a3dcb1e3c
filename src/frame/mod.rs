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

pub mod normalizer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::CassandraQuery;

/// Execution request body handed to the transport.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub queries: Vec<CassandraQuery>,
}

/// Execution response: one entry per submitted `ref_id`. Entries may be
/// missing when the backend returned fewer results than requested.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: HashMap<String, QueryResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One named columnar table returned for a query. Field order is determined
/// by the backend schema and never reordered on this side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    /// Correlation id of the originating query, attached by the normalizer.
    #[serde(rename = "refId", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<FrameField>,
}

impl Frame {
    pub fn new(name: impl Into<String>, fields: Vec<FrameField>) -> Self {
        Self {
            name: name.into(),
            ref_id: None,
            fields,
        }
    }

    pub(crate) fn with_ref_id(mut self, ref_id: &str) -> Self {
        self.ref_id = Some(ref_id.to_string());
        self
    }

    /// Rows in the frame; fields are aligned by row index.
    pub fn row_count(&self) -> usize {
        self.fields.first().map_or(0, |field| field.values.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameField {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl FrameField {
    pub fn new(name: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self {
            name: name.into(),
            labels: HashMap::new(),
            values,
        }
    }
}

/// Cell value of a result column. Timestamps travel as epoch-millisecond
/// numbers; the host decides the render type from the field metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}
