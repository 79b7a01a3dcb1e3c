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

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::DatasourceError,
    frame::{Frame, QueryResponse},
    query::ColumnKind,
    transport::TransportError,
};

/// Flattens the per-query response map into the frame sequence the host
/// consumes. Each frame is tagged with its originating ref id; relative
/// frame order within an entry is preserved, ordering across entries is
/// not guaranteed (the host re-associates by id, not by position).
///
/// A submitted query missing from the map contributes zero frames. An entry
/// carrying a backend error message fails the batch with that message.
pub fn normalize_response(response: QueryResponse) -> Result<Vec<Frame>, DatasourceError> {
    let mut frames = Vec::new();
    for (ref_id, result) in response.results {
        if let Some(message) = result.error {
            return Err(DatasourceError::Backend(message));
        }
        frames.extend(
            result
                .frames
                .into_iter()
                .map(|frame| frame.with_ref_id(&ref_id)),
        );
    }

    Ok(frames)
}

/// Discovery result row: either a bare name or a `(name, type-or-label)`
/// pair. Only column 0 is the identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MetaRow {
    Pair(String, String),
    Name(String),
}

/// Extracts identifiers from a `keyspaces`/`tables` discovery payload.
pub fn names_from_value(value: Value) -> Result<Vec<String>, TransportError> {
    let rows: Vec<MetaRow> = serde_json::from_value(value)?;
    Ok(rows
        .into_iter()
        .map(|row| match row {
            MetaRow::Pair(name, _) => name,
            MetaRow::Name(name) => name,
        })
        .collect())
}

/// Extracts column names from a `columns` discovery payload. Paired rows
/// carry the column type in position 1 and are filtered by kind; bare rows
/// were already filtered by the backend and pass through.
pub fn columns_from_value(value: Value, kind: ColumnKind) -> Result<Vec<String>, TransportError> {
    let rows: Vec<MetaRow> = serde_json::from_value(value)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            MetaRow::Pair(name, tag) => (tag == kind.type_tag()).then_some(name),
            MetaRow::Name(name) => Some(name),
        })
        .collect())
}

/// One dashboard-variable option. `text` is what the dropdown shows,
/// `value` is what gets substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricFindValue {
    pub text: String,
    pub value: String,
}

/// Shapes a variable-query payload into dropdown options: column 0 is the
/// value, column 1 an optional human-readable label.
pub fn variable_pairs_from_value(value: Value) -> Result<Vec<MetricFindValue>, TransportError> {
    let rows: Vec<MetaRow> = serde_json::from_value(value)?;
    Ok(rows
        .into_iter()
        .map(|row| match row {
            MetaRow::Pair(value, label) => MetricFindValue { text: label, value },
            MetaRow::Name(value) => MetricFindValue {
                text: value.clone(),
                value,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::frame::QueryResult;

    fn frame(name: &str) -> Frame {
        Frame::new(name, Vec::new())
    }

    #[test]
    fn frames_are_tagged_and_flattened() {
        let response = QueryResponse {
            results: HashMap::from([
                (
                    "A".to_string(),
                    QueryResult {
                        frames: vec![frame("f1")],
                        error: None,
                    },
                ),
                (
                    "B".to_string(),
                    QueryResult {
                        frames: vec![frame("f2"), frame("f3")],
                        error: None,
                    },
                ),
            ]),
        };

        let frames = normalize_response(response).unwrap();
        assert_eq!(frames.len(), 3);

        let tagged = |id: &str| {
            frames
                .iter()
                .filter(|f| f.ref_id.as_deref() == Some(id))
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(tagged("A"), ["f1"]);
        // relative order within one entry survives flattening
        assert_eq!(tagged("B"), ["f2", "f3"]);
    }

    #[test]
    fn empty_response_yields_no_frames() {
        let frames = normalize_response(QueryResponse::default()).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn entry_error_fails_the_batch() {
        let response = QueryResponse {
            results: HashMap::from([(
                "A".to_string(),
                QueryResult {
                    frames: Vec::new(),
                    error: Some("table does not exist".to_string()),
                },
            )]),
        };

        let err = normalize_response(response).unwrap_err();
        match err {
            DatasourceError::Backend(message) => assert_eq!(message, "table does not exist"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn names_take_column_zero_of_paired_rows() {
        let value = json!([["sensors", "table"], ["readings", "table"]]);
        assert_eq!(names_from_value(value).unwrap(), ["sensors", "readings"]);
    }

    #[test]
    fn names_accept_bare_string_rows() {
        let value = json!(["system", "sensors"]);
        assert_eq!(names_from_value(value).unwrap(), ["system", "sensors"]);
    }

    #[test]
    fn columns_filter_paired_rows_by_type_tag() {
        let value = json!([
            ["registered_at", "timestamp"],
            ["temperature", "int"],
            ["sensor_id", "uuid"]
        ]);
        assert_eq!(
            columns_from_value(value, ColumnKind::Identifier).unwrap(),
            ["sensor_id"]
        );
    }

    #[test]
    fn malformed_rows_surface_a_decode_error() {
        let err = names_from_value(json!([{"name": "x"}])).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn variable_rows_map_value_then_label() {
        let value = json!([["99051fe9", "kitchen"], "garage"]);
        assert_eq!(
            variable_pairs_from_value(value).unwrap(),
            vec![
                MetricFindValue {
                    text: "kitchen".to_string(),
                    value: "99051fe9".to_string(),
                },
                MetricFindValue {
                    text: "garage".to_string(),
                    value: "garage".to_string(),
                },
            ]
        );
    }
}
