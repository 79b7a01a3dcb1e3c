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

use crate::{
    error::DatasourceError,
    query::{
        vars::{ListFormat, TemplateInterpolator, VariableScope},
        CassandraQuery, TimeRange,
    },
};

/// Template default the editor seeds new panels with; never executed.
pub const PLACEHOLDER_TARGET: &str = "select metric";

/// Turns an editor-authored batch into an executable one: placeholder and
/// hidden queries are dropped, the reserved time variables are injected and
/// `target`/`value_id` are interpolated per query. The incoming batch is
/// never mutated; callers get fresh copies with order and ref ids preserved.
///
/// Validation inspects the first remaining query only, after substitution,
/// and fails before any I/O happens.
pub fn normalize_batch(
    batch: &[CassandraQuery],
    range: &TimeRange,
    scope: &VariableScope,
    interpolator: &dyn TemplateInterpolator,
) -> Result<Vec<CassandraQuery>, DatasourceError> {
    let scope = scope.with_time_range(range);

    let mut normalized = Vec::with_capacity(batch.len());
    for query in batch {
        if query.hide || is_placeholder(query) {
            continue;
        }

        let mut query = query.clone();
        if let Some(target) = query.target.as_deref() {
            query.target = Some(interpolator.interpolate(target, &scope, ListFormat::Csv));
        }
        if let Some(value_id) = query.value_id.as_deref() {
            query.value_id = Some(interpolator.interpolate(value_id, &scope, ListFormat::Csv));
        }
        normalized.push(query);
    }

    if let Some(first) = normalized.first() {
        if let Some(field) = first.missing_field() {
            return Err(DatasourceError::Validation {
                ref_id: first.ref_id.clone(),
                reason: format!("`{field}` must be set"),
            });
        }
    }

    Ok(normalized)
}

fn is_placeholder(query: &CassandraQuery) -> bool {
    query.target.as_deref().map(str::trim) == Some(PLACEHOLDER_TARGET)
}
