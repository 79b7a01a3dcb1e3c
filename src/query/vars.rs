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

use std::collections::HashMap;

use regex::{Captures, Regex};

use super::TimeRange;

/// Reserved names the builder injects from the dashboard time window so raw
/// CQL can reference the active range.
pub const TIME_FROM: &str = "__timeFrom";
pub const TIME_TO: &str = "__timeTo";
pub const UNIX_EPOCH_FROM: &str = "__unixEpochFrom";
pub const UNIX_EPOCH_TO: &str = "__unixEpochTo";

/// A dashboard variable binding: a single value or a multi-select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    Single(String),
    Multi(Vec<String>),
}

impl VariableValue {
    pub fn render(&self, format: ListFormat) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Multi(values) => match format {
                // literal list suitable for an `IN (...)` clause
                ListFormat::Csv => values.join(","),
            },
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// How a multi-value variable is joined into a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Csv,
}

/// Host-supplied mapping from variable name to substitution value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableScope {
    values: HashMap<String, VariableValue>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<VariableValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.values.get(name)
    }

    /// Copy of the scope extended with the reserved time-window variables,
    /// as epoch milliseconds and epoch seconds.
    pub fn with_time_range(&self, range: &TimeRange) -> Self {
        let mut scope = self.clone();
        scope.set(TIME_FROM, range.from_ms().to_string());
        scope.set(TIME_TO, range.to_ms().to_string());
        scope.set(UNIX_EPOCH_FROM, range.from_secs().to_string());
        scope.set(UNIX_EPOCH_TO, range.to_secs().to_string());
        scope
    }
}

/// Injected substitution capability. Hosts bring their own engine; the
/// default covers `$name` and `${name}` references.
pub trait TemplateInterpolator: Send + Sync {
    fn interpolate(&self, text: &str, scope: &VariableScope, format: ListFormat) -> String;
}

pub struct DefaultInterpolator {
    pattern: Regex,
}

impl Default for DefaultInterpolator {
    fn default() -> Self {
        Self {
            pattern: Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("variable pattern is valid"),
        }
    }
}

impl TemplateInterpolator for DefaultInterpolator {
    fn interpolate(&self, text: &str, scope: &VariableScope, format: ListFormat) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match scope.get(name) {
                    Some(value) => value.render(format),
                    // unknown references are left untouched
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn interpolate(text: &str, scope: &VariableScope) -> String {
        DefaultInterpolator::default().interpolate(text, scope, ListFormat::Csv)
    }

    #[test]
    fn substitutes_single_value() {
        let mut scope = VariableScope::new();
        scope.set("sensor", "abc-123");
        assert_eq!(interpolate("id = $sensor", &scope), "id = abc-123");
        assert_eq!(interpolate("id = ${sensor}", &scope), "id = abc-123");
    }

    #[test]
    fn multi_value_joins_as_csv() {
        let mut scope = VariableScope::new();
        scope.set("region", vec!["us", "eu"]);
        assert_eq!(interpolate("$region", &scope), "us,eu");
    }

    #[test]
    fn unknown_variables_are_left_as_is() {
        let scope = VariableScope::new();
        assert_eq!(interpolate("WHERE id = $missing", &scope), "WHERE id = $missing");
    }

    #[test]
    fn time_range_scope_renders_epoch_values() {
        let range = TimeRange::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
        );
        let scope = VariableScope::new().with_time_range(&range);

        assert_eq!(
            interpolate("t >= $__timeFrom AND t <= $__timeTo", &scope),
            "t >= 1700000000000 AND t <= 1700003600000"
        );
        assert_eq!(
            interpolate("$__unixEpochFrom..$__unixEpochTo", &scope),
            "1700000000..1700003600"
        );
    }
}
