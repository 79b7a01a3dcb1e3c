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

//! Client core of a dashboard datasource plugin for a wide-column store:
//! query-batch normalization, metadata discovery with caching, and
//! reshaping of backend results into correlation-tagged frames.

pub mod datasource;
pub mod error;
pub mod frame;
pub mod query;
pub mod settings;
pub mod transport;

pub use datasource::{CassandraDatasource, MetadataCache, ScopeKey};
pub use error::DatasourceError;
pub use frame::{
    normalizer::MetricFindValue, FieldValue, Frame, FrameField, QueryRequest, QueryResponse,
};
pub use query::{
    vars::{ListFormat, TemplateInterpolator, VariableScope, VariableValue},
    CassandraQuery, ColumnKind, QueryType, TimeRange,
};
pub use settings::{Consistency, InstanceSettings, PemSource, TlsSettings};
pub use transport::{HttpTransport, Resource, Transport, TransportError};
