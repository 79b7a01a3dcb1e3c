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

mod cache;

pub use cache::{MetadataCache, ScopeKey};

use std::sync::Arc;

use log::debug;

use crate::{
    error::DatasourceError,
    frame::{
        normalizer::{self, MetricFindValue},
        Frame, QueryRequest,
    },
    query::{
        builder,
        vars::{DefaultInterpolator, TemplateInterpolator, VariableScope},
        CassandraQuery, ColumnKind, QueryType, TimeRange,
    },
    settings::InstanceSettings,
    transport::{Resource, Transport},
};

/// Client core of the datasource plugin: one instance per configured
/// datasource, owning the metadata cache and the collaborator handles.
pub struct CassandraDatasource {
    settings: InstanceSettings,
    transport: Arc<dyn Transport>,
    interpolator: Arc<dyn TemplateInterpolator>,
    cache: MetadataCache,
}

impl CassandraDatasource {
    pub fn new(settings: InstanceSettings, transport: Arc<dyn Transport>) -> Self {
        Self::with_interpolator(settings, transport, Arc::new(DefaultInterpolator::default()))
    }

    /// Uses the host's own substitution engine instead of the built-in one.
    pub fn with_interpolator(
        settings: InstanceSettings,
        transport: Arc<dyn Transport>,
        interpolator: Arc<dyn TemplateInterpolator>,
    ) -> Self {
        Self {
            settings,
            transport,
            interpolator,
            cache: MetadataCache::new(),
        }
    }

    pub fn settings(&self) -> &InstanceSettings {
        &self.settings
    }

    /// Execute-query entry point: normalizes the batch, executes it and
    /// reshapes the response into correlation-tagged frames. A batch that
    /// is empty after normalization performs no network call.
    pub async fn query(
        &self,
        batch: &[CassandraQuery],
        range: &TimeRange,
        scope: &VariableScope,
    ) -> Result<Vec<Frame>, DatasourceError> {
        let queries = builder::normalize_batch(batch, range, scope, self.interpolator.as_ref())?;
        if queries.is_empty() {
            debug!("batch is empty after normalization, skipping execution");
            return Ok(Vec::new());
        }

        debug!("executing batch of {} queries", queries.len());
        let response = self.transport.query_data(&QueryRequest { queries }).await?;
        normalizer::normalize_response(response)
    }

    /// Keyspace discovery, cached for the datasource lifetime. Transport
    /// failures surface as an empty list so editor dropdowns stay usable.
    pub async fn keyspaces(&self) -> Vec<String> {
        self.cache
            .get_or_fetch(ScopeKey::Keyspaces, || async move {
                let value = self
                    .transport
                    .call_resource(Resource::Keyspaces, &[])
                    .await?;
                normalizer::names_from_value(value)
            })
            .await
    }

    /// Table discovery for one keyspace, same contract as `keyspaces`.
    pub async fn tables(&self, keyspace: &str) -> Vec<String> {
        self.cache
            .get_or_fetch(ScopeKey::Tables(keyspace.to_string()), || async move {
                let value = self
                    .transport
                    .call_resource(Resource::Tables, &[("keyspace", keyspace)])
                    .await?;
                normalizer::names_from_value(value)
            })
            .await
    }

    /// Column discovery filtered by kind, same contract as `keyspaces`.
    pub async fn columns(&self, keyspace: &str, table: &str, kind: ColumnKind) -> Vec<String> {
        let key = ScopeKey::Columns(keyspace.to_string(), table.to_string(), kind);
        self.cache
            .get_or_fetch(key, || async move {
                let value = self
                    .transport
                    .call_resource(
                        Resource::Columns,
                        &[
                            ("keyspace", keyspace),
                            ("table", table),
                            ("needType", kind.type_tag()),
                        ],
                    )
                    .await?;
                normalizer::columns_from_value(value, kind)
            })
            .await
    }

    /// Variable-query entry point populating dashboard template variables.
    /// Unlike the discovery calls this is user-authored and not cached, and
    /// failures are surfaced instead of swallowed.
    pub async fn metric_find_query(
        &self,
        raw_query: &str,
    ) -> Result<Vec<MetricFindValue>, DatasourceError> {
        let value = self
            .transport
            .call_resource(Resource::Variables, &[("query", raw_query)])
            .await?;
        Ok(normalizer::variable_pairs_from_value(value)?)
    }

    /// Health probe issued by the config editor's "save & test" action.
    pub async fn check_connection(&self) -> Result<(), DatasourceError> {
        let probe = CassandraQuery {
            ref_id: "health".to_string(),
            query_type: QueryType::Connection,
            raw_query: true,
            target: Some("SELECT 1".to_string()),
            datasource_id: self.settings.datasource_id,
            ..CassandraQuery::default()
        };

        let response = self
            .transport
            .query_data(&QueryRequest {
                queries: vec![probe],
            })
            .await?;
        normalizer::normalize_response(response)?;
        Ok(())
    }

    /// Explicitly drops one cached discovery scope; the next lookup fetches
    /// fresh metadata.
    pub async fn invalidate(&self, key: &ScopeKey) {
        self.cache.invalidate(key).await;
    }
}
