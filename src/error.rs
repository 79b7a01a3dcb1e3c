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

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum DatasourceError {
    /// The query is not executable for its mode. Raised before any network
    /// call; the host shows the message and skips execution of the batch.
    #[error("query `{ref_id}` is not executable: {reason}")]
    Validation { ref_id: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Error reported by the execution service for a submitted query.
    #[error("backend error: {0}")]
    Backend(String),
    #[error("invalid datasource settings: {0}")]
    Settings(String),
}

impl DatasourceError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
