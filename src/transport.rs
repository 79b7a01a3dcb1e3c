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

use std::fmt::Display;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, RequestBuilder};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{
    frame::{QueryRequest, QueryResponse},
    settings::InstanceSettings,
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid transport configuration: {0}")]
    Config(String),
}

/// Backend resource endpoints used for discovery and variable queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Keyspaces,
    Tables,
    Columns,
    Variables,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Keyspaces => "keyspaces",
            Self::Tables => "tables",
            Self::Columns => "columns",
            Self::Variables => "variables",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

const QUERY_PATH: &str = "query";

/// Boundary to the execution service. The core only defines what a
/// transport is given and what it returns; hosts may substitute their own
/// plumbing.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call_resource(
        &self,
        resource: Resource,
        params: &[(&str, &str)],
    ) -> Result<Value, TransportError>;

    async fn query_data(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError>;
}

/// Production transport over HTTP/JSON, configured from the instance
/// settings (base URL, credentials, timeout, TLS material).
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    user: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &InstanceSettings) -> Result<Self, TransportError> {
        let mut base = Url::parse(&settings.host).map_err(|err| {
            TransportError::Config(format!("invalid host url `{}`: {err}", settings.host))
        })?;
        // keep joins appending instead of replacing the last path segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(tls) = &settings.tls {
            builder = builder.use_rustls_tls();
            if tls.allow_insecure {
                builder = builder.danger_accept_invalid_certs(true);
            }
            if let Some(ca) = &tls.ca {
                let pem = ca.load().map_err(|err| TransportError::Config(err.to_string()))?;
                builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
            }
            if let (Some(certificate), Some(key)) = (&tls.certificate, &tls.key) {
                let mut pem = certificate
                    .load()
                    .map_err(|err| TransportError::Config(err.to_string()))?;
                pem.extend_from_slice(
                    &key.load().map_err(|err| TransportError::Config(err.to_string()))?,
                );
                builder = builder.identity(Identity::from_pem(&pem)?);
            }
        }

        Ok(Self {
            client: builder.build()?,
            base,
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|err| TransportError::Config(format!("invalid endpoint `{path}`: {err}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<String, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call_resource(
        &self,
        resource: Resource,
        params: &[(&str, &str)],
    ) -> Result<Value, TransportError> {
        let mut url = self.endpoint(resource.path())?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }

        let response = self.authorize(self.client.get(url)).send().await?;
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn query_data(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError> {
        let url = self.endpoint(QUERY_PATH)?;
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
