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

use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::error::DatasourceError;

/// Read-only per-instance configuration owned by the host's config editor.
/// The core never interprets `timeout`; it is handed to the transport as-is.
#[derive(Debug, Clone)]
pub struct InstanceSettings {
    pub datasource_id: i64,
    pub host: String,
    pub keyspace: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub consistency: Consistency,
    pub timeout: Option<Duration>,
    pub tls: Option<TlsSettings>,
}

impl InstanceSettings {
    pub fn new(datasource_id: i64, host: impl Into<String>) -> Self {
        Self {
            datasource_id,
            host: host.into(),
            keyspace: None,
            user: None,
            password: None,
            consistency: Consistency::default(),
            timeout: None,
            tls: None,
        }
    }

    /// Builds settings from the pieces the host persists: the instance id,
    /// the host URL, the JSON blob written by the config editor and the
    /// decrypted password stored separately.
    pub fn from_json(
        datasource_id: i64,
        host: &str,
        json: &str,
        password: Option<String>,
    ) -> Result<Self, DatasourceError> {
        if host.trim().is_empty() {
            return Err(DatasourceError::Settings("host cannot be empty".into()));
        }

        let raw: RawSettings = serde_json::from_str(json)
            .map_err(|err| DatasourceError::Settings(format!("malformed settings JSON: {err}")))?;

        let consistency = match raw.consistency.trim() {
            "" => Consistency::default(),
            text => text.parse()?,
        };

        let tls = if raw.use_custom_tls {
            Some(TlsSettings::from_raw(&raw)?)
        } else {
            None
        };

        Ok(Self {
            datasource_id,
            host: host.to_string(),
            keyspace: non_empty(raw.keyspace),
            user: non_empty(raw.user),
            password,
            consistency,
            timeout: raw.timeout.map(Duration::from_secs),
            tls,
        })
    }
}

/// Raw shape of the JSON blob as the config editor persists it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    keyspace: String,
    user: String,
    consistency: String,
    #[serde(rename = "certPath")]
    cert_path: String,
    #[serde(rename = "rootPath")]
    root_path: String,
    #[serde(rename = "caPath")]
    ca_path: String,
    #[serde(rename = "useCertContent")]
    use_cert_content: bool,
    timeout: Option<u64>,
    #[serde(rename = "UseCustomTLS")]
    use_custom_tls: bool,
    #[serde(rename = "allowInsecureTLS")]
    allow_insecure_tls: bool,
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub allow_insecure: bool,
    /// Client certificate, paired with `key`.
    pub certificate: Option<PemSource>,
    pub key: Option<PemSource>,
    pub ca: Option<PemSource>,
}

impl TlsSettings {
    fn from_raw(raw: &RawSettings) -> Result<Self, DatasourceError> {
        let certificate = PemSource::new(&raw.cert_path, raw.use_cert_content);
        let key = PemSource::new(&raw.root_path, raw.use_cert_content);
        if certificate.is_some() != key.is_some() {
            return Err(DatasourceError::Settings(
                "client certificate and key must both be provided".into(),
            ));
        }

        Ok(Self {
            allow_insecure: raw.allow_insecure_tls,
            certificate,
            key,
            ca: PemSource::new(&raw.ca_path, raw.use_cert_content),
        })
    }
}

/// Certificate material, either a file path or the PEM content itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PemSource {
    Path(PathBuf),
    Content(String),
}

impl PemSource {
    fn new(value: &str, inline: bool) -> Option<Self> {
        if value.trim().is_empty() {
            return None;
        }
        if inline {
            Some(Self::Content(value.to_string()))
        } else {
            Some(Self::Path(PathBuf::from(value)))
        }
    }

    pub fn load(&self) -> Result<Vec<u8>, DatasourceError> {
        match self {
            Self::Path(path) => std::fs::read(path).map_err(|err| {
                DatasourceError::Settings(format!(
                    "failed to read certificate file `{}`: {err}",
                    path.display()
                ))
            }),
            Self::Content(content) => Ok(content.clone().into_bytes()),
        }
    }
}

/// Standard read/write quorum levels of the wide-column store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    #[default]
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Quorum => "QUORUM",
            Self::All => "ALL",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::LocalOne => "LOCAL_ONE",
        }
    }
}

impl Display for Consistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Consistency {
    type Err = DatasourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANY" => Ok(Self::Any),
            "ONE" => Ok(Self::One),
            "TWO" => Ok(Self::Two),
            "THREE" => Ok(Self::Three),
            "QUORUM" => Ok(Self::Quorum),
            "ALL" => Ok(Self::All),
            "LOCAL_QUORUM" => Ok(Self::LocalQuorum),
            "EACH_QUORUM" => Ok(Self::EachQuorum),
            "LOCAL_ONE" => Ok(Self::LocalOne),
            other => Err(DatasourceError::Settings(format!(
                "unknown consistency level `{other}`"
            ))),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_round_trips_through_parse_and_display() {
        for level in [
            Consistency::Any,
            Consistency::One,
            Consistency::Two,
            Consistency::Three,
            Consistency::Quorum,
            Consistency::All,
            Consistency::LocalQuorum,
            Consistency::EachQuorum,
            Consistency::LocalOne,
        ] {
            assert_eq!(level.to_string().parse::<Consistency>().unwrap(), level);
        }
    }

    #[test]
    fn consistency_rejects_unknown_levels() {
        let err = "SOMETIMES".parse::<Consistency>().unwrap_err();
        assert!(matches!(err, DatasourceError::Settings(_)));
    }

    #[test]
    fn parses_full_settings_json() {
        let json = r#"{
            "keyspace": "sensors",
            "user": "grafana",
            "consistency": "LOCAL_QUORUM",
            "timeout": 5,
            "UseCustomTLS": true,
            "allowInsecureTLS": false,
            "certPath": "/etc/certs/client.crt",
            "rootPath": "/etc/certs/client.key",
            "caPath": "/etc/certs/ca.crt"
        }"#;

        let settings =
            InstanceSettings::from_json(3, "https://db.example.com:9042", json, Some("s".into()))
                .unwrap();
        assert_eq!(settings.keyspace.as_deref(), Some("sensors"));
        assert_eq!(settings.user.as_deref(), Some("grafana"));
        assert_eq!(settings.consistency, Consistency::LocalQuorum);
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));

        let tls = settings.tls.unwrap();
        assert!(!tls.allow_insecure);
        assert_eq!(
            tls.certificate,
            Some(PemSource::Path(PathBuf::from("/etc/certs/client.crt")))
        );
        assert_eq!(
            tls.ca,
            Some(PemSource::Path(PathBuf::from("/etc/certs/ca.crt")))
        );
    }

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let settings = InstanceSettings::from_json(1, "http://localhost:9042", "{}", None).unwrap();
        assert_eq!(settings.consistency, Consistency::Quorum);
        assert!(settings.keyspace.is_none());
        assert!(settings.timeout.is_none());
        assert!(settings.tls.is_none());
    }

    #[test]
    fn rejects_empty_host() {
        let err = InstanceSettings::from_json(1, "  ", "{}", None).unwrap_err();
        assert!(matches!(err, DatasourceError::Settings(_)));
    }

    #[test]
    fn rejects_certificate_without_key() {
        let json = r#"{"UseCustomTLS": true, "certPath": "/etc/certs/client.crt"}"#;
        let err = InstanceSettings::from_json(1, "http://localhost", json, None).unwrap_err();
        assert!(matches!(err, DatasourceError::Settings(_)));
    }

    #[test]
    fn inline_material_is_kept_as_content() {
        let json = r#"{
            "UseCustomTLS": true,
            "useCertContent": true,
            "caPath": "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----"
        }"#;
        let settings = InstanceSettings::from_json(1, "http://localhost", json, None).unwrap();
        let ca = settings.tls.unwrap().ca.unwrap();
        assert!(!ca.load().unwrap().is_empty());
        assert!(matches!(ca, PemSource::Content(_)));
    }
}
