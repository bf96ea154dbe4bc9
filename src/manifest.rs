use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::ManifestError;
use crate::models::{
    default_test_accounts, EndpointDefinition, HttpMethod, ModeOverride, TestAccount,
    DEFAULT_EXPECTED_STATUS,
};
use crate::normalize::IgnoreList;

#[derive(Debug, Clone)]
pub struct Manifest {
    pub endpoints: Vec<EndpointDefinition>,
    pub ignore_fields: IgnoreList,
    pub test_accounts: BTreeMap<String, TestAccount>,
}

impl Manifest {
    /// Health/env/config endpoints used when no manifest can be loaded.
    pub fn fallback() -> Self {
        Manifest {
            endpoints: vec![
                EndpointDefinition::new("health", "/actuator/health", HttpMethod::Get)
                    .with_description("Health check"),
                EndpointDefinition::new("env", "/api/v1/env", HttpMethod::Get)
                    .with_description("Environment info"),
                EndpointDefinition::new("config", "/api/v1/config", HttpMethod::Get)
                    .with_description("Config info"),
            ],
            ignore_fields: IgnoreList::default(),
            test_accounts: default_test_accounts(),
        }
    }
}

// ── On-disk shape ──

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    endpoints: Vec<RawEndpoint>,
    ignore_fields: Option<Vec<String>>,
    test_accounts: Option<BTreeMap<String, TestAccount>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEndpoint {
    id: Option<String>,
    path: Option<String>,
    method: Option<String>,
    auth: bool,
    role: Option<String>,
    description: Option<String>,
    params: Option<BTreeMap<String, Value>>,
    path_params: Option<BTreeMap<String, Value>>,
    request_body: Option<Value>,
    status: Option<String>,
    expected_status: Option<Vec<u16>>,
}

impl RawEndpoint {
    fn into_definition(self, index: usize) -> Result<EndpointDefinition, ManifestError> {
        let id = self.id.ok_or(ManifestError::MissingField { index, field: "id" })?;
        let path = self.path.ok_or(ManifestError::MissingField { index, field: "path" })?;
        let method = self.method.ok_or(ManifestError::MissingField { index, field: "method" })?;
        let method: HttpMethod = method
            .parse()
            .map_err(|_| ManifestError::InvalidMethod { id: id.clone(), method })?;

        let expected_status = match self.expected_status {
            Some(codes) if !codes.is_empty() => codes,
            _ => DEFAULT_EXPECTED_STATUS.to_vec(),
        };

        Ok(EndpointDefinition {
            id,
            path,
            method,
            auth: self.auth,
            role: self.role,
            description: self.description.unwrap_or_default(),
            query_params: self.params.unwrap_or_default(),
            path_params: self.path_params.unwrap_or_default(),
            request_body: self.request_body.filter(|body| !body.is_null()),
            mode_override: self.status.as_deref().and_then(ModeOverride::from_manifest_status),
            expected_status,
        })
    }
}

// ── Store ──

pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ManifestStore { path: path.into() }
    }

    pub fn load(&self) -> Result<Manifest, ManifestError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ManifestError::NotFound { path: self.path.clone() }
            } else {
                ManifestError::Io { path: self.path.clone(), source }
            }
        })?;
        let manifest = Self::parse(&text)?;
        tracing::info!(
            path = %self.path.display(),
            endpoints = manifest.endpoints.len(),
            ignore_fields = manifest.ignore_fields.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    pub fn parse(text: &str) -> Result<Manifest, ManifestError> {
        let raw: RawManifest = serde_yaml::from_str(text)?;

        let ignore_fields = match raw.ignore_fields {
            Some(fields) if !fields.is_empty() => fields.into_iter().collect(),
            _ => IgnoreList::default(),
        };

        let mut test_accounts = default_test_accounts();
        for (role, account) in raw.test_accounts.unwrap_or_default() {
            test_accounts.insert(role.to_uppercase(), account);
        }

        let mut seen = HashSet::new();
        let mut endpoints = Vec::with_capacity(raw.endpoints.len());
        for (index, raw_endpoint) in raw.endpoints.into_iter().enumerate() {
            let endpoint = raw_endpoint.into_definition(index)?;
            if !seen.insert(endpoint.id.clone()) {
                return Err(ManifestError::DuplicateId(endpoint.id));
            }
            if endpoint.auth && !test_accounts.contains_key(&endpoint.effective_role().to_uppercase()) {
                tracing::warn!(
                    endpoint = %endpoint.id,
                    role = endpoint.effective_role(),
                    "authenticated endpoint references a role with no test account"
                );
            }
            endpoints.push(endpoint);
        }

        Ok(Manifest {
            endpoints,
            ignore_fields,
            test_accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
ignore_fields: [createdAt, id]
test_accounts:
  admin:
    username: boss
    password: secret
  auditor:
    username: eye
    password: peek
endpoints:
  - id: health
    path: /actuator/health
    method: GET
    status: done
  - id: room-book
    path: /api/v1/rooms/{roomId}/book
    method: post
    auth: true
    role: ADMIN
    path_params: { roomId: 42 }
    request_body: { nights: 2 }
    expected_status: [201]
  - id: rooms-search
    path: /api/v1/rooms
    method: GET
    auth: true
    params: { page: 0, q: ocean }
    status: core-only
  - id: legacy-report
    path: /api/v1/reports/legacy
    method: DELETE
    status: legacy-only
    expected_status: []
"#;

    #[test]
    fn parses_endpoints_in_order() {
        let manifest = ManifestStore::parse(SAMPLE).unwrap();
        let ids: Vec<&str> = manifest.endpoints.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["health", "room-book", "rooms-search", "legacy-report"]);

        let book = &manifest.endpoints[1];
        assert_eq!(book.method, HttpMethod::Post);
        assert!(book.auth);
        assert_eq!(book.effective_role(), "ADMIN");
        assert_eq!(book.path_params["roomId"], json!(42));
        assert_eq!(book.request_body, Some(json!({ "nights": 2 })));
        assert_eq!(book.expected_status, vec![201]);
    }

    #[test]
    fn status_field_maps_to_override() {
        let manifest = ManifestStore::parse(SAMPLE).unwrap();
        assert_eq!(manifest.endpoints[0].mode_override, None);
        assert_eq!(manifest.endpoints[2].mode_override, Some(ModeOverride::CoreOnly));
        assert_eq!(manifest.endpoints[3].mode_override, Some(ModeOverride::LegacyOnly));
    }

    #[test]
    fn defaults_role_and_expected_status() {
        let manifest = ManifestStore::parse(SAMPLE).unwrap();
        assert_eq!(manifest.endpoints[2].effective_role(), "USER");
        assert_eq!(manifest.endpoints[3].expected_status, vec![200, 201, 204]);
        assert_eq!(manifest.endpoints[2].query_params["q"], json!("ocean"));
    }

    #[test]
    fn ignore_list_replaces_defaults() {
        let manifest = ManifestStore::parse(SAMPLE).unwrap();
        assert!(manifest.ignore_fields.contains("id"));
        assert!(manifest.ignore_fields.contains("createdAt"));
        assert!(!manifest.ignore_fields.contains("updatedAt"));
    }

    #[test]
    fn accounts_merge_over_defaults_upper_cased() {
        let manifest = ManifestStore::parse(SAMPLE).unwrap();
        assert_eq!(manifest.test_accounts["ADMIN"].username, "boss");
        assert_eq!(manifest.test_accounts["AUDITOR"].username, "eye");
        assert_eq!(manifest.test_accounts["USER"].username, "testuser");
    }

    #[test]
    fn missing_ignore_list_uses_defaults() {
        let manifest = ManifestStore::parse("endpoints: []\n").unwrap();
        assert_eq!(manifest.ignore_fields, IgnoreList::default());
        assert!(manifest.endpoints.is_empty());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = ManifestStore::parse("endpoints:\n  - id: a\n    method: GET\n").unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { index: 0, field: "path" }));
    }

    #[test]
    fn unsupported_method_is_reported() {
        let err = ManifestStore::parse("endpoints:\n  - id: a\n    path: /x\n    method: TRACE\n").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidMethod { ref id, .. } if id == "a"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = "endpoints:\n  - {id: a, path: /x, method: GET}\n  - {id: a, path: /y, method: GET}\n";
        assert!(matches!(ManifestStore::parse(text), Err(ManifestError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(ManifestStore::parse("endpoints: [ {"), Err(ManifestError::Malformed(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(tmp.path().join("absent.yaml"));
        assert!(matches!(store.load(), Err(ManifestError::NotFound { .. })));
    }

    #[test]
    fn fallback_covers_health_env_config() {
        let manifest = Manifest::fallback();
        let paths: Vec<&str> = manifest.endpoints.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/actuator/health", "/api/v1/env", "/api/v1/config"]);
        assert_eq!(manifest.test_accounts.len(), 3);
    }
}
