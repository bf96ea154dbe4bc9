use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ROLE: &str = "USER";
pub const DEFAULT_EXPECTED_STATUS: [u16; 3] = [200, 201, 204];

// ── Targets ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Server {
    Core,
    Legacy,
}

impl Server {
    pub fn as_str(&self) -> &'static str {
        match self {
            Server::Core => "core",
            Server::Legacy => "legacy",
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Endpoint Definition ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only POST, PUT and PATCH carry the manifest's request body.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-endpoint override pinning the test to a single server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeOverride {
    CoreOnly,
    LegacyOnly,
}

impl ModeOverride {
    /// Maps the manifest `status` field; anything else (`pending`, `done`, ...)
    /// leaves the override unset.
    pub fn from_manifest_status(status: &str) -> Option<Self> {
        match status {
            "core-only" => Some(ModeOverride::CoreOnly),
            "legacy-only" => Some(ModeOverride::LegacyOnly),
            _ => None,
        }
    }

    pub fn server(&self) -> Server {
        match self {
            ModeOverride::CoreOnly => Server::Core,
            ModeOverride::LegacyOnly => Server::Legacy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub id: String,
    pub path: String,
    pub method: HttpMethod,
    pub auth: bool,
    pub role: Option<String>,
    pub description: String,
    pub query_params: BTreeMap<String, Value>,
    pub path_params: BTreeMap<String, Value>,
    pub request_body: Option<Value>,
    pub mode_override: Option<ModeOverride>,
    pub expected_status: Vec<u16>,
}

impl EndpointDefinition {
    pub fn new(id: impl Into<String>, path: impl Into<String>, method: HttpMethod) -> Self {
        EndpointDefinition {
            id: id.into(),
            path: path.into(),
            method,
            auth: false,
            role: None,
            description: String::new(),
            query_params: BTreeMap::new(),
            path_params: BTreeMap::new(),
            request_body: None,
            mode_override: None,
            expected_status: DEFAULT_EXPECTED_STATUS.to_vec(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_auth(mut self, role: impl Into<String>) -> Self {
        self.auth = true;
        self.role = Some(role.into());
        self
    }

    pub fn with_override(mut self, mode: ModeOverride) -> Self {
        self.mode_override = Some(mode);
        self
    }

    /// Role used for token acquisition; unspecified roles fall back to `USER`.
    pub fn effective_role(&self) -> &str {
        self.role.as_deref().unwrap_or(DEFAULT_ROLE)
    }

    pub fn expects(&self, status: u16) -> bool {
        self.expected_status.contains(&status)
    }
}

// ── Test Accounts ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAccount {
    pub username: String,
    pub password: String,
}

impl TestAccount {
    pub fn new(username: &str, password: &str) -> Self {
        TestAccount {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

pub fn default_test_accounts() -> BTreeMap<String, TestAccount> {
    BTreeMap::from([
        ("SUPER_ADMIN".to_string(), TestAccount::new("testadmin", "testadmin123")),
        ("ADMIN".to_string(), TestAccount::new("testmanager", "testmanager123")),
        ("USER".to_string(), TestAccount::new("testuser", "testuser123")),
    ])
}

// ── Results ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub endpoint_id: String,
    pub path: String,
    pub method: HttpMethod,
    pub core_status: Option<u16>,
    pub legacy_status: Option<u16>,
    pub core_response: Option<Value>,
    pub legacy_response: Option<Value>,
    #[serde(rename = "match")]
    pub matched: bool,
    pub diff: Vec<String>,
    pub error: Option<String>,
    pub duration_ms: f64,
}

impl TestResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// A plain mismatch: not matching, but no terminal error either.
    pub fn is_failure(&self) -> bool {
        !self.matched && self.error.is_none()
    }
}

// ── Run Report ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: String,
    pub path: String,
    pub method: HttpMethod,
    #[serde(rename = "match")]
    pub matched: bool,
    pub core_status: Option<u16>,
    pub legacy_status: Option<u16>,
    pub error: Option<String>,
    pub diff_lines: usize,
    pub duration_ms: f64,
}

impl From<&TestResult> for ResultSummary {
    fn from(r: &TestResult) -> Self {
        ResultSummary {
            id: r.endpoint_id.clone(),
            path: r.path.clone(),
            method: r.method,
            matched: r.matched,
            core_status: r.core_status,
            legacy_status: r.legacy_status,
            error: r.error.clone(),
            diff_lines: r.diff.len(),
            duration_ms: r.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub timestamp: String,
    pub mode: String,
    pub core_url: String,
    pub legacy_url: String,
    #[serde(flatten)]
    pub counts: RunCounts,
    pub results: Vec<ResultSummary>,
}
