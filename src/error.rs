use std::path::PathBuf;

use thiserror::Error;

use crate::models::Server;

// ── Manifest ──

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_yaml::Error),

    #[error("endpoint #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("endpoint `{id}` has unsupported method `{method}`")]
    InvalidMethod { id: String, method: String },

    #[error("duplicate endpoint id `{0}`")]
    DuplicateId(String),
}

// ── Transport ──

/// Network-level failure of a single call. Never leaves the executor: it is
/// folded into a status-0 response there.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection refused: {url}")]
    Connect { url: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect { url: url.to_string() }
        } else if err.is_timeout() {
            TransportError::Timeout { url: url.to_string() }
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to create HTTP client: {0}")]
pub struct ClientError(#[from] pub reqwest::Error);

// ── Auth ──

#[derive(Debug, Clone, Error)]
pub enum AuthFailure {
    #[error("no test account configured")]
    UnknownRole,

    #[error("login returned status {status}")]
    Rejected { status: u16 },

    #[error("login response carried no access token")]
    MissingToken,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Error)]
#[error("failed to get token for role {role} on {server}: {cause}")]
pub struct AuthError {
    pub role: String,
    pub server: Server,
    #[source]
    pub cause: AuthFailure,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("test data request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("test data request returned status {status}")]
    Rejected { status: u16 },
}

// ── Golden snapshots ──

#[derive(Debug, Error)]
pub enum GoldenStoreError {
    #[error("golden file I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt golden file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Terminal per-endpoint failure. Its `Display` text is what lands in
/// `TestResult::error`.
#[derive(Debug, Error)]
pub enum EndpointFailure {
    #[error("Status mismatch: core={core}, legacy={legacy}")]
    StatusMismatch { core: u16, legacy: u16 },

    #[error("No golden file found")]
    GoldenMissing,

    #[error("Cannot save golden: status {0}")]
    NotSaveable(u16),

    #[error("Golden store failure: {0}")]
    GoldenStore(#[from] GoldenStoreError),
}

// ── Report / config ──

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unknown run mode `{0}` (expected compare, core-only, save-golden or compare-golden)")]
    InvalidMode(String),
}

/// Errors that abort a run before any endpoint is attempted.
#[derive(Debug, Error)]
pub enum CompatError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
