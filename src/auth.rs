use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::api_client::ApiClient;
use crate::error::{AuthError, AuthFailure};
use crate::models::{Server, TestAccount};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub role: String,
    pub server: Server,
}

impl TokenKey {
    pub fn new(role: &str, server: Server) -> Self {
        TokenKey {
            role: role.to_uppercase(),
            server,
        }
    }
}

/// Where in a login response the access token may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    ValueEnvelope,
    DataEnvelope,
    RawBody,
}

impl TokenSource {
    /// Tried in this order; the first source yielding a token wins.
    pub const PRIORITY: [TokenSource; 3] = [
        TokenSource::ValueEnvelope,
        TokenSource::DataEnvelope,
        TokenSource::RawBody,
    ];

    pub fn extract(&self, body: &Value) -> Option<String> {
        let scope = match self {
            TokenSource::ValueEnvelope => body.get("value")?,
            TokenSource::DataEnvelope => body.get("data")?,
            TokenSource::RawBody => body,
        };
        scope
            .get("accessToken")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

pub fn extract_token(body: &Value) -> Option<String> {
    TokenSource::PRIORITY.iter().find_map(|source| source.extract(body))
}

/// Bearer tokens per (role, server), filled on first use and kept for the
/// rest of the run. Construct one per run.
pub struct TokenCache {
    accounts: BTreeMap<String, TestAccount>,
    entries: HashMap<TokenKey, String>,
}

impl TokenCache {
    pub fn new(accounts: BTreeMap<String, TestAccount>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|(role, account)| (role.to_uppercase(), account))
            .collect();
        TokenCache {
            accounts,
            entries: HashMap::new(),
        }
    }

    pub fn cached(&self, role: &str, server: Server) -> Option<&str> {
        self.entries.get(&TokenKey::new(role, server)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached token or logs in once against `client`'s server.
    /// Failures are not retried.
    pub async fn token(&mut self, role: &str, client: &ApiClient) -> Result<String, AuthError> {
        let key = TokenKey::new(role, client.server());
        if let Some(token) = self.entries.get(&key) {
            return Ok(token.clone());
        }

        let fail = |cause: AuthFailure| AuthError {
            role: role.to_string(),
            server: client.server(),
            cause,
        };

        let account = self.accounts.get(&key.role).ok_or_else(|| fail(AuthFailure::UnknownRole))?;
        let resp = client
            .login(account)
            .await
            .map_err(|e| fail(AuthFailure::Transport(e)))?;
        if resp.status != 200 {
            return Err(fail(AuthFailure::Rejected { status: resp.status }));
        }

        let token = serde_json::from_str::<Value>(&resp.body)
            .ok()
            .as_ref()
            .and_then(extract_token)
            .ok_or_else(|| fail(AuthFailure::MissingToken))?;

        tracing::info!(role = %key.role, server = %key.server, "access token cached");
        self.entries.insert(key, token.clone());
        Ok(token)
    }
}
