use regex_lite::{Captures, Regex};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::api_client::{ApiClient, ApiRequest};
use crate::auth::TokenCache;
use crate::error::{SetupError, TransportError};
use crate::models::{EndpointDefinition, HttpMethod, Server};

const SETUP_ROLE: &str = "SUPER_ADMIN";

/// Status code and decoded body of one call. Transport failures are folded
/// in as status 0 with an `{"error": ...}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub status: u16,
    pub body: Option<Value>,
}

impl Exchange {
    fn synthetic(status: u16, message: String) -> Self {
        Exchange {
            status,
            body: Some(json!({ "error": message })),
        }
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}/]+)\}").expect("placeholder pattern is valid"))
}

/// String form used for path substitution: strings verbatim, everything
/// else as its JSON text.
pub fn coerce_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitutes `{name}` placeholders; unknown names are left verbatim.
pub fn resolve_path(path: &str, params: &BTreeMap<String, Value>) -> String {
    placeholder_pattern()
        .replace_all(path, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => coerce_param(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Query pairs for a GET. Arrays repeat their key once per element and
/// nulls are dropped.
pub fn query_pairs(params: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| (key.clone(), coerce_param(item))),
            ),
            other => pairs.push((key.clone(), coerce_param(other))),
        }
    }
    pairs
}

/// Decodes a response body. Anything that is not JSON, the empty body
/// included, is wrapped as `{"text": ...}`; a JSON `null` counts as absent.
pub fn decode_body(raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(json!({ "text": raw })),
    }
}

struct Targets {
    core: ApiClient,
    legacy: ApiClient,
}

impl Targets {
    fn get(&self, server: Server) -> &ApiClient {
        match server {
            Server::Core => &self.core,
            Server::Legacy => &self.legacy,
        }
    }
}

pub struct RequestExecutor {
    targets: Targets,
    tokens: TokenCache,
}

impl RequestExecutor {
    pub fn new(core: ApiClient, legacy: ApiClient, tokens: TokenCache) -> Self {
        RequestExecutor {
            targets: Targets { core, legacy },
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub async fn execute(&mut self, endpoint: &EndpointDefinition, server: Server) -> Exchange {
        let client = self.targets.get(server);
        let path = resolve_path(&endpoint.path, &endpoint.path_params);

        let token = if endpoint.auth {
            let role = endpoint.effective_role();
            match self.tokens.token(role, client).await {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint.id, error = %e, "skipping call without token");
                    return Exchange::synthetic(401, format!("Failed to get token for role {}", role));
                }
            }
        } else {
            None
        };

        let query = if endpoint.method == HttpMethod::Get {
            query_pairs(&endpoint.query_params)
        } else {
            Vec::new()
        };
        let body = if endpoint.method.carries_body() {
            endpoint.request_body.as_ref()
        } else {
            None
        };

        let result = client
            .send(ApiRequest {
                method: endpoint.method.to_reqwest(),
                path: &path,
                query,
                body,
                bearer: token.as_deref(),
                timeout: client.timeouts().request(),
            })
            .await;

        match result {
            Ok(resp) => Exchange {
                status: resp.status,
                body: decode_body(&resp.body),
            },
            Err(e @ TransportError::Connect { .. }) => {
                tracing::warn!(endpoint = %endpoint.id, %server, "connection refused");
                Exchange::synthetic(0, e.to_string())
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint.id, %server, error = %e, "transport failure");
                Exchange::synthetic(0, e.to_string())
            }
        }
    }

    /// Seeds fixture data on `server` through the dev endpoint.
    pub async fn setup_test_data(&mut self, server: Server) -> Result<u16, SetupError> {
        let client = self.targets.get(server);
        let token = self.tokens.token(SETUP_ROLE, client).await?;
        let resp = client.create_test_data(&token).await?;
        match resp.status {
            200 | 201 => Ok(resp.status),
            status => Err(SetupError::Rejected { status }),
        }
    }
}
