use reqwest::{header, Client, Method};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::config::Timeouts;
use crate::error::{ClientError, TransportError};
use crate::models::{Server, TestAccount};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const TEST_DATA_PATH: &str = "/api/v1/dev/test-data";

/// HTTP access to one target server.
pub struct ApiClient {
    client: Client,
    server: Server,
    base_url: String,
    timeouts: Timeouts,
}

pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub duration_ms: i64,
}

/// Everything the client needs to issue one call.
pub struct ApiRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: Vec<(String, String)>,
    pub body: Option<&'a Value>,
    pub bearer: Option<&'a str>,
    pub timeout: Duration,
}

impl ApiClient {
    pub fn new(server: Server, base_url: &str, timeouts: &Timeouts) -> Result<Self, ClientError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true) // Allow self-signed certs for dev/testing
            .build()?;

        Ok(ApiClient {
            client,
            server,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts: timeouts.clone(),
        })
    }

    pub fn server(&self) -> Server {
        self.server
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn build_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub async fn send(&self, request: ApiRequest<'_>) -> Result<ApiResponse, TransportError> {
        let url = self.build_url(request.path);
        let start = Instant::now();

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .timeout(request.timeout)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = request.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;
        let duration_ms = start.elapsed().as_millis() as i64;

        tracing::debug!(
            server = %self.server,
            method = %request.method,
            url = %url,
            status,
            duration_ms,
            "request completed"
        );

        Ok(ApiResponse {
            status,
            body,
            duration_ms,
        })
    }

    pub async fn login(&self, account: &TestAccount) -> Result<ApiResponse, TransportError> {
        let credentials = serde_json::json!({
            "username": account.username,
            "password": account.password,
        });
        self.send(ApiRequest {
            method: Method::POST,
            path: LOGIN_PATH,
            query: Vec::new(),
            body: Some(&credentials),
            bearer: None,
            timeout: self.timeouts.login(),
        })
        .await
    }

    pub async fn create_test_data(&self, token: &str) -> Result<ApiResponse, TransportError> {
        let body = serde_json::json!({ "type": "all" });
        self.send(ApiRequest {
            method: Method::POST,
            path: TEST_DATA_PATH,
            query: Vec::new(),
            body: Some(&body),
            bearer: Some(token),
            timeout: self.timeouts.setup(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_with_single_slash() {
        let client = ApiClient::new(Server::Core, "http://localhost:8080///", &Timeouts::default()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.build_url("/api/v1/rooms"), "http://localhost:8080/api/v1/rooms");
        assert_eq!(client.build_url("api/v1/rooms"), "http://localhost:8080/api/v1/rooms");
    }
}
