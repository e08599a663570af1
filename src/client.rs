//! HTTP helpers for the Frappe JSON API. Every request goes through one
//! `reqwest::Client` built with a cookie store, so the `sid` cookie set by the
//! login call is replayed on later calls without this crate touching it. The
//! helpers never log request bodies; login payloads carry the password.

use crate::{
    config::{API_PREFIX, ApiMode, ClientConfig},
    cookies::SessionCookies,
    error::AppError,
};
use reqwest::{
    Client, Method, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{Instrument, debug, info_span};

const APPLICATION_JSON: &str = "application/json";
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

/// Cookie-aware JSON client bound to a [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct SessionClient {
    http: Client,
    config: ClientConfig,
    cookies: SessionCookies,
}

impl SessionClient {
    /// Client whose cookies die with the process.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        Self::with_cookies(config, SessionCookies::in_memory())
    }

    /// Client that sends and collects cookies through `cookies`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_cookies(config: ClientConfig, cookies: SessionCookies) -> Result<Self, AppError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_provider(cookies.provider());

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            config,
            cookies,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    /// Builds the URL for an endpoint below `/api`, e.g. `/method/login`.
    ///
    /// # Errors
    /// Returns an error in production mode when no server domain is known.
    pub fn build_url(&self, server_domain: &str, endpoint: &str) -> Result<String, AppError> {
        let base = match &self.config.mode {
            ApiMode::Development { proxy_base } => proxy_base.as_str(),
            ApiMode::Production => {
                if server_domain.trim().is_empty() {
                    return Err(AppError::Config(
                        "Server domain is not configured.".to_string(),
                    ));
                }
                server_domain
            }
        };
        Ok(build_url_with_base(base, endpoint))
    }

    /// Sends a request and returns the raw response, whatever its status.
    ///
    /// # Errors
    /// Returns an error on transport failure or if `body` cannot be encoded.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Response, AppError> {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, APPLICATION_JSON);

        if body.is_some() || (method != Method::GET && method != Method::HEAD) {
            builder = builder.header(CONTENT_TYPE, APPLICATION_JSON);
        }

        if let Some(body) = body {
            let payload = serde_json::to_string(body).map_err(|err| {
                AppError::Serialization(format!("Failed to encode request: {err}"))
            })?;
            builder = builder.body(payload);
        }

        builder = builder.headers(extra_headers(headers)?);

        let span = info_span!("api.request", http.method = %method, url = %url);
        let response = builder.send().instrument(span).await?;
        debug!("{} {} -> {}", method, url, response.status());
        Ok(response)
    }

    /// Posts a JSON body. The caller owns the status handling.
    ///
    /// # Errors
    /// Returns an error on transport failure or if `body` cannot be encoded.
    pub async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<Response, AppError> {
        let body = serde_json::to_value(body)
            .map_err(|err| AppError::Serialization(format!("Failed to encode request: {err}")))?;
        self.send(Method::POST, url, Some(&body), &[]).await
    }

    /// Posts without a body, used to clear a session.
    ///
    /// # Errors
    /// Returns an error on transport failure.
    pub async fn post_empty(&self, url: &str) -> Result<Response, AppError> {
        self.send(Method::POST, url, None, &[]).await
    }

    /// # Errors
    /// Returns an error on transport failure.
    pub async fn get(&self, url: &str) -> Result<Response, AppError> {
        self.send(Method::GET, url, None, &[]).await
    }
}

/// Joins a base URL, the `/api` prefix and an endpoint.
#[must_use]
pub fn build_url_with_base(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let endpoint = endpoint.trim().trim_start_matches('/');
    let endpoint = endpoint
        .strip_prefix(API_PREFIX.trim_start_matches('/'))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .map_or(endpoint, |rest| rest.trim_start_matches('/'));

    format!("{base}{API_PREFIX}/{endpoint}")
}

/// Parses a 2xx JSON body. An empty body decodes as JSON `null`.
///
/// # Errors
/// Returns an error for non-2xx statuses or undecodable bodies.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(AppError::Http {
            status: status.as_u16(),
            message: sanitize_body(&text, status),
        });
    }

    if text.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Canonical reason phrase for a status, empty when unknown.
#[must_use]
pub fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

/// Trims and truncates an error body, falling back to the reason phrase.
#[must_use]
pub fn sanitize_body(body: &str, status: StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        let reason = status_text(status);
        if reason.is_empty() {
            "Request failed.".to_string()
        } else {
            reason.to_string()
        }
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

fn extra_headers(headers: &[(String, String)]) -> Result<HeaderMap, AppError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| AppError::Config(format!("Invalid header name {name}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| AppError::Config(format!("Invalid header value for {name}: {err}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn build_url_with_base_normalizes_slashes() {
        assert_eq!(
            build_url_with_base("https://demo.example.com/", "/method/login"),
            "https://demo.example.com/api/method/login"
        );
        assert_eq!(
            build_url_with_base(" https://demo.example.com ", "method/logout"),
            "https://demo.example.com/api/method/logout"
        );
        assert_eq!(
            build_url_with_base("https://demo.example.com", "/api/resource/Item"),
            "https://demo.example.com/api/resource/Item"
        );
        assert_eq!(
            build_url_with_base("https://demo.example.com", "/apiary"),
            "https://demo.example.com/api/apiary"
        );
    }

    #[test]
    fn build_url_uses_proxy_in_development() -> Result<()> {
        let client = SessionClient::new(ClientConfig::development("http://localhost:8102"))?;
        assert_eq!(
            client.build_url("https://ignored.example.com", "/method/login")?,
            "http://localhost:8102/api/method/login"
        );
        Ok(())
    }

    #[test]
    fn build_url_requires_domain_in_production() -> Result<()> {
        let client = SessionClient::new(ClientConfig::default())?;
        assert!(matches!(
            client.build_url("  ", "/method/login"),
            Err(AppError::Config(_))
        ));
        assert_eq!(
            client.build_url("https://demo.example.com", "/method/login")?,
            "https://demo.example.com/api/method/login"
        );
        Ok(())
    }

    #[test]
    fn sanitize_body_falls_back_to_reason() {
        assert_eq!(
            sanitize_body("  ", StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error"
        );
        assert_eq!(sanitize_body(&"x".repeat(500), StatusCode::BAD_REQUEST).len(), 200);
    }

    #[tokio::test]
    async fn post_json_sets_headers_and_body() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/method/login"))
            .and(header("Accept", "application/json"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"usr": "admin", "pwd": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Logged In"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SessionClient::new(ClientConfig::default())?;
        let url = client.build_url(&server.uri(), "/method/login")?;
        let response = client
            .post_json(&url, &json!({"usr": "admin", "pwd": "pw"}))
            .await?;
        let body: Value = read_json(response).await?;
        assert_eq!(body, json!({"message": "Logged In"}));
        Ok(())
    }

    #[tokio::test]
    async fn post_without_body_still_declares_json() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/method/frappe.client.ping"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/method/frappe.client.ping"))
            .and(|request: &Request| !request.headers.contains_key("content-type"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SessionClient::new(ClientConfig::default())?;
        let url = client.build_url(&server.uri(), "/method/frappe.client.ping")?;
        let posted: Value = read_json(client.send(Method::POST, &url, None, &[]).await?).await?;
        assert_eq!(posted, json!({"message": "pong"}));
        let fetched: Value = read_json(client.get(&url).await?).await?;
        assert_eq!(fetched, json!({"message": "pong"}));
        Ok(())
    }

    #[tokio::test]
    async fn cookies_round_trip_between_calls() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/method/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "sid=abc123; Path=/; HttpOnly")
                    .set_body_json(json!({"message": "Logged In"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/method/frappe.auth.get_logged_user"))
            .and(|request: &Request| {
                request
                    .headers
                    .get("cookie")
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| value.contains("sid=abc123"))
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "admin"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SessionClient::new(ClientConfig::default())?;
        let login = client.build_url(&server.uri(), "/method/login")?;
        client.post_json(&login, &json!({"usr": "a", "pwd": "b"})).await?;

        let who = client.build_url(&server.uri(), "/method/frappe.auth.get_logged_user")?;
        let body: Value = read_json(client.get(&who).await?).await?;
        assert_eq!(body, json!({"message": "admin"}));
        Ok(())
    }

    #[tokio::test]
    async fn read_json_maps_http_errors() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/method/ping"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = SessionClient::new(ClientConfig::default())?;
        let url = client.build_url(&server.uri(), "/method/ping")?;
        let result: Result<Value, AppError> = read_json(client.get(&url).await?).await;
        assert_eq!(
            result,
            Err(AppError::Http {
                status: 502,
                message: "Bad Gateway".to_string()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_reports_connect_failure() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let client = SessionClient::new(ClientConfig::default())?;
        let url = client.build_url(&format!("http://{addr}"), "/method/ping")?;
        let result = client.get(&url).await;
        assert_eq!(
            result.err(),
            Some(AppError::Network(
                crate::error::CONNECT_FAILED_MESSAGE.to_string()
            ))
        );
        Ok(())
    }
}
