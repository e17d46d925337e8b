//! Strata HTTP session: token grants, request plumbing, pagination.
//!
//! One [`Session`] per `user@host@realm`. All requests are sequential; a
//! session never has overlapping in-flight calls within one invocation.
//! Remote failures pass the platform's own status and message through
//! verbatim instead of reinterpreting them.

#![forbid(unsafe_code)]

mod error;

pub use error::ClientError;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use strata_persist::{TokenRecord, TokenStore};
use tracing::{debug, warn};

/// Which side of the platform a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realm {
    /// The user-facing control plane (`api/v2`).
    User,
    /// The identity service admin realm (user management).
    Admin,
}

impl Realm {
    fn api_prefix(self) -> &'static str {
        match self {
            Realm::User => "api/v2",
            Realm::Admin => "auth/admin/realms/StrataPlatform",
        }
    }

    fn auth_realm(self) -> &'static str {
        match self {
            Realm::User => "StrataPlatform",
            Realm::Admin => "master",
        }
    }

    fn client_id(self) -> &'static str {
        match self {
            Realm::User => "strata-platform",
            Realm::Admin => "admin-cli",
        }
    }
}

/// Connection settings for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub hostname: String,
    pub username: String,
    /// Password for the initial grant. Without one, a session can only run
    /// on a persisted token.
    pub password: Option<String>,
    pub realm: Realm,
    /// Load/save tokens under the strata home directory.
    pub persist: bool,
    /// Accept self-signed cluster certificates.
    pub insecure: bool,
}

const CONNECT_RETRIES: u32 = 3;
const CONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Maximum page size accepted by the identity service.
const PAGE_MAX: usize = 1000;

pub struct Session {
    cfg: SessionConfig,
    http: reqwest::Client,
    token: Mutex<Option<TokenRecord>>,
    store: Option<TokenStore>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl Session {
    /// Build a session, loading any persisted token for this `user@host`.
    /// No network traffic happens here; authentication is lazy.
    pub fn connect(cfg: SessionConfig) -> Result<Self, ClientError> {
        if cfg.hostname.is_empty() || cfg.username.is_empty() {
            return Err(ClientError::Config("hostname and username are required".into()));
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(cfg.insecure)
            .build()
            .map_err(|e| ClientError::Config(format!("building http client: {e}")))?;
        let store = if cfg.persist {
            Some(TokenStore::open_default().map_err(|e| ClientError::Config(e.to_string()))?)
        } else {
            None
        };
        let token = match &store {
            Some(s) => s
                .load(&cfg.username, &cfg.hostname)
                .map_err(|e| ClientError::Config(e.to_string()))?,
            None => None,
        };
        Ok(Self { cfg, http, token: Mutex::new(token), store })
    }

    pub fn hostname(&self) -> &str {
        &self.cfg.hostname
    }

    pub fn username(&self) -> &str {
        &self.cfg.username
    }

    fn token_url(&self) -> String {
        format!(
            "https://{}/auth/realms/{}/protocol/openid-connect/token",
            self.cfg.hostname,
            self.cfg.realm.auth_realm()
        )
    }

    fn logout_url(&self) -> String {
        format!(
            "https://{}/auth/realms/{}/protocol/openid-connect/logout",
            self.cfg.hostname,
            self.cfg.realm.auth_realm()
        )
    }

    fn current_access_token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).as_ref().map(|t| t.access_token.clone())
    }

    fn install_token(&self, resp: TokenResponse) {
        let record = TokenRecord {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at: resp.expires_in.map(|secs| chrono::Utc::now().timestamp() + secs),
        };
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.cfg.username, &self.cfg.hostname, &record) {
                warn!(error = %e, "failed to persist token");
            }
        }
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(record);
    }

    /// Run a password grant. Called automatically on the first request and
    /// after an expired token; explicit login goes through here too.
    pub async fn authorize(&self) -> Result<(), ClientError> {
        // Try a refresh grant first when we hold a refresh token.
        if self.try_refresh().await? {
            return Ok(());
        }
        let password = self.cfg.password.as_deref().ok_or_else(|| ClientError::AuthRequired {
            username: self.cfg.username.clone(),
            hostname: self.cfg.hostname.clone(),
        })?;
        let form = [
            ("grant_type", "password"),
            ("username", self.cfg.username.as_str()),
            ("password", password),
            ("client_id", self.cfg.realm.client_id()),
        ];
        let resp = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::from_transport("POST", &self.token_url(), e))?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::InvalidCredentials {
                username: self.cfg.username.clone(),
                hostname: self.cfg.hostname.clone(),
            });
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::unexpected("POST", &self.token_url(), status, &body));
        }
        let tok: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Payload(format!("token response: {e}")))?;
        debug!(user = %self.cfg.username, host = %self.cfg.hostname, "password grant ok");
        self.install_token(tok);
        Ok(())
    }

    async fn try_refresh(&self) -> Result<bool, ClientError> {
        let refresh = {
            let guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
            guard.as_ref().and_then(|t| t.refresh_token.clone())
        };
        let Some(refresh) = refresh else { return Ok(false) };
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
            ("client_id", self.cfg.realm.client_id()),
        ];
        let resp = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::from_transport("POST", &self.token_url(), e))?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "refresh grant rejected; falling back to password");
            return Ok(false);
        }
        match resp.json::<TokenResponse>().await {
            Ok(tok) => {
                debug!(user = %self.cfg.username, "refresh grant ok");
                self.install_token(tok);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Close the remote session and drop any persisted token.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let refresh = {
            let guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
            guard.as_ref().and_then(|t| t.refresh_token.clone())
        };
        if let Some(refresh) = refresh {
            let form = [
                ("refresh_token", refresh.as_str()),
                ("client_id", self.cfg.realm.client_id()),
            ];
            // Best effort; an already-expired session is fine.
            let _ = self.http.post(self.logout_url()).form(&form).send().await;
        }
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        if let Some(store) = &self.store {
            store
                .remove(&self.cfg.username, &self.cfg.hostname)
                .map_err(|e| ClientError::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Resolve an endpoint to a full URL. Paths starting with `/` are
    /// host-absolute; others live under the realm's API prefix. A subdomain
    /// addresses a deployment's own endpoint instead of the control plane.
    pub fn build_url(&self, path: &str, subdomain: Option<&str>) -> String {
        build_url(&self.cfg.hostname, self.cfg.realm.api_prefix(), path, subdomain)
    }

    /// Issue a request and decode the response: JSON when the server says
    /// JSON, text otherwise, `Null` for empty bodies.
    pub async fn request(&self, spec: RequestSpec<'_>) -> Result<Value, ClientError> {
        let url = self.build_url(spec.path, spec.subdomain);
        let started = Instant::now();
        let mut reauthorized = false;
        let mut connect_failures = 0u32;
        loop {
            if self.current_access_token().is_none() {
                self.authorize().await?;
                reauthorized = true;
            }
            let mut req = self.http.request(spec.method.clone(), url.as_str());
            if let Some(token) = self.current_access_token() {
                req = req.bearer_auth(token);
            }
            if !spec.query.is_empty() {
                req = req.query(spec.query);
            }
            if let Some(body) = spec.body {
                req = req.json(body);
            }
            if let Some(form) = spec.form {
                req = req.form(form);
            }
            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() && connect_failures < CONNECT_RETRIES => {
                    connect_failures += 1;
                    warn!(url = %url, attempt = connect_failures, "connection failed; retrying");
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                    continue;
                }
                Err(e) => return Err(ClientError::from_transport(spec.method.as_str(), &url, e)),
            };
            connect_failures = 0;

            let status = resp.status();
            if status == StatusCode::UNAUTHORIZED && !reauthorized {
                debug!(url = %url, "401; re-authenticating once");
                *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
                self.authorize().await?;
                reauthorized = true;
                continue;
            }
            metrics::counter!("client_requests_total", 1u64, "method" => spec.method.to_string());
            metrics::histogram!("client_request_ms", started.elapsed().as_secs_f64() * 1000.0);
            if status.as_u16() >= 400 {
                let body = resp.text().await.unwrap_or_default();
                return Err(ClientError::unexpected(spec.method.as_str(), &url, status, &body));
            }
            debug!(
                method = %spec.method,
                url = %url,
                status = status.as_u16(),
                took_ms = %started.elapsed().as_millis(),
                "request ok"
            );
            return decode_body(resp).await;
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request(RequestSpec::new(Method::GET, path)).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ClientError> {
        self.request(RequestSpec { query, ..RequestSpec::new(Method::GET, path) }).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        self.request(RequestSpec { body, ..RequestSpec::new(Method::POST, path) }).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(RequestSpec { body: Some(body), ..RequestSpec::new(Method::PUT, path) }).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(RequestSpec { body: Some(body), ..RequestSpec::new(Method::PATCH, path) })
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.request(RequestSpec::new(Method::DELETE, path)).await
    }

    /// Generic call surface for the `call` command: any verb, any path,
    /// optionally against a deployment subdomain.
    pub async fn call(
        &self,
        method: &str,
        path: &str,
        subdomain: Option<&str>,
    ) -> Result<Value, ClientError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ClientError::Config(format!("invalid HTTP method: {method}")))?;
        self.request(RequestSpec { subdomain, ..RequestSpec::new(method, path) }).await
    }

    /// Page through a `first`/`max` collection endpoint (identity service
    /// style), stopping at `limit` records when given.
    pub async fn get_paginated(
        &self,
        path: &str,
        limit: Option<usize>,
        extra: &[(&str, String)],
    ) -> Result<Vec<Value>, ClientError> {
        let mut records: Vec<Value> = Vec::new();
        let mut first = 0usize;
        let mut remaining = limit.unwrap_or(usize::MAX);
        loop {
            let max = PAGE_MAX.min(remaining);
            let mut query: Vec<(&str, String)> = extra.to_vec();
            query.push(("first", first.to_string()));
            query.push(("max", max.to_string()));
            let page = self.get_with_query(path, &query).await?;
            let page = match page {
                Value::Array(items) => items,
                other => {
                    return Err(ClientError::Payload(format!(
                        "expected an array page from {path}, got {other}"
                    )))
                }
            };
            let got = page.len();
            records.extend(page);
            if got < max || got == remaining {
                return Ok(records);
            }
            first += got;
            remaining -= got;
        }
    }
}

/// Full request description for [`Session::request`].
pub struct RequestSpec<'a> {
    pub method: Method,
    pub path: &'a str,
    pub subdomain: Option<&'a str>,
    pub query: &'a [(&'a str, String)],
    pub body: Option<&'a Value>,
    pub form: Option<&'a [(&'a str, &'a str)]>,
}

impl<'a> RequestSpec<'a> {
    pub fn new(method: Method, path: &'a str) -> Self {
        Self { method, path, subdomain: None, query: &[], body: None, form: None }
    }
}

fn build_url(hostname: &str, prefix: &str, path: &str, subdomain: Option<&str>) -> String {
    let sub = match subdomain {
        Some(s) => format!("{s}."),
        None => String::new(),
    };
    // Subdomain calls are always host-absolute: the deployment serves its
    // own URL space, not the control-plane API.
    if path.starts_with('/') || subdomain.is_some() {
        format!("https://{}{}/{}", sub, hostname, path.trim_start_matches('/'))
    } else {
        format!("https://{hostname}/{prefix}/{path}")
    }
}

async fn decode_body(resp: reqwest::Response) -> Result<Value, ClientError> {
    let is_json = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));
    let text = resp
        .text()
        .await
        .map_err(|e| ClientError::Payload(format!("reading response body: {e}")))?;
    if text.is_empty() {
        return Ok(Value::Null);
    }
    if is_json {
        serde_json::from_str(&text).map_err(|e| ClientError::Payload(format!("decoding json: {e}")))
    } else {
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_paths_live_under_the_realm_prefix() {
        let url = build_url("strata.example.com", "api/v2", "projects", None);
        assert_eq!(url, "https://strata.example.com/api/v2/projects");
    }

    #[test]
    fn absolute_paths_skip_the_prefix() {
        let url = build_url("strata.example.com", "api/v2", "/platform/deploy/api/v1/apps/static-endpoints", None);
        assert_eq!(url, "https://strata.example.com/platform/deploy/api/v1/apps/static-endpoints");
    }

    #[test]
    fn subdomains_address_the_deployment_itself() {
        let url = build_url("strata.example.com", "api/v2", "/", Some("app1"));
        assert_eq!(url, "https://app1.strata.example.com/");
        let url = build_url("strata.example.com", "api/v2", "test/me", Some("app1"));
        assert_eq!(url, "https://app1.strata.example.com/test/me");
    }

    #[test]
    fn connect_requires_host_and_user() {
        let cfg = SessionConfig {
            hostname: String::new(),
            username: "alice".into(),
            password: None,
            realm: Realm::User,
            persist: false,
            insecure: false,
        };
        assert!(Session::connect(cfg).is_err());
    }

    #[test]
    fn realms_differ_in_prefix_and_client() {
        assert_eq!(Realm::User.api_prefix(), "api/v2");
        assert!(Realm::Admin.api_prefix().contains("realms"));
        assert_ne!(Realm::User.client_id(), Realm::Admin.client_id());
    }
}
