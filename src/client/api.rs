//! Authenticated API client.
//!
//! Every call carries the stored access token. A 401 triggers one refresh
//! through the HttpOnly refresh cookie and one retry; a refused refresh clears
//! the session and sends the user back to the login page. Concurrent callers
//! that hit 401 with the same stale token share a single refresh.

use std::sync::Arc;

use axum_extra::extract::cookie::Cookie;
use reqwest::{
    cookie::CookieStore,
    header::HeaderValue,
    Client, Method, Response, StatusCode, Url,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    api_error::{detail_message, ApiClientError},
    request::{ApiRequest, MultipartPart},
    session_store::SessionStore,
};
use crate::{config::client::ClientConfig, dto::response::UserResponse, utils::cookie::REFRESH_COOKIE};

/// Where the user is sent once the session cannot be renewed.
pub trait LoginRedirect: Send + Sync {
    fn redirect(&self, login_path: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect(&self, login_path: &str) {
        warn!("Session expired, redirecting to {}", login_path);
    }
}

/// Lifecycle of one logical request. `UnauthorizedRetrying` is entered at
/// most once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAttempt {
    Initial,
    Sent,
    UnauthorizedRetrying,
    Refreshed,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    Send,
    Response(StatusCode),
    TransportFailed,
    RefreshSucceeded,
    RefreshFailed,
}

#[derive(Debug, Clone)]
pub struct Attempt {
    state: RequestAttempt,
    attempted_refresh: bool,
}

impl Default for Attempt {
    fn default() -> Self {
        Self {
            state: RequestAttempt::Initial,
            attempted_refresh: false,
        }
    }
}

impl Attempt {
    pub fn state(&self) -> RequestAttempt {
        self.state
    }

    pub fn attempted_refresh(&self) -> bool {
        self.attempted_refresh
    }

    /// Applies an event; events that do not fit the current state fail the attempt.
    pub fn advance(&mut self, event: AttemptEvent) -> RequestAttempt {
        use AttemptEvent as E;
        use RequestAttempt as S;

        self.state = match (self.state, event) {
            (S::Initial | S::Refreshed, E::Send) => S::Sent,
            (S::Sent, E::Response(StatusCode::UNAUTHORIZED)) if !self.attempted_refresh => {
                self.attempted_refresh = true;
                S::UnauthorizedRetrying
            }
            (S::Sent, E::Response(StatusCode::UNAUTHORIZED)) => S::Failed,
            (S::Sent, E::Response(_)) => S::Succeeded,
            (S::UnauthorizedRetrying, E::RefreshSucceeded) => S::Refreshed,
            _ => S::Failed,
        };
        self.state
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenBody {
    access_token: String,
}

/// Cookie jar for `reqwest` that keeps the refresh cookie in the session
/// store, and only for the API host.
struct StoreCookieJar {
    host: Option<String>,
    store: Arc<dyn SessionStore>,
}

impl StoreCookieJar {
    fn same_host(&self, url: &Url) -> bool {
        self.host.as_deref() == url.host_str()
    }
}

impl CookieStore for StoreCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        if !self.same_host(url) {
            return;
        }
        for header in cookie_headers {
            let Some(cookie) = header
                .to_str()
                .ok()
                .and_then(|raw| Cookie::parse(raw.to_string()).ok())
            else {
                continue;
            };
            if cookie.name() != REFRESH_COOKIE {
                continue;
            }
            let removed = cookie.value().is_empty()
                || cookie
                    .max_age()
                    .is_some_and(|age| age.is_zero() || age.is_negative());
            let value = (!removed).then(|| cookie.value().to_string());
            if let Err(e) = self.store.set_refresh_cookie(value.as_deref()) {
                warn!("Failed to persist refresh cookie: {}", e);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        if !self.same_host(url) {
            return None;
        }
        let value = self.store.refresh_cookie()?;
        HeaderValue::from_str(&format!("{REFRESH_COOKIE}={value}")).ok()
    }
}

#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    login_path: String,
    store: Arc<dyn SessionStore>,
    redirect: Arc<dyn LoginRedirect>,
    refresh_gate: Arc<Mutex<()>>,
}

impl AuthClient {
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ApiClientError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ApiClientError::Config(format!("API base url {}: {e}", config.base_url)))?;
        let jar = Arc::new(StoreCookieJar {
            host: base.host_str().map(str::to_string),
            store: store.clone(),
        });
        let http = Client::builder()
            .cookie_provider(jar)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            store,
            redirect: Arc::new(LogRedirect),
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn with_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<Response, ApiClientError> {
        let builder = request.build(&self.http, &self.base_url, bearer)?;
        Ok(builder.send().await?)
    }

    /// Sends `request` with the stored token. Non-401 responses are returned
    /// as they are, whatever their status.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiClientError> {
        let mut attempt = Attempt::default();
        let mut token = self.store.access_token();

        loop {
            attempt.advance(AttemptEvent::Send);
            let response = match self.dispatch(request, token.as_deref()).await {
                Ok(response) => response,
                Err(e) => {
                    attempt.advance(AttemptEvent::TransportFailed);
                    return Err(e);
                }
            };

            match attempt.advance(AttemptEvent::Response(response.status())) {
                RequestAttempt::Succeeded => return Ok(response),
                RequestAttempt::UnauthorizedRetrying => {
                    debug!("{} {} got 401, refreshing", request.method, request.path);
                    match self.refresh_after(token.as_deref()).await {
                        Ok(fresh) => {
                            attempt.advance(AttemptEvent::RefreshSucceeded);
                            token = Some(fresh);
                        }
                        Err(e) => {
                            attempt.advance(AttemptEvent::RefreshFailed);
                            return Err(e);
                        }
                    }
                }
                _ => {
                    warn!(
                        "{} {} still unauthorized after refresh",
                        request.method, request.path
                    );
                    return Err(ApiClientError::Unauthorized);
                }
            }
        }
    }

    /// Single-flight refresh. `stale` is the token the failed call used; if
    /// another caller already replaced it, the new one is reused.
    async fn refresh_after(&self, stale: Option<&str>) -> Result<String, ApiClientError> {
        let _gate = self.refresh_gate.lock().await;
        let current = self.store.access_token();

        match (stale, current) {
            (Some(_), None) => Err(ApiClientError::SessionExpired),
            (stale, Some(current)) if stale != Some(current.as_str()) => Ok(current),
            _ => self.refresh_locked().await,
        }
    }

    async fn refresh_locked(&self) -> Result<String, ApiClientError> {
        match self.request_refresh().await {
            Ok(token) => {
                self.store.set_access_token(&token)?;
                info!("Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                warn!("Refresh failed: {}", e);
                self.store.clear()?;
                self.redirect.redirect(&self.login_path);
                Err(ApiClientError::SessionExpired)
            }
        }
    }

    async fn request_refresh(&self) -> Result<String, ApiClientError> {
        let response = self.dispatch(&ApiRequest::post("/refresh"), None).await?;
        let body: AccessTokenBody = decode(check(response).await?).await?;
        Ok(body.access_token)
    }

    /// `POST /token`, then `GET /users/me` to learn the role.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserResponse, ApiClientError> {
        let request =
            ApiRequest::post("/token").form([("username", username), ("password", password)]);
        let response = check(self.dispatch(&request, None).await?).await?;
        let body: AccessTokenBody = decode(response).await?;
        self.store.set_access_token(&body.access_token)?;

        let me = self.me().await?;
        self.store.set_role(me.role.as_str())?;
        info!("Logged in as {}", me.username);
        Ok(me)
    }

    /// Revokes the server session and clears local credentials, even when
    /// the server cannot be reached.
    pub async fn logout(&self) -> Result<(), ApiClientError> {
        let result = self.dispatch(&ApiRequest::post("/logout"), None).await;
        self.store.clear()?;
        check(result?).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<UserResponse, ApiClientError> {
        self.get_json("/users/me", &[]).await
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiClientError> {
        decode(check(self.send(request).await?).await?).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiClientError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |r, (k, v)| r.query(*k, *v));
        self.fetch(&request).await
    }

    pub async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiClientError> {
        let request = ApiRequest::new(method, path)
            .json(body)
            .map_err(|e| ApiClientError::Decode(e.to_string()))?;
        self.fetch(&request).await
    }

    pub async fn send_form<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<T, ApiClientError> {
        let request = ApiRequest::new(method, path).form(fields.iter().copied());
        self.fetch(&request).await
    }

    pub async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        parts: Vec<MultipartPart>,
    ) -> Result<T, ApiClientError> {
        self.fetch(&ApiRequest::new(method, path).multipart(parts)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiClientError> {
        check(self.send(&ApiRequest::new(Method::DELETE, path)).await?).await?;
        Ok(())
    }
}

/// Turns a non-2xx response into [`ApiClientError::Status`].
async fn check(response: Response) -> Result<Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = detail_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(ApiClientError::Status { status, message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiClientError::Decode(e.to_string()))
}
