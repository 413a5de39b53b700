//! Cookie transport for session tokens.

use std::sync::Arc;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::Cookie;
use sessile_store::{
    EvictorHandle, Session, SessionProvider, StoreConfig, generate_session_id_with_len,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::{CookieConfig, MIN_TOKEN_BYTES, SessileConfig};
use crate::error::{Result, WebError};

/// Binds sessions in a [`SessionProvider`] to a browser cookie.
///
/// The service owns no session state itself; it is a thin adapter that
/// mints tokens, reads them from `Cookie` headers and writes `Set-Cookie`
/// headers. Cloning is cheap and shares the underlying provider.
#[derive(Clone)]
pub struct SessionService {
    provider: Arc<dyn SessionProvider>,
    cookie: CookieConfig,
    store: StoreConfig,
    token_len: usize,
}

impl SessionService {
    /// Create a service with default store and token settings.
    pub fn new(provider: Arc<dyn SessionProvider>, cookie: CookieConfig) -> Self {
        Self {
            provider,
            cookie,
            store: StoreConfig::default(),
            token_len: sessile_store::DEFAULT_TOKEN_BYTES,
        }
    }

    /// Create a service from a loaded configuration document.
    pub fn from_config(provider: Arc<dyn SessionProvider>, config: &SessileConfig) -> Self {
        Self {
            provider,
            cookie: config.cookie.clone(),
            store: config.store_config(),
            token_len: clamp_token_len(config.token.length_bytes),
        }
    }

    /// Set the number of random bytes per minted token.
    ///
    /// Lengths below [`MIN_TOKEN_BYTES`] are raised to it.
    pub fn with_token_length(mut self, len: usize) -> Self {
        self.token_len = clamp_token_len(len);
        self
    }

    /// Set the sweep interval and idle timeout used by [`init_gc`](Self::init_gc).
    pub fn with_store_config(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// The backing provider.
    pub fn provider(&self) -> &Arc<dyn SessionProvider> {
        &self.provider
    }

    /// The cookie attributes in use.
    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookie
    }

    /// Start a new session and set its cookie on the response.
    ///
    /// The cookie is built before the session is registered, so a cookie
    /// configuration that cannot be sent leaves the provider untouched.
    pub fn create(&self, response: &mut HeaderMap) -> Result<Arc<Session>> {
        let (session_id, header) = self.mint()?;
        let session = self.provider.create(&session_id);
        response.append(SET_COOKIE, header);
        Ok(session)
    }

    /// Resolve the request's session.
    ///
    /// When the cookie names a session that no longer exists, a removal
    /// cookie is added to the response so the client drops the stale token.
    pub fn get(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<Arc<Session>> {
        let token = self.require_token(request)?;

        match self.provider.get(&token) {
            Ok(session) => Ok(session),
            Err(e) => {
                debug!(cookie = %self.cookie.name, "Rejecting unknown session token");
                self.append_cookie(response, self.removal_cookie());
                Err(e.into())
            }
        }
    }

    /// Replace the request's session with a fresh one under a new token.
    ///
    /// The old session is removed and its values are not carried over.
    pub fn renew(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<Arc<Session>> {
        let token = self.require_token(request)?;
        self.provider.get(&token)?;
        let (session_id, header) = self.mint()?;

        self.provider.remove(&token);
        self.append_cookie(response, self.removal_cookie());

        let session = self.provider.create(&session_id);
        response.append(SET_COOKIE, header);
        Ok(session)
    }

    /// Invalidate the request's session and clear its cookie.
    pub fn remove(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<()> {
        let token = self.require_token(request)?;
        self.provider.remove(&token);
        self.append_cookie(response, self.removal_cookie());
        Ok(())
    }

    /// Start idle-session eviction with the configured interval and timeout.
    pub fn init_gc(&self) -> EvictorHandle {
        self.provider
            .clean(self.store.sweep_interval, self.store.idle_timeout)
    }

    /// Extract the session token from the request's `Cookie` headers.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(|parsed| parsed.ok())
            .find(|c| c.name() == self.cookie.name)
            .map(|c| c.value().to_string())
    }

    fn require_token(&self, request: &HeaderMap) -> Result<String> {
        self.token_from_headers(request)
            .ok_or_else(|| WebError::MissingCookie(self.cookie.name.clone()))
    }

    /// Generate a fresh token and its `Set-Cookie` value.
    fn mint(&self) -> Result<(String, HeaderValue)> {
        self.cookie
            .validate()
            .map_err(|e| WebError::InvalidCookie(e.to_string()))?;

        let session_id = generate_session_id_with_len(self.token_len);
        let cookie = self.session_cookie(session_id.clone());
        let header = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| WebError::InvalidCookie(e.to_string()))?;
        Ok((session_id, header))
    }

    fn session_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie.name.clone(), value))
            .path(self.cookie.path.clone())
            .http_only(self.cookie.http_only)
            .secure(self.cookie.secure)
            .same_site(self.cookie.same_site.into())
            .build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie.name.clone(), String::new()))
            .path(self.cookie.path.clone())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    fn append_cookie(&self, response: &mut HeaderMap, cookie: Cookie<'static>) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, cookie = %self.cookie.name, "Cookie is not a valid header value"),
        }
    }
}

fn clamp_token_len(len: usize) -> usize {
    if len < MIN_TOKEN_BYTES {
        warn!(len, min = MIN_TOKEN_BYTES, "Token length too short, clamping");
        MIN_TOKEN_BYTES
    } else {
        len
    }
}
