//! Cookie-backed HTTP front end for the sessile session store.
//!
//! [`SessionService`] translates the session token carried in a cookie to
//! and from a [`SessionProvider`](sessile_store::SessionProvider):
//! - `create` mints a fresh token and sets the cookie
//! - `get` resolves the cookie, clearing it if the session is gone
//! - `renew` swaps the session for a fresh id (fixation defense)
//! - `remove` invalidates the session and clears the cookie
//!
//! Configuration is loaded from TOML via [`SessileConfig`].

pub mod config;
pub mod error;
mod service;

pub use config::{
    CookieConfig, MIN_TOKEN_BYTES, SameSitePolicy, SessileConfig, StoreSection, TokenSection,
    load_config_file,
};
pub use error::{ConfigError, WebError};
pub use service::SessionService;
