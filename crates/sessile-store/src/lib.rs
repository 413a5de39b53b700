//! Concurrent in-memory session registry with idle-timeout eviction.
//!
//! This crate provides the core of the sessile session store:
//! - [`Session`] records holding an id, a last-access timestamp and a
//!   key/value bag, each guarded by the record's own lock
//! - The [`SessionProvider`] trait, so alternate backends can be swapped in
//! - [`InMemoryProvider`], the in-process registry
//! - An [`Evictor`] background sweep that drops idle sessions
//! - [`generate_session_id`] for minting unpredictable identifiers
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use sessile_store::{InMemoryProvider, SessionProvider, generate_session_id};
//!
//! let provider = InMemoryProvider::new();
//! let session = provider.create(&generate_session_id());
//! session.set_value("userid", 8);
//!
//! let handle = provider.clean(Duration::from_secs(60), Duration::from_secs(1800));
//! ```

mod config;
mod error;
mod evictor;
mod memory;
mod provider;
mod session;
mod token;

pub use config::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, StoreConfig};
pub use error::{Error, Result};
pub use evictor::{Evictor, EvictorHandle};
pub use memory::InMemoryProvider;
pub use provider::SessionProvider;
pub use session::{Session, SessionSnapshot};
pub use token::{DEFAULT_TOKEN_BYTES, generate_session_id, generate_session_id_with_len};

/// Re-exported so callers can build bag values without a direct dependency.
pub use serde_json::Value;
