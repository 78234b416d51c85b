//! PAC Resolver Library
//!
//! Decides which proxy a client should use for a URL by running a PAC
//! (proxy auto-config) script's `FindProxyForURL(url, host)` and parsing
//! its answer into an ordered list of proxy candidates.
//!
//! The pipeline is [`source::ScriptSource`] (fetch and cache the script),
//! [`engine::ScriptEngine`] (evaluate it with the [`predicates`] bound),
//! [`routing::parser`] (read the answer) and [`Resolver`] (the facade).

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod predicates;
pub mod routing;
pub mod source;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::PacError;
pub use routing::{ProxyCandidate, ProxyEndpoint, ResolutionRequest, Resolver, Selection};
pub use source::ScriptSource;

/// Common error type for configuration and start-up
pub type Result<T> = anyhow::Result<T>;
