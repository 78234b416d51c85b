//! Script Source Module
//!
//! Acquires the PAC script from a file or over HTTP and caches it.

pub mod fetch;
pub mod script;
pub mod types;
pub mod watcher;

pub use script::ScriptSource;
pub use types::{CachedScript, ScriptLocation};
pub use watcher::ScriptWatcher;
