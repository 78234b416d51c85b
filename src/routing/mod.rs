//! Routing Module
//!
//! Turns a URL into an ordered list of proxy candidates by way of the PAC
//! script.

pub mod parser;
pub mod resolver;
pub mod types;

pub use parser::{parse, parse_spec};
pub use resolver::Resolver;
pub use types::*;
