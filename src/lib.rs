//! Library crate for ip-probe exposing reusable modules.
pub mod error;
pub mod ping;
pub mod ports;
pub mod prompt;
pub mod resolver;
pub mod scanner;
pub mod sink;
pub mod types;
