//! Suggestion/commit protocol spoken over newline-delimited JSON.

pub mod config;
pub mod convert;
pub mod message;
mod session;

pub use crate::config::Config;
pub use crate::convert::ValidationError;
pub use crate::message::Message;
pub use crate::session::{engine_error, Control, Session};
