//! Note-taking library with AI-suggested tags
//!
//! This library provides an ordered note store persisted to a key-value blob,
//! a tag suggestion service backed by a chat-completions provider, and the
//! session workflow that ties a draft to both.

mod blob;
mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod session;
mod storage;
mod suggest;
mod types;

// Re-export key components
pub use blob::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use session::*;
pub use storage::*;
pub use suggest::*;
pub use types::*;
