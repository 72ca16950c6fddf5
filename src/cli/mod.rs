//! Command-line front end over a single note session.
mod app;
mod args;

pub use app::*;
pub use args::*;
