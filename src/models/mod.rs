//! Core data models for ankisync.

mod config;
mod entry;
mod error;
mod prompts;

pub use config::*;
pub use entry::*;
pub use error::*;
pub use prompts::*;
