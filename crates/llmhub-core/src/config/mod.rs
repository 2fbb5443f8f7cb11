//! Provider configuration sources
//!
//! Supports multiple configuration sources:
//! - `MemoryConfigSource`: In-memory for testing
//! - `FileConfigSource`: YAML file-based (user/workspace level)

mod traits;
mod document;
mod memory;
mod file;

pub use traits::{ConfigSource, ConfigError, ConfigResult};
pub use document::{DefaultSettings, ProvidersFile};
pub use memory::MemoryConfigSource;
pub use file::{FileConfigSource, ConfigLevel};
