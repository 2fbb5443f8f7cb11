//! Logging abstractions
//!
//! Library code never writes to a global logger. Every component that logs
//! receives an `Arc<dyn Logger>`, so the host decides where lines go.

mod traits;
mod level;
mod sinks;
mod memory;

pub use traits::Logger;
pub use level::LogLevel;
pub use sinks::{ConsoleLogger, NoOpLogger, TracingLogger};
pub use memory::{LogEntry, MemoryLogger};
