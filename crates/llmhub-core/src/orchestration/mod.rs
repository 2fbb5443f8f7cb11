//! Orchestration layer
//!
//! [`OrchestrationService`] is the only surface callers need: it resolves the
//! provider named by each request through the registry, validates the request
//! against the provider's configuration and dispatches it. Streams are
//! wrapped so they always end with exactly one final chunk.

mod presets;
mod service;
mod stream;

pub use presets::{
    ChangeSummary, ContrastPair, PaletteContrast, Preset, SecurityReport, Severity, Vulnerability,
};
pub use service::OrchestrationService;
pub use stream::ChunkStream;
