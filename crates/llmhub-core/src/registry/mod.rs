//! Provider registry and lifecycle management
//!
//! Owns strategy registration, configuration binding, active-provider
//! selection and lazy single-flight initialization.

mod manager;

pub use manager::ProviderRegistry;
