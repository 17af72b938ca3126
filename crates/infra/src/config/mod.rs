//! Configuration loading and management
//!
//! This module loads [`ClientConfig`](outcall_domain::ClientConfig) from
//! environment variables and files, and turns the plain settings into the
//! runtime retry and cache settings.

pub mod loader;
pub mod policy;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
pub use policy::{cache_settings, describe_retry, retry_config};
