//! # ucx-fabric - UCX Fabric Interface Discovery
//!
//! Discovers the network devices UCX can drive and reports each one with the
//! `ucx+` providers that select it.
//!
//! ## Responsibilities
//! - Loading libuct at runtime and walking its component hierarchy
//! - Keeping only network transport devices
//! - Translating UCT transport names to UCX transport aliases
//!
//! ## Key Features
//! - Only a missing library or an unreadable component list fails a call
//! - Every per-component and per-domain failure is logged and skipped
//! - Each call discovers from scratch on its own library handle

pub mod config;
pub mod device;
pub mod error;
mod provider;
pub mod transport;

pub use config::DiscoveryConfig;
pub use device::os_device_name;
pub use error::{DiscoveryError, DiscoveryResult};
pub use provider::{DlopenLoader, LibraryLoader, UcxProvider};
pub use transport::{provider_id, provider_set};
