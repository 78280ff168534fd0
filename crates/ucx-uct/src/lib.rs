//! Safe Rust bindings for the UCX transport layer (UCT).
//!
//! libuct is loaded at runtime with `dlopen`, so hosts without UCX can still
//! run the binary. Every entry point is resolved as a function pointer when
//! it is first needed.
//!
//! # Architecture
//!
//! - [`error`]: `ucs_status_t` mapping and loader errors
//! - [`types`]: components, memory domains and transport devices
//! - [`scope`]: [`Scoped`] release guards for everything that must be freed
//! - [`api`]: the [`UctApi`] hierarchy walk, implemented by [`UctLibrary`]
//!
//! # Example
//!
//! ```ignore
//! use ucx_uct::{UctApi, UctLibrary, UctResult};
//!
//! fn print_devices(lib: &UctLibrary) -> UctResult<()> {
//!     for comp in lib.components()?.iter() {
//!         let cfg = lib.md_config(comp)?;
//!         for md_name in lib.md_resource_names(comp)? {
//!             let md = lib.open_md(comp, &md_name, &cfg)?;
//!             for dev in lib.transport_devices(&md)? {
//!                 println!("{} {}", dev.transport, dev.device);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod ffi;
mod library;
pub mod scope;
pub mod types;

pub use api::UctApi;
pub use error::{UcsStatus, UctError, UctResult};
pub use library::UctLibrary;
pub use scope::Scoped;
pub use types::{Component, DeviceType, MdConfig, MemoryDomain, TransportDevice};
