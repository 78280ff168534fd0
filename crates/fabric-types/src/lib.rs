//! Fabric interface registry types.
//!
//! This crate holds the data shared between fabric interface providers and
//! their consumers:
//!
//! - [`FabricInterface`]: a device plus the providers that can drive it
//! - [`FabricInterfaceSet`]: interfaces keyed by name, merging on update
//! - [`ProviderSet`]: an ordered set of provider identifiers
//! - [`FabricInterfaceProvider`]: anything that can discover interfaces

mod interface;
mod provider_set;

pub use interface::{FabricInterface, FabricInterfaceSet};
pub use provider_set::ProviderSet;

use tokio_util::sync::CancellationToken;

/// A source of fabric interfaces.
///
/// Each call discovers from scratch; implementations keep no state between
/// calls.
pub trait FabricInterfaceProvider {
    type Error: std::error::Error;

    /// Harvests the fabric interfaces currently visible to this provider.
    fn get_fabric_interfaces(
        &self,
        cancel: &CancellationToken,
    ) -> Result<FabricInterfaceSet, Self::Error>;
}
