//! The resource-hierarchy walk as a trait.
//!
//! [`UctApi`] is the seam between discovery logic and the native library.
//! [`UctLibrary`](crate::UctLibrary) implements it over libuct; tests
//! implement it over in-memory fixtures.

use crate::error::UctResult;
use crate::scope::Scoped;
use crate::types::TransportDevice;

/// Enumeration of the UCT hierarchy:
/// components → MD resource names → MD config → open MD → transport devices.
///
/// Operations that acquire something return it inside a [`Scoped`] guard
/// that borrows `self`, so the handle cannot be closed while any of them are
/// alive. A failed call acquires nothing and returns no guard.
pub trait UctApi {
    type Component;
    type MdConfig;
    type MemoryDomain;

    /// Lists the components available in the library.
    fn components(&self) -> UctResult<Scoped<'_, Vec<Self::Component>>>;

    /// Returns a human-readable name for a component, for diagnostics.
    fn component_name<'c>(&self, component: &'c Self::Component) -> &'c str;

    /// Lists the memory domain resources a component provides.
    fn md_resource_names(&self, component: &Self::Component) -> UctResult<Vec<String>>;

    /// Reads the memory domain configuration for a component.
    fn md_config(&self, component: &Self::Component) -> UctResult<Scoped<'_, Self::MdConfig>>;

    /// Opens the named memory domain.
    fn open_md(
        &self,
        component: &Self::Component,
        md_name: &str,
        config: &Self::MdConfig,
    ) -> UctResult<Scoped<'_, Self::MemoryDomain>>;

    /// Lists the transport resources of an open memory domain.
    fn transport_devices(&self, md: &Self::MemoryDomain) -> UctResult<Vec<TransportDevice>>;

    /// Closes the library handle. Calling it again is a no-op.
    fn close(&mut self) -> UctResult<()>;
}
