//! UcxProvider - fabric interface discovery over libuct.

use fabric_types::{FabricInterfaceProvider, FabricInterfaceSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};
use ucx_uct::{Scoped, UctApi, UctLibrary, UctResult};

use crate::config::DiscoveryConfig;
use crate::device::fabric_interface;
use crate::error::{DiscoveryError, DiscoveryResult};

/// Opens a fresh library handle for each discovery call.
pub trait LibraryLoader {
    type Library: UctApi;

    fn open(&self) -> UctResult<Self::Library>;
}

/// Loads libuct with `dlopen` using the configured candidates.
#[derive(Debug, Clone, Default)]
pub struct DlopenLoader {
    config: DiscoveryConfig,
}

impl DlopenLoader {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }
}

impl LibraryLoader for DlopenLoader {
    type Library = UctLibrary;

    fn open(&self) -> UctResult<UctLibrary> {
        let lib = UctLibrary::open_first(&self.config.library_paths)?;
        debug!(library = lib.name(), "loaded UCT library");
        match &self.config.md_config_env_prefix {
            Some(prefix) => lib.with_md_config_env_prefix(prefix),
            None => Ok(lib),
        }
    }
}

/// Provides fabric interfaces harvested from UCX.
///
/// Discovery flow:
/// 1. Open libuct (fatal on failure)
/// 2. List components (fatal on failure)
/// 3. Per component: MD resource names, then the component's MD config
/// 4. Per MD resource: open the domain and list its transport devices
/// 5. Keep network devices, translating transports to `ucx+` providers
///
/// Failures in steps 3 and 4 skip only the affected component or domain.
/// Everything acquired is released in reverse order before the call returns.
#[derive(Debug, Clone, Default)]
pub struct UcxProvider<L = DlopenLoader> {
    loader: L,
}

impl UcxProvider<DlopenLoader> {
    /// Creates a provider that loads libuct per `config`.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self::with_loader(DlopenLoader::new(config))
    }
}

impl<L: LibraryLoader> UcxProvider<L> {
    /// Creates a provider over a custom library loader.
    pub fn with_loader(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Harvests the collection of fabric interfaces from UCX.
    ///
    /// Cancellation is checked before the library is opened and again once
    /// the component list is known.
    #[instrument(skip_all)]
    pub fn get_fabric_interfaces(
        &self,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<FabricInterfaceSet> {
        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        let mut lib = self.loader.open()?;
        let result = self.harvest(&lib, cancel);
        if let Err(e) = lib.close() {
            error!("error closing UCT library: {}", e);
        }

        if let Ok(fis) = &result {
            info!("discovered {} UCX fabric interfaces", fis.len());
        }
        result
    }

    fn harvest(
        &self,
        lib: &L::Library,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<FabricInterfaceSet> {
        let components = lib.components()?;
        debug!("found {} UCT components", components.len());

        let result = if cancel.is_cancelled() {
            Err(DiscoveryError::Cancelled)
        } else {
            let mut fis = FabricInterfaceSet::new();
            for comp in components.iter() {
                self.add_component_interfaces(lib, comp, &mut fis);
            }
            Ok(fis)
        };

        release_logged(components);
        result
    }

    fn add_component_interfaces(
        &self,
        lib: &L::Library,
        comp: &<L::Library as UctApi>::Component,
        fis: &mut FabricInterfaceSet,
    ) {
        let comp_name = lib.component_name(comp);

        let md_names = match lib.md_resource_names(comp) {
            Ok(names) => names,
            Err(e) => {
                error!(component = comp_name, "{}", e);
                return;
            }
        };

        let config = match lib.md_config(comp) {
            Ok(config) => config,
            Err(e) => {
                error!(component = comp_name, "{}", e);
                return;
            }
        };

        for md_name in &md_names {
            if let Err(e) = self.add_md_interfaces(lib, comp, md_name, &config, fis) {
                error!(component = comp_name, md = %md_name, "{}", e);
            }
        }

        release_logged(config);
    }

    fn add_md_interfaces(
        &self,
        lib: &L::Library,
        comp: &<L::Library as UctApi>::Component,
        md_name: &str,
        config: &<L::Library as UctApi>::MdConfig,
        fis: &mut FabricInterfaceSet,
    ) -> UctResult<()> {
        let md = lib.open_md(comp, md_name, config)?;

        let result = lib.transport_devices(&md).map(|devices| {
            for dev in &devices {
                match fabric_interface(dev) {
                    Some(fi) => {
                        debug!(md = md_name, device = %dev.device, transport = %dev.transport,
                            "adding fabric interface");
                        fis.update(fi);
                    }
                    None => {
                        trace!(md = md_name, device = %dev.device, device_type = %dev.device_type,
                            "skipping non-network device");
                    }
                }
            }
        });

        release_logged(md);
        result
    }
}

impl<L: LibraryLoader> FabricInterfaceProvider for UcxProvider<L> {
    type Error = DiscoveryError;

    fn get_fabric_interfaces(
        &self,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<FabricInterfaceSet> {
        UcxProvider::get_fabric_interfaces(self, cancel)
    }
}

/// Releases a scoped resource, logging rather than propagating failure.
fn release_logged<T>(resource: Scoped<'_, T>) {
    let what = resource.what();
    if let Err(e) = resource.release() {
        error!("error releasing {}: {}", what, e);
    }
}
