//! Selection of network transport devices.

use fabric_types::FabricInterface;
use ucx_uct::TransportDevice;

use crate::transport::provider_set;

/// Returns the OS device name for a UCT device identifier.
///
/// UCT names InfiniBand ports `<device>:<port>`; the OS only knows the part
/// before the colon.
pub fn os_device_name(device: &str) -> &str {
    device.split(':').next().unwrap_or(device)
}

/// Converts a transport device to a fabric interface, or `None` if the
/// device is not a network device.
pub fn fabric_interface(dev: &TransportDevice) -> Option<FabricInterface> {
    if !dev.is_network() {
        return None;
    }
    Some(FabricInterface::new(
        dev.device.as_str(),
        os_device_name(&dev.device),
        provider_set(&dev.transport),
    ))
}
