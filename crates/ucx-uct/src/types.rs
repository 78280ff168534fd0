//! Typed views of the objects the UCT resource hierarchy hands out.

use std::ffi::c_char;
use std::fmt;

use crate::ffi;

/// Kind of device a transport runs over (`uct_device_type_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Network device (InfiniBand, RoCE, TCP).
    Net,
    /// Shared memory.
    Shm,
    /// Accelerator memory (GPU).
    Acc,
    /// Loopback to the local process.
    SelfLoop,
    /// A type this binding does not know.
    Unknown(u32),
}

impl DeviceType {
    /// Maps a raw `uct_device_type_t` value.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            ffi::UCT_DEVICE_TYPE_NET => DeviceType::Net,
            ffi::UCT_DEVICE_TYPE_SHM => DeviceType::Shm,
            ffi::UCT_DEVICE_TYPE_ACC => DeviceType::Acc,
            ffi::UCT_DEVICE_TYPE_SELF => DeviceType::SelfLoop,
            other => DeviceType::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Net => write!(f, "net"),
            DeviceType::Shm => write!(f, "shm"),
            DeviceType::Acc => write!(f, "acc"),
            DeviceType::SelfLoop => write!(f, "self"),
            DeviceType::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

/// A transport resource reported by an open memory domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportDevice {
    /// Device identifier, `<iface>[:<port>]` (e.g. `mlx5_0:1`).
    pub device: String,
    /// Transport alias, `<base>[_<modifier>...]` (e.g. `rc_mlx5`).
    pub transport: String,
    pub device_type: DeviceType,
}

impl TransportDevice {
    pub fn new(
        device: impl Into<String>,
        transport: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            device: device.into(),
            transport: transport.into(),
            device_type,
        }
    }

    /// Returns true if the transport runs over a network device.
    pub fn is_network(&self) -> bool {
        self.device_type == DeviceType::Net
    }

    pub(crate) fn from_raw(desc: &ffi::uct_tl_resource_desc_t) -> Self {
        Self {
            device: fixed_cstr(&desc.dev_name),
            transport: fixed_cstr(&desc.tl_name),
            device_type: DeviceType::from_raw(desc.dev_type),
        }
    }
}

/// A UCT component (`uct_component_h`) and its name.
#[derive(Debug)]
pub struct Component {
    name: String,
    pub(crate) raw: ffi::uct_component_h,
}

impl Component {
    pub(crate) fn new(name: String, raw: ffi::uct_component_h) -> Self {
        Self { name, raw }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Memory domain configuration read for one component.
#[derive(Debug)]
pub struct MdConfig {
    pub(crate) raw: *mut ffi::uct_md_config_t,
}

/// An open memory domain (`uct_md_h`).
#[derive(Debug)]
pub struct MemoryDomain {
    name: String,
    pub(crate) raw: ffi::uct_md_h,
}

impl MemoryDomain {
    pub(crate) fn new(name: String, raw: ffi::uct_md_h) -> Self {
        Self { name, raw }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Reads a fixed-size C character array that may lack a terminator.
pub(crate) fn fixed_cstr(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
