//! The runtime-loaded libuct handle.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::ffi::c_void;
use std::ffi::{c_uint, CString};
use std::ptr;
use std::slice;

use libloading::Library;
use log::{debug, error};

use crate::api::UctApi;
use crate::error::{UcsStatusExt, UctError, UctResult};
use crate::ffi;
use crate::scope::Scoped;
use crate::types::{fixed_cstr, Component, MdConfig, MemoryDomain, TransportDevice};

/// An open handle to libuct.
///
/// Symbols are resolved on each call, so a library missing an optional
/// entry point only fails the operations that need it. The handle is closed
/// by [`UctLibrary::close`] or on drop, whichever comes first.
pub struct UctLibrary {
    name: String,
    handle: Option<Handle>,
    md_config_env_prefix: Option<CString>,
}

/// Where entry points are resolved from.
enum Handle {
    Loaded(Library),
    /// Entry points supplied in-process, keyed by symbol name.
    #[cfg(test)]
    Table(HashMap<&'static str, *const c_void>),
}

impl UctLibrary {
    /// Loads the library named or located at `library`.
    pub fn open(library: &str) -> UctResult<Self> {
        // Safety: libuct's load-time constructors only register its
        // components and have no preconditions on the caller.
        let lib = unsafe { Library::new(library) }.map_err(|e| UctError::open(library, e))?;
        debug!("opened {}", library);
        Ok(Self {
            name: library.to_string(),
            handle: Some(Handle::Loaded(lib)),
            md_config_env_prefix: None,
        })
    }

    /// Builds a handle whose entry points are the given in-process functions.
    #[cfg(test)]
    pub(crate) fn from_symbols(
        name: &str,
        symbols: impl IntoIterator<Item = (&'static str, *const c_void)>,
    ) -> Self {
        Self {
            name: name.to_string(),
            handle: Some(Handle::Table(symbols.into_iter().collect())),
            md_config_env_prefix: None,
        }
    }

    /// Loads the first of `candidates` that can be opened.
    pub fn open_first<S: AsRef<str>>(candidates: &[S]) -> UctResult<Self> {
        let mut last_err = None;
        for candidate in candidates {
            match Self::open(candidate.as_ref()) {
                Ok(lib) => return Ok(lib),
                Err(e) => {
                    debug!("{}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| UctError::open("libuct", "no library candidates given")))
    }

    /// Sets the environment prefix passed to `uct_md_config_read`.
    pub fn with_md_config_env_prefix(mut self, prefix: &str) -> UctResult<Self> {
        let prefix = CString::new(prefix).map_err(|e| UctError::InvalidString {
            value: prefix.to_string(),
            message: e.to_string(),
        })?;
        self.md_config_env_prefix = Some(prefix);
        Ok(self)
    }

    /// The name the library was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unloads the library. Later calls return `Ok(())`.
    pub fn close(&mut self) -> UctResult<()> {
        match self.handle.take() {
            Some(Handle::Loaded(lib)) => {
                debug!("closing {}", self.name);
                lib.close().map_err(|e| UctError::Close {
                    library: self.name.clone(),
                    message: e.to_string(),
                })
            }
            #[cfg(test)]
            Some(Handle::Table(_)) => Ok(()),
            None => Ok(()),
        }
    }

    fn symbol<T: Copy>(&self, name: &'static str) -> UctResult<T> {
        match self.handle.as_ref().ok_or(UctError::Closed)? {
            Handle::Loaded(lib) => {
                // Safety: callers request each symbol with the prototype
                // declared for it in `ffi`.
                let sym = unsafe { lib.get::<T>(name.as_bytes()) }
                    .map_err(|e| UctError::symbol(name, e))?;
                Ok(*sym)
            }
            #[cfg(test)]
            Handle::Table(table) => {
                let addr = table
                    .get(name)
                    .copied()
                    .ok_or_else(|| UctError::symbol(name, "not in symbol table"))?;
                assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*const c_void>());
                // Safety: the table maps each name to a function with the
                // prototype declared for it in `ffi`.
                Ok(unsafe { std::mem::transmute_copy::<*const c_void, T>(&addr) })
            }
        }
    }

    fn release_component_list(&self, list: *mut ffi::uct_component_h) -> UctResult<()> {
        let release: ffi::UctReleaseComponentListFn = self.symbol("uct_release_component_list")?;
        // Safety: `list` came from uct_query_components and is released once.
        unsafe { release(list) };
        Ok(())
    }

    fn release_md_config(&self, config: MdConfig) -> UctResult<()> {
        let release: ffi::UctConfigReleaseFn = self.symbol("uct_config_release")?;
        // Safety: the config came from uct_md_config_read and is released once.
        unsafe { release(config.raw) };
        Ok(())
    }

    fn close_md(&self, md: MemoryDomain) -> UctResult<()> {
        let close: ffi::UctMdCloseFn = self.symbol("uct_md_close")?;
        debug!("closing memory domain {}", md.name());
        // Safety: the domain came from uct_md_open and is closed once.
        unsafe { close(md.raw) };
        Ok(())
    }
}

impl UctApi for UctLibrary {
    type Component = Component;
    type MdConfig = MdConfig;
    type MemoryDomain = MemoryDomain;

    fn components(&self) -> UctResult<Scoped<'_, Vec<Component>>> {
        let query_components: ffi::UctQueryComponentsFn = self.symbol("uct_query_components")?;
        let component_query: ffi::UctComponentQueryFn = self.symbol("uct_component_query")?;

        let mut list: *mut ffi::uct_component_h = ptr::null_mut();
        let mut count: c_uint = 0;
        // Safety: both out-pointers are valid for writes.
        unsafe { query_components(&mut list, &mut count) }.to_result("uct_query_components")?;

        let list = Scoped::new("UCT component list", list, move |list| {
            self.release_component_list(list)
        });
        list.try_map(|&raw_list| {
            if raw_list.is_null() || count == 0 {
                return Ok(Vec::new());
            }
            // Safety: libuct returned `count` component handles at `raw_list`.
            let handles = unsafe { slice::from_raw_parts(raw_list, count as usize) };
            handles
                .iter()
                .map(|&handle| -> UctResult<Component> {
                    let mut attr = ffi::uct_component_attr_t {
                        field_mask: ffi::UCT_COMPONENT_ATTR_FIELD_NAME,
                        ..Default::default()
                    };
                    // Safety: `handle` is a live component and `attr` is writable.
                    unsafe { component_query(handle, &mut attr) }
                        .to_result("uct_component_query")?;
                    Ok(Component::new(fixed_cstr(&attr.name), handle))
                })
                .collect()
        })
    }

    fn component_name<'c>(&self, component: &'c Component) -> &'c str {
        component.name()
    }

    fn md_resource_names(&self, component: &Component) -> UctResult<Vec<String>> {
        let component_query: ffi::UctComponentQueryFn = self.symbol("uct_component_query")?;

        let mut attr = ffi::uct_component_attr_t {
            field_mask: ffi::UCT_COMPONENT_ATTR_FIELD_MD_RESOURCE_COUNT,
            ..Default::default()
        };
        // Safety: the component handle is live and `attr` is writable.
        unsafe { component_query(component.raw, &mut attr) }.to_result("uct_component_query")?;

        let count = attr.md_resource_count as usize;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut resources = vec![
            ffi::uct_md_resource_desc_t {
                md_name: [0; ffi::UCT_MD_NAME_MAX],
            };
            count
        ];
        attr.field_mask = ffi::UCT_COMPONENT_ATTR_FIELD_MD_RESOURCES;
        attr.md_resources = resources.as_mut_ptr();
        // Safety: `md_resources` has room for the count libuct just reported.
        unsafe { component_query(component.raw, &mut attr) }.to_result("uct_component_query")?;

        Ok(resources.iter().map(|r| fixed_cstr(&r.md_name)).collect())
    }

    fn md_config(&self, component: &Component) -> UctResult<Scoped<'_, MdConfig>> {
        let config_read: ffi::UctMdConfigReadFn = self.symbol("uct_md_config_read")?;

        let env_prefix = self
            .md_config_env_prefix
            .as_ref()
            .map_or(ptr::null(), |p| p.as_ptr());
        let mut raw = ptr::null_mut();
        // Safety: the component handle is live, the prefix is null or a valid
        // C string, and `raw` is writable.
        unsafe { config_read(component.raw, env_prefix, ptr::null(), &mut raw) }
            .to_result("uct_md_config_read")?;

        Ok(Scoped::new("UCT MD config", MdConfig { raw }, move |config| {
            self.release_md_config(config)
        }))
    }

    fn open_md(
        &self,
        component: &Component,
        md_name: &str,
        config: &MdConfig,
    ) -> UctResult<Scoped<'_, MemoryDomain>> {
        let md_open: ffi::UctMdOpenFn = self.symbol("uct_md_open")?;

        let c_name = CString::new(md_name).map_err(|e| UctError::InvalidString {
            value: md_name.to_string(),
            message: e.to_string(),
        })?;
        let mut raw = ptr::null_mut();
        // Safety: component and config are live, the name is a valid C string.
        unsafe { md_open(component.raw, c_name.as_ptr(), config.raw, &mut raw) }
            .to_result("uct_md_open")?;

        Ok(Scoped::new(
            "UCT memory domain",
            MemoryDomain::new(md_name.to_string(), raw),
            move |md| self.close_md(md),
        ))
    }

    fn transport_devices(&self, md: &MemoryDomain) -> UctResult<Vec<TransportDevice>> {
        let query: ffi::UctMdQueryTlResourcesFn = self.symbol("uct_md_query_tl_resources")?;
        let release: ffi::UctReleaseTlResourceListFn =
            self.symbol("uct_release_tl_resource_list")?;

        let mut resources: *mut ffi::uct_tl_resource_desc_t = ptr::null_mut();
        let mut count: c_uint = 0;
        // Safety: the domain is open and both out-pointers are writable.
        unsafe { query(md.raw, &mut resources, &mut count) }
            .to_result("uct_md_query_tl_resources")?;

        if resources.is_null() {
            return Ok(Vec::new());
        }
        // Safety: libuct returned `count` descriptors at `resources`.
        let devices = unsafe { slice::from_raw_parts(resources, count as usize) }
            .iter()
            .map(TransportDevice::from_raw)
            .collect();
        // Safety: the list came from uct_md_query_tl_resources and is not
        // referenced past this point.
        unsafe { release(resources) };

        Ok(devices)
    }

    fn close(&mut self) -> UctResult<()> {
        UctLibrary::close(self)
    }
}

impl Drop for UctLibrary {
    fn drop(&mut self) {
        if let Err(e) = UctLibrary::close(self) {
            error!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UcsStatus;
    use crate::types::DeviceType;
    use std::cell::RefCell;
    use std::ffi::{c_char, CStr};

    /// Components the fake library reports, with their MD resources.
    const COMPONENTS: [(&str, &[&str]); 2] = [("ib", &["mlx5_0", "mlx5_1"]), ("tcp", &["tcp"])];

    /// Transport resources per memory domain.
    const MD_DEVICES: [(&str, [(&str, &str, c_uint); 2]); 3] = [
        (
            "mlx5_0",
            [
                ("rc_mlx5", "mlx5_0:1", ffi::UCT_DEVICE_TYPE_NET),
                ("ud_verbs", "mlx5_0:1", ffi::UCT_DEVICE_TYPE_NET),
            ],
        ),
        (
            "mlx5_1",
            [
                ("dc_mlx5", "mlx5_1:1", ffi::UCT_DEVICE_TYPE_NET),
                ("cuda_ipc", "cuda", ffi::UCT_DEVICE_TYPE_ACC),
            ],
        ),
        (
            "tcp",
            [
                ("tcp", "eth0", ffi::UCT_DEVICE_TYPE_NET),
                ("tcp", "lo", ffi::UCT_DEVICE_TYPE_NET),
            ],
        ),
    ];

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Calls {
        component_list_releases: u32,
        config_reads: u32,
        config_releases: u32,
        md_opens: u32,
        md_closes: u32,
        tl_lists: u32,
        tl_list_releases: u32,
        env_prefixes: Vec<Option<String>>,
    }

    thread_local! {
        static CALLS: RefCell<Calls> = RefCell::new(Calls::default());
    }

    fn record(f: impl FnOnce(&mut Calls)) {
        CALLS.with(|c| f(&mut c.borrow_mut()));
    }

    fn calls() -> Calls {
        CALLS.with(|c| c.borrow().clone())
    }

    fn fill<const N: usize>(buf: &mut [c_char; N], s: &str) {
        for (dst, src) in buf.iter_mut().zip(s.bytes()) {
            *dst = src as c_char;
        }
    }

    fn tl_desc(tl: &str, dev: &str, dev_type: c_uint) -> ffi::uct_tl_resource_desc_t {
        let mut desc = ffi::uct_tl_resource_desc_t {
            tl_name: [0; ffi::UCT_TL_NAME_MAX],
            dev_name: [0; ffi::UCT_DEVICE_NAME_MAX],
            dev_type,
            sys_device: 0,
        };
        fill(&mut desc.tl_name, tl);
        fill(&mut desc.dev_name, dev);
        desc
    }

    fn fake_component(
        handle: ffi::uct_component_h,
    ) -> Option<(&'static str, &'static [&'static str])> {
        COMPONENTS.get((handle as usize).wrapping_sub(1)).copied()
    }

    unsafe extern "C" fn fake_query_components(
        components_p: *mut *mut ffi::uct_component_h,
        num_p: *mut c_uint,
    ) -> ffi::ucs_status_t {
        let handles: Box<[ffi::uct_component_h; 2]> =
            Box::new([1usize as ffi::uct_component_h, 2usize as ffi::uct_component_h]);
        *components_p = Box::into_raw(handles) as *mut ffi::uct_component_h;
        *num_p = 2;
        0
    }

    unsafe extern "C" fn fake_release_component_list(components: *mut ffi::uct_component_h) {
        drop(Box::from_raw(components as *mut [ffi::uct_component_h; 2]));
        record(|c| c.component_list_releases += 1);
    }

    unsafe extern "C" fn fake_component_query(
        component: ffi::uct_component_h,
        attr: *mut ffi::uct_component_attr_t,
    ) -> ffi::ucs_status_t {
        let Some((name, mds)) = fake_component(component) else {
            return UcsStatus::InvalidParam as i32;
        };
        let attr = &mut *attr;
        if attr.field_mask & ffi::UCT_COMPONENT_ATTR_FIELD_NAME != 0 {
            fill(&mut attr.name, name);
        }
        if attr.field_mask & ffi::UCT_COMPONENT_ATTR_FIELD_MD_RESOURCE_COUNT != 0 {
            attr.md_resource_count = mds.len() as c_uint;
        }
        if attr.field_mask & ffi::UCT_COMPONENT_ATTR_FIELD_MD_RESOURCES != 0 {
            let out = slice::from_raw_parts_mut(attr.md_resources, mds.len());
            for (desc, md) in out.iter_mut().zip(mds) {
                fill(&mut desc.md_name, md);
            }
        }
        0
    }

    unsafe extern "C" fn fake_md_config_read(
        component: ffi::uct_component_h,
        env_prefix: *const c_char,
        _filename: *const c_char,
        md_config_p: *mut *mut ffi::uct_md_config_t,
    ) -> ffi::ucs_status_t {
        let prefix = (!env_prefix.is_null())
            .then(|| CStr::from_ptr(env_prefix).to_string_lossy().into_owned());
        *md_config_p = Box::into_raw(Box::new(component as usize)) as *mut ffi::uct_md_config_t;
        record(|c| {
            c.config_reads += 1;
            c.env_prefixes.push(prefix);
        });
        0
    }

    unsafe extern "C" fn fake_config_release(config: *mut c_void) {
        drop(Box::from_raw(config as *mut usize));
        record(|c| c.config_releases += 1);
    }

    unsafe extern "C" fn fake_md_open(
        _component: ffi::uct_component_h,
        md_name: *const c_char,
        config: *const ffi::uct_md_config_t,
        md_p: *mut ffi::uct_md_h,
    ) -> ffi::ucs_status_t {
        if config.is_null() {
            return UcsStatus::InvalidParam as i32;
        }
        let name = CStr::from_ptr(md_name).to_string_lossy();
        let Some(index) = MD_DEVICES.iter().position(|(md, _)| *md == name) else {
            return UcsStatus::NoDevice as i32;
        };
        *md_p = Box::into_raw(Box::new(index)) as ffi::uct_md_h;
        record(|c| c.md_opens += 1);
        0
    }

    unsafe extern "C" fn fake_md_close(md: ffi::uct_md_h) {
        drop(Box::from_raw(md as *mut usize));
        record(|c| c.md_closes += 1);
    }

    unsafe extern "C" fn fake_md_query_tl_resources(
        md: ffi::uct_md_h,
        resources_p: *mut *mut ffi::uct_tl_resource_desc_t,
        num_p: *mut c_uint,
    ) -> ffi::ucs_status_t {
        let index = *(md as *const usize);
        let descs = MD_DEVICES[index].1.map(|(tl, dev, ty)| tl_desc(tl, dev, ty));
        *resources_p = Box::into_raw(Box::new(descs)) as *mut ffi::uct_tl_resource_desc_t;
        *num_p = 2;
        record(|c| c.tl_lists += 1);
        0
    }

    unsafe extern "C" fn fake_release_tl_resource_list(
        resources: *mut ffi::uct_tl_resource_desc_t,
    ) {
        drop(Box::from_raw(resources as *mut [ffi::uct_tl_resource_desc_t; 2]));
        record(|c| c.tl_list_releases += 1);
    }

    fn fake_library() -> UctLibrary {
        CALLS.with(|c| *c.borrow_mut() = Calls::default());
        UctLibrary::from_symbols(
            "libuct-fake",
            [
                (
                    "uct_query_components",
                    fake_query_components as ffi::UctQueryComponentsFn as *const c_void,
                ),
                (
                    "uct_release_component_list",
                    fake_release_component_list as ffi::UctReleaseComponentListFn as *const c_void,
                ),
                (
                    "uct_component_query",
                    fake_component_query as ffi::UctComponentQueryFn as *const c_void,
                ),
                (
                    "uct_md_config_read",
                    fake_md_config_read as ffi::UctMdConfigReadFn as *const c_void,
                ),
                (
                    "uct_config_release",
                    fake_config_release as ffi::UctConfigReleaseFn as *const c_void,
                ),
                ("uct_md_open", fake_md_open as ffi::UctMdOpenFn as *const c_void),
                ("uct_md_close", fake_md_close as ffi::UctMdCloseFn as *const c_void),
                (
                    "uct_md_query_tl_resources",
                    fake_md_query_tl_resources as ffi::UctMdQueryTlResourcesFn as *const c_void,
                ),
                (
                    "uct_release_tl_resource_list",
                    fake_release_tl_resource_list as ffi::UctReleaseTlResourceListFn
                        as *const c_void,
                ),
            ],
        )
    }

    #[test]
    fn test_walks_component_hierarchy() {
        let lib = fake_library();
        assert_eq!(lib.name(), "libuct-fake");

        let components = lib.components().unwrap();
        let names: Vec<&str> = components.iter().map(|c| lib.component_name(c)).collect();
        assert_eq!(names, vec!["ib", "tcp"]);

        let ib = components.first().unwrap();
        let tcp = components.get(1).unwrap();
        assert_eq!(lib.md_resource_names(ib).unwrap(), vec!["mlx5_0", "mlx5_1"]);
        assert_eq!(lib.md_resource_names(tcp).unwrap(), vec!["tcp"]);

        let config = lib.md_config(ib).unwrap();
        let md = lib.open_md(ib, "mlx5_1", &config).unwrap();
        assert_eq!(md.name(), "mlx5_1");
        assert_eq!(
            lib.transport_devices(&md).unwrap(),
            vec![
                TransportDevice::new("mlx5_1:1", "dc_mlx5", DeviceType::Net),
                TransportDevice::new("cuda", "cuda_ipc", DeviceType::Acc),
            ]
        );
    }

    #[test]
    fn test_every_acquisition_released_once() {
        let lib = fake_library();
        let mut devices = Vec::new();

        let components = lib.components().unwrap();
        for comp in components.iter() {
            let config = lib.md_config(comp).unwrap();
            for md_name in lib.md_resource_names(comp).unwrap() {
                let md = lib.open_md(comp, &md_name, &config).unwrap();
                devices.extend(lib.transport_devices(&md).unwrap());
                md.release().unwrap();
            }
            config.release().unwrap();
        }
        assert_eq!(calls().component_list_releases, 0);
        components.release().unwrap();

        assert_eq!(devices.len(), 6);
        assert_eq!(devices.iter().filter(|d| d.is_network()).count(), 5);
        assert_eq!(
            calls(),
            Calls {
                component_list_releases: 1,
                config_reads: 2,
                config_releases: 2,
                md_opens: 3,
                md_closes: 3,
                tl_lists: 3,
                tl_list_releases: 3,
                env_prefixes: vec![None, None],
            }
        );
    }

    #[test]
    fn test_guards_release_on_drop() {
        let lib = fake_library();
        {
            let components = lib.components().unwrap();
            let tcp = components.get(1).unwrap();
            let config = lib.md_config(tcp).unwrap();
            let _md = lib.open_md(tcp, "tcp", &config).unwrap();
        }
        let calls = calls();
        assert_eq!(calls.component_list_releases, 1);
        assert_eq!(calls.config_releases, 1);
        assert_eq!(calls.md_closes, 1);
    }

    #[test]
    fn test_md_config_env_prefix() {
        let lib = fake_library().with_md_config_env_prefix("DAOS").unwrap();
        let components = lib.components().unwrap();
        drop(lib.md_config(components.first().unwrap()).unwrap());
        assert_eq!(calls().env_prefixes, vec![Some("DAOS".to_string())]);
    }

    #[test]
    fn test_open_unknown_md_acquires_nothing() {
        let lib = fake_library();
        let components = lib.components().unwrap();
        let ib = components.first().unwrap();
        let config = lib.md_config(ib).unwrap();

        let err = lib.open_md(ib, "mlx5_9", &config).err().unwrap();
        assert_eq!(err.ucs_status(), Some(UcsStatus::NoDevice));
        assert_eq!(calls().md_opens, 0);
        assert_eq!(calls().md_closes, 0);
    }

    #[test]
    fn test_closed_library_rejects_calls() {
        let mut lib = fake_library();
        lib.close().unwrap();
        assert!(matches!(lib.components().err(), Some(UctError::Closed)));
        lib.close().unwrap();
    }

    #[test]
    fn test_missing_symbol() {
        let lib = UctLibrary::from_symbols("libuct-empty", Vec::new());
        let err = lib.components().err().unwrap();
        assert!(matches!(err, UctError::Symbol { symbol: "uct_query_components", .. }));
        assert!(err.is_library_unavailable());
    }

    #[test]
    fn test_open_missing_library() {
        let err = UctLibrary::open("/nonexistent/libuct.so").err().unwrap();
        assert!(matches!(err, UctError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/libuct.so"));
    }

    #[test]
    fn test_open_first_reports_last_error() {
        let err = UctLibrary::open_first(&["/nonexistent/a.so", "/nonexistent/b.so"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/b.so"));
    }

    #[test]
    fn test_open_first_without_candidates() {
        let candidates: [&str; 0] = [];
        assert!(matches!(
            UctLibrary::open_first(&candidates),
            Err(UctError::Open { .. })
        ));
    }
}
