//! Raw libuct ABI declarations.
//!
//! Layouts follow `uct/api/uct.h`. Nothing here is linked at build time;
//! every function is resolved from the loaded library as a function pointer.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_uint, c_void};

pub const UCT_COMPONENT_NAME_MAX: usize = 16;
pub const UCT_MD_NAME_MAX: usize = 16;
pub const UCT_TL_NAME_MAX: usize = 10;
pub const UCT_DEVICE_NAME_MAX: usize = 32;

pub const UCT_COMPONENT_ATTR_FIELD_NAME: u64 = 1 << 0;
pub const UCT_COMPONENT_ATTR_FIELD_MD_RESOURCE_COUNT: u64 = 1 << 1;
pub const UCT_COMPONENT_ATTR_FIELD_MD_RESOURCES: u64 = 1 << 2;

pub const UCT_DEVICE_TYPE_NET: c_uint = 0;
pub const UCT_DEVICE_TYPE_SHM: c_uint = 1;
pub const UCT_DEVICE_TYPE_ACC: c_uint = 2;
pub const UCT_DEVICE_TYPE_SELF: c_uint = 3;

pub type ucs_status_t = i32;
pub type uct_component_h = *mut c_void;
pub type uct_md_h = *mut c_void;
pub type uct_md_config_t = c_void;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct uct_md_resource_desc_t {
    pub md_name: [c_char; UCT_MD_NAME_MAX],
}

#[repr(C)]
pub struct uct_component_attr_t {
    pub field_mask: u64,
    pub name: [c_char; UCT_COMPONENT_NAME_MAX],
    pub md_resource_count: c_uint,
    pub md_resources: *mut uct_md_resource_desc_t,
    pub flags: u64,
}

impl Default for uct_component_attr_t {
    fn default() -> Self {
        Self {
            field_mask: 0,
            name: [0; UCT_COMPONENT_NAME_MAX],
            md_resource_count: 0,
            md_resources: std::ptr::null_mut(),
            flags: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct uct_tl_resource_desc_t {
    pub tl_name: [c_char; UCT_TL_NAME_MAX],
    pub dev_name: [c_char; UCT_DEVICE_NAME_MAX],
    pub dev_type: c_uint,
    pub sys_device: u8,
}

pub type UctQueryComponentsFn = unsafe extern "C" fn(
    components_p: *mut *mut uct_component_h,
    num_p: *mut c_uint,
) -> ucs_status_t;
pub type UctReleaseComponentListFn = unsafe extern "C" fn(components: *mut uct_component_h);
pub type UctComponentQueryFn = unsafe extern "C" fn(
    component: uct_component_h,
    attr: *mut uct_component_attr_t,
) -> ucs_status_t;
pub type UctMdConfigReadFn = unsafe extern "C" fn(
    component: uct_component_h,
    env_prefix: *const c_char,
    filename: *const c_char,
    md_config_p: *mut *mut uct_md_config_t,
) -> ucs_status_t;
pub type UctConfigReleaseFn = unsafe extern "C" fn(config: *mut c_void);
pub type UctMdOpenFn = unsafe extern "C" fn(
    component: uct_component_h,
    md_name: *const c_char,
    config: *const uct_md_config_t,
    md_p: *mut uct_md_h,
) -> ucs_status_t;
pub type UctMdCloseFn = unsafe extern "C" fn(md: uct_md_h);
pub type UctMdQueryTlResourcesFn = unsafe extern "C" fn(
    md: uct_md_h,
    resources_p: *mut *mut uct_tl_resource_desc_t,
    num_p: *mut c_uint,
) -> ucs_status_t;
pub type UctReleaseTlResourceListFn = unsafe extern "C" fn(resources: *mut uct_tl_resource_desc_t);
