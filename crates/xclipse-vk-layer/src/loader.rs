//! Loader <-> layer interface structures (`vk_layer.h`).
//!
//! Tag fields are transparent newtypes rather than Rust enums because their
//! values come from the loader and an unknown value must not be UB.

use std::ffi::{c_char, c_void};

use ash::vk;

/// `VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO`
pub const LOADER_INSTANCE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(47);
/// `VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO`
pub const LOADER_DEVICE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(48);

/// `VkNegotiateLayerStructType`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiateLayerStructType(pub i32);

impl NegotiateLayerStructType {
    pub const UNINITIALIZED: Self = Self(0);
    pub const INTERFACE_STRUCT: Self = Self(1);
}

/// `VkLayerFunction`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerFunction(pub i32);

impl LayerFunction {
    pub const LINK_INFO: Self = Self(0);
    pub const LOADER_DATA_CALLBACK: Self = Self(1);
    pub const LOADER_LAYER_CREATE_DEVICE_CALLBACK: Self = Self(2);
    pub const LOADER_FEATURES: Self = Self(3);
}

#[allow(non_camel_case_types)]
pub type PFN_GetPhysicalDeviceProcAddr =
    unsafe extern "system" fn(instance: vk::Instance, p_name: *const c_char) -> vk::PFN_vkVoidFunction;

/// `VkNegotiateLayerInterface`, filled in by `vkNegotiateLoaderLayerInterfaceVersion`.
#[repr(C)]
pub struct NegotiateLayerInterface {
    pub s_type: NegotiateLayerStructType,
    pub p_next: *mut c_void,
    /// In: highest version the loader supports. Out: version the layer implements.
    pub loader_layer_interface_version: u32,
    pub pfn_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
    pub pfn_get_physical_device_proc_addr: Option<PFN_GetPhysicalDeviceProcAddr>,
}

/// `VkLayerInstanceLink`: one link of the instance call chain.
#[repr(C)]
pub struct LayerInstanceLink {
    pub p_next: *mut LayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_physical_device_proc_addr: Option<PFN_GetPhysicalDeviceProcAddr>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct LayerDeviceCallbacks {
    pub pfn_layer_create_device: *const c_void,
    pub pfn_layer_destroy_device: *const c_void,
}

#[repr(C)]
pub union LayerInstanceCreateInfoPayload {
    pub p_layer_info: *mut LayerInstanceLink,
    pub pfn_set_instance_loader_data: *const c_void,
    pub layer_device: LayerDeviceCallbacks,
    pub loader_features: u32,
}

/// `VkLayerInstanceCreateInfo`, chained into `VkInstanceCreateInfo::pNext` by the loader.
#[repr(C)]
pub struct LayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerInstanceCreateInfoPayload,
}

/// `VkLayerDeviceLink`: one link of the device call chain.
#[repr(C)]
pub struct LayerDeviceLink {
    pub p_next: *mut LayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

#[repr(C)]
pub union LayerDeviceCreateInfoPayload {
    pub p_layer_info: *mut LayerDeviceLink,
    pub pfn_set_device_loader_data: *const c_void,
}

/// `VkLayerDeviceCreateInfo`, chained into `VkDeviceCreateInfo::pNext` by the loader.
#[repr(C)]
pub struct LayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerDeviceCreateInfoPayload,
}

/// Walk a `pNext` chain for the first structure of `s_type` whose
/// `function` is `LINK_INFO`.
///
/// Both loader create-info structs start with the same
/// `{ sType, pNext, function }` prefix.
unsafe fn find_link_info(p_next: *const c_void, s_type: vk::StructureType) -> Option<*mut c_void> {
    let mut next = p_next as *const vk::BaseInStructure<'_>;
    while !next.is_null() {
        if (*next).s_type == s_type {
            let candidate = next as *const LayerInstanceCreateInfo;
            if (*candidate).function == LayerFunction::LINK_INFO {
                return Some(next as *mut c_void);
            }
        }
        next = (*next).p_next;
    }
    None
}

/// Find the loader's instance link info.
///
/// # Safety
/// `create_info.p_next` must be a valid structure chain.
pub unsafe fn find_instance_link_info(
    create_info: &vk::InstanceCreateInfo<'_>,
) -> Option<*mut LayerInstanceCreateInfo> {
    find_link_info(create_info.p_next, LOADER_INSTANCE_CREATE_INFO)
        .map(|p| p as *mut LayerInstanceCreateInfo)
}

/// Find the loader's device link info.
///
/// # Safety
/// `create_info.p_next` must be a valid structure chain.
pub unsafe fn find_device_link_info(
    create_info: &vk::DeviceCreateInfo<'_>,
) -> Option<*mut LayerDeviceCreateInfo> {
    find_link_info(create_info.p_next, LOADER_DEVICE_CREATE_INFO)
        .map(|p| p as *mut LayerDeviceCreateInfo)
}

/// Resolve a function pointer through a `vkGet*ProcAddr` and cast it to its typed form.
macro_rules! resolve_proc {
    ($resolver:expr, $handle:expr, $name:literal : $ty:ty) => {
        ::std::mem::transmute::<::ash::vk::PFN_vkVoidFunction, Option<$ty>>(($resolver)(
            $handle,
            $name.as_ptr(),
        ))
    };
}
pub(crate) use resolve_proc;
