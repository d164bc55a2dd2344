//! Name -> wrapper table for the intercepted entry points, and the
//! instance/device proc-address resolvers built on it.

use std::ffi::{c_char, CStr};
use std::mem;

use ash::vk;
use tracing::trace;

use crate::context::LayerContext;
use crate::{device, graphics_pipeline, instance, memory, pipeline, sync};

/// Which resolver exposes an intercepted entry point.
///
/// The instance resolver returns both levels; the device resolver only
/// `Device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptLevel {
    Instance,
    Device,
}

pub struct Intercept {
    pub name: &'static str,
    pub level: InterceptLevel,
    pub pfn: unsafe extern "system" fn(),
}

macro_rules! intercept {
    ($name:literal, $level:ident, $pfn:path as $ty:ty) => {
        Intercept {
            name: $name,
            level: InterceptLevel::$level,
            pfn: unsafe { mem::transmute::<$ty, unsafe extern "system" fn()>($pfn) },
        }
    };
}

// Sorted by name; `lookup` binary-searches it.
static INTERCEPTS: [Intercept; 11] = [
    intercept!("vkAllocateMemory", Device, memory::allocate_memory as vk::PFN_vkAllocateMemory),
    intercept!(
        "vkCreateComputePipelines",
        Device,
        pipeline::create_compute_pipelines as vk::PFN_vkCreateComputePipelines
    ),
    intercept!("vkCreateDevice", Instance, device::create_device as vk::PFN_vkCreateDevice),
    intercept!(
        "vkCreateGraphicsPipelines",
        Device,
        graphics_pipeline::create_graphics_pipelines as vk::PFN_vkCreateGraphicsPipelines
    ),
    intercept!("vkCreateInstance", Instance, instance::create_instance as vk::PFN_vkCreateInstance),
    intercept!("vkDestroyDevice", Device, device::destroy_device as vk::PFN_vkDestroyDevice),
    intercept!("vkDestroyInstance", Instance, instance::destroy_instance as vk::PFN_vkDestroyInstance),
    intercept!(
        "vkEnumerateInstanceLayerProperties",
        Instance,
        instance::vkEnumerateInstanceLayerProperties as vk::PFN_vkEnumerateInstanceLayerProperties
    ),
    intercept!("vkGetDeviceProcAddr", Device, crate::vkGetDeviceProcAddr as vk::PFN_vkGetDeviceProcAddr),
    intercept!(
        "vkGetInstanceProcAddr",
        Instance,
        crate::vkGetInstanceProcAddr as vk::PFN_vkGetInstanceProcAddr
    ),
    intercept!("vkQueueSubmit", Device, sync::queue_submit as vk::PFN_vkQueueSubmit),
];

/// Every intercepted entry point, sorted by name.
pub fn intercepts() -> &'static [Intercept] {
    &INTERCEPTS
}

/// Exact, case-sensitive lookup.
pub fn lookup(name: &str) -> Option<&'static Intercept> {
    INTERCEPTS
        .binary_search_by(|entry| entry.name.cmp(name))
        .ok()
        .map(|index| &INTERCEPTS[index])
}

unsafe fn requested_name<'a>(p_name: *const c_char) -> Option<&'a CStr> {
    if p_name.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p_name))
    }
}

impl LayerContext {
    /// `vkGetInstanceProcAddr`: the wrapper for any intercepted name, else
    /// whatever the next layer returns for `instance`.
    ///
    /// # Safety
    /// `p_name` must be null or a NUL-terminated string; a non-null
    /// `instance` must be live.
    pub unsafe fn resolve_instance_proc(
        &self,
        instance: vk::Instance,
        p_name: *const c_char,
    ) -> vk::PFN_vkVoidFunction {
        let name = requested_name(p_name)?;
        if let Some(entry) = name.to_str().ok().and_then(lookup) {
            return Some(entry.pfn);
        }
        let dispatch = self.dispatch.instance_for(instance)?;
        trace!("forwarding instance proc {:?}", name);
        (dispatch.next.get_instance_proc_addr)(instance, p_name)
    }

    /// `vkGetDeviceProcAddr`: like [`Self::resolve_instance_proc`] but only
    /// device-level names are intercepted.
    ///
    /// # Safety
    /// `p_name` must be null or a NUL-terminated string; a non-null `device`
    /// must be live.
    pub unsafe fn resolve_device_proc(
        &self,
        device: vk::Device,
        p_name: *const c_char,
    ) -> vk::PFN_vkVoidFunction {
        let name = requested_name(p_name)?;
        let intercepted = name
            .to_str()
            .ok()
            .and_then(lookup)
            .filter(|entry| entry.level == InterceptLevel::Device);
        if let Some(entry) = intercepted {
            return Some(entry.pfn);
        }
        let dispatch = self.dispatch.device_for(device)?;
        let next = dispatch.next.get_device_proc_addr?;
        trace!("forwarding device proc {:?}", name);
        next(device, p_name)
    }
}
