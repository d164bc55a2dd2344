//! Vulkan instance lifecycle and layer enumeration.

use std::os::raw::c_char;

use ash::vk;
use ash::vk::Handle;
use tracing::{debug, info};

use xclipse_core::LayerError;

use crate::context::LayerContext;
use crate::dispatch::{dispatch_key, InstanceDispatch};
use crate::loader::{self, resolve_proc};
use crate::{into_vk_result, layer};

/// Static description of this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerIdentity {
    pub name: &'static str,
    pub spec_version: u32,
    pub implementation_version: u32,
    pub description: &'static str,
}

pub const LAYER_IDENTITY: LayerIdentity = LayerIdentity {
    name: "VK_LAYER_XCLIPSE_940",
    spec_version: vk::make_api_version(0, 1, 3, 0),
    implementation_version: 1,
    description: "Xclipse 940 GPU Optimization Layer",
};

impl LayerIdentity {
    pub fn to_properties(&self) -> vk::LayerProperties {
        let mut props = vk::LayerProperties {
            spec_version: self.spec_version,
            implementation_version: self.implementation_version,
            ..Default::default()
        };
        write_c_string(self.name, &mut props.layer_name);
        write_c_string(self.description, &mut props.description);
        props
    }
}

impl LayerContext {
    /// Forward instance creation down the chain and capture the new
    /// instance's entry points on success.
    ///
    /// # Safety
    /// Arguments must satisfy the `vkCreateInstance` contract, including the
    /// loader's link info in the `pNext` chain.
    pub unsafe fn create_instance(
        &self,
        p_create_info: *const vk::InstanceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_instance: *mut vk::Instance,
    ) -> vk::Result {
        into_vk_result(
            "vkCreateInstance",
            self.try_create_instance(p_create_info, p_allocator, p_instance),
        )
    }

    unsafe fn try_create_instance(
        &self,
        p_create_info: *const vk::InstanceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_instance: *mut vk::Instance,
    ) -> Result<vk::Result, LayerError> {
        let create_info = p_create_info
            .as_ref()
            .ok_or(LayerError::MissingLinkInfo("VkInstanceCreateInfo"))?;
        let link_info = loader::find_instance_link_info(create_info)
            .ok_or(LayerError::MissingLinkInfo("VkInstanceCreateInfo"))?;
        let layer_link = (*link_info).u.p_layer_info;
        if layer_link.is_null() {
            return Err(LayerError::MissingLinkInfo("VkInstanceCreateInfo"));
        }

        let gipa = (*layer_link).pfn_next_get_instance_proc_addr;
        let create = resolve_proc!(gipa, vk::Instance::null(), c"vkCreateInstance": vk::PFN_vkCreateInstance)
            .ok_or(LayerError::NotInitialized { entry_point: "vkCreateInstance" })?;

        // Hand the next link to the layer below.
        (*link_info).u.p_layer_info = (*layer_link).p_next;

        let result = create(p_create_info, p_allocator, p_instance);
        if result != vk::Result::SUCCESS {
            return Err(LayerError::Forwarded(result));
        }

        let instance = *p_instance;
        let key = dispatch_key(instance)
            .ok_or(LayerError::NotInitialized { entry_point: "vkCreateInstance" })?;
        self.dispatch.insert_instance(key, InstanceDispatch::load(instance, gipa));

        info!(
            "instance 0x{:x} created on {}",
            instance.as_raw(),
            xclipse_common::platform::platform_name()
        );
        Ok(result)
    }

    /// Release the instance's entry points and forward the destroy call.
    ///
    /// # Safety
    /// Arguments must satisfy the `vkDestroyInstance` contract.
    pub unsafe fn destroy_instance(
        &self,
        instance: vk::Instance,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        let Some(key) = dispatch_key(instance) else {
            return;
        };
        let Some(dispatch) = self.dispatch.remove_instance(key) else {
            debug!("vkDestroyInstance on unknown instance");
            return;
        };
        if let Some(destroy) = dispatch.destroy_instance {
            destroy(instance, p_allocator);
        }
    }
}

/// Report this layer's identity with the count-then-fill convention.
/// Never writes more than the caller's declared capacity.
///
/// # Safety
/// Non-null pointers must be valid for the declared count.
pub unsafe fn enumerate_layer_properties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    let Some(count) = p_property_count.as_mut() else {
        return vk::Result::SUCCESS;
    };
    if p_properties.is_null() {
        *count = 1;
        return vk::Result::SUCCESS;
    }
    if *count >= 1 {
        *p_properties = LAYER_IDENTITY.to_properties();
        *count = 1;
    } else {
        *count = 0;
    }
    vk::Result::SUCCESS
}

#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceLayerProperties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    enumerate_layer_properties(p_property_count, p_properties)
}

pub unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    layer().create_instance(p_create_info, p_allocator, p_instance)
}

pub unsafe extern "system" fn destroy_instance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    layer().destroy_instance(instance, p_allocator)
}

// ── Helpers ─────────────────────────────────────────────────

fn write_c_string(src: &str, dst: &mut [c_char]) {
    let bytes = src.as_bytes();
    let len = std::cmp::min(bytes.len(), dst.len() - 1);
    for i in 0..len {
        dst[i] = bytes[i] as c_char;
    }
    dst[len] = 0;
}
