//! Logical device lifecycle.

use ash::vk;
use ash::vk::Handle;
use std::sync::Arc;
use tracing::{debug, info, warn};

use xclipse_core::LayerError;

use crate::context::{DeviceContext, LayerContext};
use crate::dispatch::{dispatch_key, DeviceDispatch, ForwardedEntryPoints};
use crate::loader::{self, resolve_proc};
use crate::{into_vk_result, layer};

impl LayerContext {
    /// Forward device creation down the chain; on success capture the
    /// device's entry points and build its [`DeviceContext`].
    ///
    /// # Safety
    /// Arguments must satisfy the `vkCreateDevice` contract, including the
    /// loader's link info in the `pNext` chain.
    pub unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        p_create_info: *const vk::DeviceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_device: *mut vk::Device,
    ) -> vk::Result {
        into_vk_result(
            "vkCreateDevice",
            self.try_create_device(physical_device, p_create_info, p_allocator, p_device),
        )
    }

    unsafe fn try_create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        p_create_info: *const vk::DeviceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_device: *mut vk::Device,
    ) -> Result<vk::Result, LayerError> {
        let create_info = p_create_info
            .as_ref()
            .ok_or(LayerError::MissingLinkInfo("VkDeviceCreateInfo"))?;
        let link_info = loader::find_device_link_info(create_info)
            .ok_or(LayerError::MissingLinkInfo("VkDeviceCreateInfo"))?;
        let layer_link = (*link_info).u.p_layer_info;
        if layer_link.is_null() {
            return Err(LayerError::MissingLinkInfo("VkDeviceCreateInfo"));
        }

        let gipa = (*layer_link).pfn_next_get_instance_proc_addr;
        let gdpa = (*layer_link).pfn_next_get_device_proc_addr;

        let instance_dispatch = self.dispatch.instance_for(physical_device);
        let instance = instance_dispatch
            .as_ref()
            .map_or(vk::Instance::null(), |d| d.instance);
        let create = resolve_proc!(gipa, instance, c"vkCreateDevice": vk::PFN_vkCreateDevice)
            .ok_or(LayerError::NotInitialized { entry_point: "vkCreateDevice" })?;

        // Hand the next link to the layer below.
        (*link_info).u.p_layer_info = (*layer_link).p_next;

        let result = create(physical_device, p_create_info, p_allocator, p_device);
        if result != vk::Result::SUCCESS {
            return Err(LayerError::Forwarded(result));
        }

        let device = *p_device;
        let key = dispatch_key(device)
            .ok_or(LayerError::NotInitialized { entry_point: "vkCreateDevice" })?;
        let next = ForwardedEntryPoints {
            get_instance_proc_addr: gipa,
            get_device_proc_addr: Some(gdpa),
        };
        self.dispatch
            .insert_device(key, DeviceDispatch::load(device, physical_device, next));

        let context = instance_dispatch
            .and_then(|instance| DeviceContext::query(&instance, physical_device, device));
        match context {
            Some(context) => {
                info!(
                    "device 0x{:x} created on '{}' ({} memory types)",
                    device.as_raw(),
                    context.device_name(),
                    context.memory_properties.memory_type_count
                );
                self.devices.insert(key, Arc::new(context));
            }
            None => warn!(
                "device 0x{:x} created without instance properties, descriptor tuning disabled",
                device.as_raw()
            ),
        }
        Ok(result)
    }

    /// Release the device's entry points and context, then forward the
    /// destroy call.
    ///
    /// Pipeline records created on the device are kept.
    ///
    /// # Safety
    /// Arguments must satisfy the `vkDestroyDevice` contract.
    pub unsafe fn destroy_device(
        &self,
        device: vk::Device,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        let Some(key) = dispatch_key(device) else {
            return;
        };
        self.devices.remove(&key);
        let Some(dispatch) = self.dispatch.remove_device(key) else {
            debug!("vkDestroyDevice on unknown device");
            return;
        };
        if let Some(destroy) = dispatch.destroy_device {
            destroy(device, p_allocator);
        }
    }
}

pub unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    layer().create_device(physical_device, p_create_info, p_allocator, p_device)
}

pub unsafe extern "system" fn destroy_device(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    layer().destroy_device(device, p_allocator)
}
