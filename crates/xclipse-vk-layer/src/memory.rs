//! Memory allocation.

use ash::vk;
use tracing::trace;

use xclipse_core::policy;
use xclipse_core::LayerError;

use crate::context::LayerContext;
use crate::dispatch::required;
use crate::{into_vk_result, layer};

impl LayerContext {
    /// Forward an allocation with its size rounded up to the configured
    /// alignment. The memory type the application chose is never changed.
    ///
    /// # Safety
    /// Arguments must satisfy the `vkAllocateMemory` contract.
    pub unsafe fn allocate_memory(
        &self,
        device: vk::Device,
        p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_memory: *mut vk::DeviceMemory,
    ) -> vk::Result {
        into_vk_result(
            "vkAllocateMemory",
            self.try_allocate_memory(device, p_allocate_info, p_allocator, p_memory),
        )
    }

    unsafe fn try_allocate_memory(
        &self,
        device: vk::Device,
        p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_memory: *mut vk::DeviceMemory,
    ) -> Result<vk::Result, LayerError> {
        let dispatch = self
            .dispatch
            .device_for(device)
            .ok_or(LayerError::NotInitialized { entry_point: "vkAllocateMemory" })?;
        let allocate = required(dispatch.allocate_memory, "vkAllocateMemory")?;

        let config = &self.config.memory;
        let Some(original) = p_allocate_info.as_ref().filter(|_| config.align_allocations) else {
            return Ok(allocate(device, p_allocate_info, p_allocator, p_memory));
        };

        let mut info = *original;
        info.allocation_size =
            policy::align_allocation_size(original.allocation_size, config.allocation_alignment);

        if let Some(context) = self.device_context(device) {
            match policy::is_device_local(&context.memory_properties, info.memory_type_index) {
                Some(true) => trace!("allocation in device-local type {}", info.memory_type_index),
                Some(false) => trace!("allocation in host type {}", info.memory_type_index),
                None => trace!("allocation type {} out of range", info.memory_type_index),
            }
        }

        trace!(
            "vkAllocateMemory: {} -> {} bytes",
            original.allocation_size,
            info.allocation_size
        );
        Ok(allocate(device, &info, p_allocator, p_memory))
    }
}

pub unsafe extern "system" fn allocate_memory(
    device: vk::Device,
    p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_memory: *mut vk::DeviceMemory,
) -> vk::Result {
    layer().allocate_memory(device, p_allocate_info, p_allocator, p_memory)
}
