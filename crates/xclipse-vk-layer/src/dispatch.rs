//! Dispatch keys and the forwarded entry points of every live instance and
//! device.
//!
//! The Vulkan loader requires that dispatchable handles (VkInstance,
//! VkPhysicalDevice, VkDevice, VkQueue, VkCommandBuffer) have their first
//! `sizeof(void*)` bytes point to its dispatch table. Physical devices share
//! the table of their instance, queues and command buffers share the table of
//! their device, so that pointer identifies the owner from any child handle.

use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use dashmap::DashMap;

use xclipse_core::LayerError;

use crate::loader::resolve_proc;

pub type DispatchKey = usize;

/// Read the loader dispatch key of a dispatchable handle.
///
/// # Safety
/// A non-null `handle` must point to a live dispatchable object.
pub unsafe fn dispatch_key<H: Handle>(handle: H) -> Option<DispatchKey> {
    let raw = handle.as_raw();
    if raw == 0 {
        return None;
    }
    Some(*(raw as usize as *const usize))
}

/// The next layer's resolvers, captured once at creation time.
#[derive(Clone, Copy)]
pub struct ForwardedEntryPoints {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
}

/// Forwarded instance-level functions the layer calls itself.
pub struct InstanceDispatch {
    pub instance: vk::Instance,
    pub next: ForwardedEntryPoints,
    pub destroy_instance: Option<vk::PFN_vkDestroyInstance>,
    pub get_physical_device_properties: Option<vk::PFN_vkGetPhysicalDeviceProperties>,
    pub get_physical_device_memory_properties:
        Option<vk::PFN_vkGetPhysicalDeviceMemoryProperties>,
}

impl InstanceDispatch {
    /// # Safety
    /// `get_instance_proc_addr` must be the next layer's resolver for `instance`.
    pub unsafe fn load(
        instance: vk::Instance,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    ) -> Self {
        let gipa = get_instance_proc_addr;
        Self {
            instance,
            next: ForwardedEntryPoints {
                get_instance_proc_addr: gipa,
                get_device_proc_addr: resolve_proc!(
                    gipa, instance, c"vkGetDeviceProcAddr": vk::PFN_vkGetDeviceProcAddr
                ),
            },
            destroy_instance: resolve_proc!(
                gipa, instance, c"vkDestroyInstance": vk::PFN_vkDestroyInstance
            ),
            get_physical_device_properties: resolve_proc!(
                gipa, instance, c"vkGetPhysicalDeviceProperties": vk::PFN_vkGetPhysicalDeviceProperties
            ),
            get_physical_device_memory_properties: resolve_proc!(
                gipa, instance, c"vkGetPhysicalDeviceMemoryProperties": vk::PFN_vkGetPhysicalDeviceMemoryProperties
            ),
        }
    }
}

/// Forwarded device-level functions for the intercepted entry points.
pub struct DeviceDispatch {
    pub device: vk::Device,
    pub physical_device: vk::PhysicalDevice,
    pub next: ForwardedEntryPoints,
    pub destroy_device: Option<vk::PFN_vkDestroyDevice>,
    pub create_graphics_pipelines: Option<vk::PFN_vkCreateGraphicsPipelines>,
    pub create_compute_pipelines: Option<vk::PFN_vkCreateComputePipelines>,
    pub allocate_memory: Option<vk::PFN_vkAllocateMemory>,
    pub queue_submit: Option<vk::PFN_vkQueueSubmit>,
}

impl DeviceDispatch {
    /// # Safety
    /// `next` must hold the next layer's resolvers for `device`.
    pub unsafe fn load(
        device: vk::Device,
        physical_device: vk::PhysicalDevice,
        next: ForwardedEntryPoints,
    ) -> Self {
        let mut dispatch = Self {
            device,
            physical_device,
            next,
            destroy_device: None,
            create_graphics_pipelines: None,
            create_compute_pipelines: None,
            allocate_memory: None,
            queue_submit: None,
        };
        if let Some(gdpa) = next.get_device_proc_addr {
            dispatch.destroy_device =
                resolve_proc!(gdpa, device, c"vkDestroyDevice": vk::PFN_vkDestroyDevice);
            dispatch.create_graphics_pipelines = resolve_proc!(
                gdpa, device, c"vkCreateGraphicsPipelines": vk::PFN_vkCreateGraphicsPipelines
            );
            dispatch.create_compute_pipelines = resolve_proc!(
                gdpa, device, c"vkCreateComputePipelines": vk::PFN_vkCreateComputePipelines
            );
            dispatch.allocate_memory =
                resolve_proc!(gdpa, device, c"vkAllocateMemory": vk::PFN_vkAllocateMemory);
            dispatch.queue_submit =
                resolve_proc!(gdpa, device, c"vkQueueSubmit": vk::PFN_vkQueueSubmit);
        }
        dispatch
    }
}

/// Fail with a bootstrap-ordering error when a forwarded function is missing.
pub fn required<F>(pfn: Option<F>, entry_point: &'static str) -> Result<F, LayerError> {
    pfn.ok_or(LayerError::NotInitialized { entry_point })
}

/// Dispatch-key -> forwarded entry points, for instances and devices.
///
/// Entries are written once when the creating call succeeds and removed when
/// the handle is destroyed; readers get a shared `Arc`.
pub struct DispatchRegistry {
    instances: DashMap<DispatchKey, Arc<InstanceDispatch>>,
    devices: DashMap<DispatchKey, Arc<DeviceDispatch>>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
            devices: DashMap::new(),
        }
    }

    pub fn insert_instance(&self, key: DispatchKey, dispatch: InstanceDispatch) {
        self.instances.insert(key, Arc::new(dispatch));
    }

    pub fn remove_instance(&self, key: DispatchKey) -> Option<Arc<InstanceDispatch>> {
        self.instances.remove(&key).map(|(_, v)| v)
    }

    /// Instance dispatch for an instance or one of its physical devices.
    ///
    /// # Safety
    /// See [`dispatch_key`].
    pub unsafe fn instance_for<H: Handle>(&self, handle: H) -> Option<Arc<InstanceDispatch>> {
        let key = dispatch_key(handle)?;
        self.instances.get(&key).map(|v| Arc::clone(&v))
    }

    pub fn insert_device(&self, key: DispatchKey, dispatch: DeviceDispatch) {
        self.devices.insert(key, Arc::new(dispatch));
    }

    pub fn remove_device(&self, key: DispatchKey) -> Option<Arc<DeviceDispatch>> {
        self.devices.remove(&key).map(|(_, v)| v)
    }

    /// Device dispatch for a device, queue or command buffer.
    ///
    /// # Safety
    /// See [`dispatch_key`].
    pub unsafe fn device_for<H: Handle>(&self, handle: H) -> Option<Arc<DeviceDispatch>> {
        let key = dispatch_key(handle)?;
        self.devices.get(&key).map(|v| Arc::clone(&v))
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
