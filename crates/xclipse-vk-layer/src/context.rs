//! Layer state shared by all intercepted entry points.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use dashmap::DashMap;

use xclipse_core::policy::SubmissionClass;
use xclipse_core::{LayerConfig, PipelineStore};

use crate::dispatch::{dispatch_key, DispatchKey, DispatchRegistry, InstanceDispatch};

/// Static facts about a device, queried once when it is created.
pub struct DeviceContext {
    pub physical_device: vk::PhysicalDevice,
    pub device: vk::Device,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl DeviceContext {
    /// Query the physical device through the owning instance's forwarded
    /// functions. Returns `None` if the instance never exposed them.
    ///
    /// # Safety
    /// `physical_device` must belong to the instance behind `instance`.
    pub unsafe fn query(
        instance: &InstanceDispatch,
        physical_device: vk::PhysicalDevice,
        device: vk::Device,
    ) -> Option<Self> {
        let get_properties = instance.get_physical_device_properties?;
        let get_memory_properties = instance.get_physical_device_memory_properties?;

        let mut properties = vk::PhysicalDeviceProperties::default();
        get_properties(physical_device, &mut properties);
        let mut memory_properties = vk::PhysicalDeviceMemoryProperties::default();
        get_memory_properties(physical_device, &mut memory_properties);

        Some(Self {
            physical_device,
            device,
            properties,
            memory_properties,
        })
    }

    pub fn device_name(&self) -> String {
        self.properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Counts of classified queue submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionCounts {
    pub compute: u64,
    pub transfer: u64,
    pub graphics: u64,
}

#[derive(Default)]
pub struct SubmissionStats {
    compute: AtomicU64,
    transfer: AtomicU64,
    graphics: AtomicU64,
}

impl SubmissionStats {
    pub fn record(&self, class: SubmissionClass) {
        let counter = match class {
            SubmissionClass::Compute => &self.compute,
            SubmissionClass::Transfer => &self.transfer,
            SubmissionClass::Graphics => &self.graphics,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SubmissionCounts {
        SubmissionCounts {
            compute: self.compute.load(Ordering::Relaxed),
            transfer: self.transfer.load(Ordering::Relaxed),
            graphics: self.graphics.load(Ordering::Relaxed),
        }
    }
}

/// Everything the layer tracks for one process.
///
/// The exported entry points reach a process-wide instance through
/// [`crate::layer`]; tests build their own.
pub struct LayerContext {
    pub(crate) config: LayerConfig,
    pub(crate) dispatch: DispatchRegistry,
    pub(crate) devices: DashMap<DispatchKey, Arc<DeviceContext>>,
    pub(crate) pipelines: PipelineStore,
    pub(crate) submissions: SubmissionStats,
}

impl LayerContext {
    pub fn new(config: LayerConfig) -> Self {
        Self {
            config: config.validated(),
            dispatch: DispatchRegistry::new(),
            devices: DashMap::new(),
            pipelines: PipelineStore::new(),
            submissions: SubmissionStats::default(),
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn dispatch(&self) -> &DispatchRegistry {
        &self.dispatch
    }

    pub fn pipelines(&self) -> &PipelineStore {
        &self.pipelines
    }

    pub fn submission_counts(&self) -> SubmissionCounts {
        self.submissions.snapshot()
    }

    /// Device context for a device or one of its queues.
    ///
    /// # Safety
    /// See [`dispatch_key`].
    pub unsafe fn device_context<H: Handle>(&self, handle: H) -> Option<Arc<DeviceContext>> {
        let key = dispatch_key(handle)?;
        self.devices.get(&key).map(|v| Arc::clone(&v))
    }

    pub fn device_context_count(&self) -> usize {
        self.devices.len()
    }
}

impl Default for LayerContext {
    fn default() -> Self {
        Self::new(LayerConfig::default())
    }
}
