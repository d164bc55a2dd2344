//! Mock "next layer" for driving the layer without a Vulkan driver.
//!
//! Dispatchable handles are leaked boxes whose first word is a fake loader
//! dispatch pointer, so children made with [`child_of`] share their parent's
//! dispatch key the way the real loader arranges it. Every mock entry point
//! records what it was forwarded; tests filter the logs by their own handles
//! because test functions run concurrently.

#![allow(dead_code)]

use std::ffi::{c_char, c_void, CStr};
use std::mem;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use ash::vk;
use ash::vk::Handle;

use xclipse_core::LayerConfig;
use xclipse_vk_layer::loader::{
    LayerDeviceCreateInfo, LayerDeviceCreateInfoPayload, LayerDeviceLink, LayerFunction,
    LayerInstanceCreateInfo, LayerInstanceCreateInfoPayload, LayerInstanceLink,
    LOADER_DEVICE_CREATE_INFO, LOADER_INSTANCE_CREATE_INFO,
};
use xclipse_vk_layer::LayerContext;

/// `enabled_extension_count` value that makes the mock create calls fail.
pub const FAIL_MARKER: u32 = 0xDEAD;
/// `base_pipeline_index` value that makes the mock fail that batch slot.
pub const FAIL_PIPELINE: i32 = -99;
/// Written by the mock `vkEnumeratePhysicalDevices`.
pub const ENUMERATE_MARKER: u32 = 0x5EED;

pub const MOCK_DEVICE_NAME: &str = "Xclipse 940 Mock";

// ── Fake handles ────────────────────────────────────────────

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0x1000);
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x10_0000);

pub fn new_dispatch_key() -> usize {
    NEXT_KEY.fetch_add(1, Ordering::SeqCst)
}

/// A dispatchable handle whose first word is `key`.
pub fn dispatchable<H: Handle>(key: usize) -> H {
    let word: &'static mut usize = Box::leak(Box::new(key));
    H::from_raw(word as *mut usize as u64)
}

pub fn key_of<H: Handle>(handle: H) -> usize {
    unsafe { *(handle.as_raw() as usize as *const usize) }
}

/// A child handle (physical device, queue) sharing `parent`'s dispatch key.
pub fn child_of<P: Handle, C: Handle>(parent: P) -> C {
    dispatchable(key_of(parent))
}

/// A unique non-dispatchable handle.
pub fn next_handle<H: Handle>() -> H {
    H::from_raw(NEXT_HANDLE.fetch_add(1, Ordering::SeqCst))
}

// ── Forwarded call logs ─────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ForwardedBatch {
    pub device: u64,
    pub count: u32,
    pub p_create_infos: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardedGraphics {
    pub device: u64,
    pub stage_count: u32,
    pub p_stages: usize,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub base_pipeline_index: i32,
    pub cull_mode: Option<vk::CullModeFlags>,
    pub depth_bias_enable: Option<vk::Bool32>,
    pub samples: Option<vk::SampleCountFlags>,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardedCompute {
    pub device: u64,
    pub stage: vk::ShaderStageFlags,
    pub layout: vk::PipelineLayout,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardedAllocation {
    pub device: u64,
    pub p_allocate_info: usize,
    pub allocation_size: vk::DeviceSize,
    pub memory_type_index: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardedSubmit {
    pub queue: u64,
    pub submit_count: u32,
    pub p_submits: usize,
    pub fence: vk::Fence,
}

static GRAPHICS_BATCHES: Mutex<Vec<ForwardedBatch>> = Mutex::new(Vec::new());
static COMPUTE_BATCHES: Mutex<Vec<ForwardedBatch>> = Mutex::new(Vec::new());
static GRAPHICS: Mutex<Vec<ForwardedGraphics>> = Mutex::new(Vec::new());
static COMPUTE: Mutex<Vec<ForwardedCompute>> = Mutex::new(Vec::new());
static ALLOCATIONS: Mutex<Vec<ForwardedAllocation>> = Mutex::new(Vec::new());
static SUBMITS: Mutex<Vec<ForwardedSubmit>> = Mutex::new(Vec::new());
static DESTROYED: Mutex<Vec<u64>> = Mutex::new(Vec::new());

fn filtered<T: Copy>(log: &Mutex<Vec<T>>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    log.lock().unwrap().iter().copied().filter(|e| keep(e)).collect()
}

pub fn graphics_batches(device: vk::Device) -> Vec<ForwardedBatch> {
    filtered(&GRAPHICS_BATCHES, |b| b.device == device.as_raw())
}

pub fn compute_batches(device: vk::Device) -> Vec<ForwardedBatch> {
    filtered(&COMPUTE_BATCHES, |b| b.device == device.as_raw())
}

pub fn forwarded_graphics(device: vk::Device) -> Vec<ForwardedGraphics> {
    filtered(&GRAPHICS, |g| g.device == device.as_raw())
}

pub fn forwarded_compute(device: vk::Device) -> Vec<ForwardedCompute> {
    filtered(&COMPUTE, |c| c.device == device.as_raw())
}

pub fn forwarded_allocations(device: vk::Device) -> Vec<ForwardedAllocation> {
    filtered(&ALLOCATIONS, |a| a.device == device.as_raw())
}

pub fn forwarded_submits(queue: vk::Queue) -> Vec<ForwardedSubmit> {
    filtered(&SUBMITS, |s| s.queue == queue.as_raw())
}

pub fn destroy_count<H: Handle>(handle: H) -> usize {
    let raw = handle.as_raw();
    DESTROYED.lock().unwrap().iter().filter(|&&d| d == raw).count()
}

// ── Mock entry points ───────────────────────────────────────

macro_rules! void_fn {
    ($f:expr, $ty:ty) => {
        Some(mem::transmute::<$ty, unsafe extern "system" fn()>($f))
    };
}

pub unsafe extern "system" fn mock_get_instance_proc_addr(
    _instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    match CStr::from_ptr(p_name).to_bytes() {
        b"vkCreateInstance" => void_fn!(mock_create_instance, vk::PFN_vkCreateInstance),
        b"vkDestroyInstance" => void_fn!(mock_destroy_instance, vk::PFN_vkDestroyInstance),
        b"vkCreateDevice" => void_fn!(mock_create_device, vk::PFN_vkCreateDevice),
        b"vkEnumeratePhysicalDevices" => void_fn!(
            mock_enumerate_physical_devices,
            vk::PFN_vkEnumeratePhysicalDevices
        ),
        b"vkGetPhysicalDeviceProperties" => void_fn!(
            mock_get_physical_device_properties,
            vk::PFN_vkGetPhysicalDeviceProperties
        ),
        b"vkGetPhysicalDeviceMemoryProperties" => void_fn!(
            mock_get_physical_device_memory_properties,
            vk::PFN_vkGetPhysicalDeviceMemoryProperties
        ),
        b"vkGetDeviceProcAddr" => {
            void_fn!(mock_get_device_proc_addr, vk::PFN_vkGetDeviceProcAddr)
        }
        _ => None,
    }
}

pub unsafe extern "system" fn mock_get_device_proc_addr(
    _device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    match CStr::from_ptr(p_name).to_bytes() {
        b"vkDestroyDevice" => void_fn!(mock_destroy_device, vk::PFN_vkDestroyDevice),
        b"vkCreateGraphicsPipelines" => void_fn!(
            mock_create_graphics_pipelines,
            vk::PFN_vkCreateGraphicsPipelines
        ),
        b"vkCreateComputePipelines" => void_fn!(
            mock_create_compute_pipelines,
            vk::PFN_vkCreateComputePipelines
        ),
        b"vkAllocateMemory" => void_fn!(mock_allocate_memory, vk::PFN_vkAllocateMemory),
        b"vkQueueSubmit" => void_fn!(mock_queue_submit, vk::PFN_vkQueueSubmit),
        b"vkDeviceWaitIdle" => void_fn!(mock_device_wait_idle, vk::PFN_vkDeviceWaitIdle),
        b"vkGetDeviceProcAddr" => {
            void_fn!(mock_get_device_proc_addr, vk::PFN_vkGetDeviceProcAddr)
        }
        _ => None,
    }
}

unsafe extern "system" fn mock_create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    if (*p_create_info).enabled_extension_count == FAIL_MARKER {
        return vk::Result::ERROR_INCOMPATIBLE_DRIVER;
    }
    *p_instance = dispatchable(new_dispatch_key());
    vk::Result::SUCCESS
}

unsafe extern "system" fn mock_destroy_instance(
    instance: vk::Instance,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    DESTROYED.lock().unwrap().push(instance.as_raw());
}

unsafe extern "system" fn mock_enumerate_physical_devices(
    _instance: vk::Instance,
    p_physical_device_count: *mut u32,
    _p_physical_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    *p_physical_device_count = ENUMERATE_MARKER;
    vk::Result::INCOMPLETE
}

unsafe extern "system" fn mock_get_physical_device_properties(
    _physical_device: vk::PhysicalDevice,
    p_properties: *mut vk::PhysicalDeviceProperties,
) {
    let mut properties = vk::PhysicalDeviceProperties {
        vendor_id: 0x144D,
        device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
        api_version: vk::make_api_version(0, 1, 3, 0),
        ..Default::default()
    };
    for (dst, src) in properties.device_name.iter_mut().zip(MOCK_DEVICE_NAME.bytes()) {
        *dst = src as c_char;
    }
    *p_properties = properties;
}

unsafe extern "system" fn mock_get_physical_device_memory_properties(
    _physical_device: vk::PhysicalDevice,
    p_memory_properties: *mut vk::PhysicalDeviceMemoryProperties,
) {
    let mut props = vk::PhysicalDeviceMemoryProperties {
        memory_type_count: 2,
        memory_heap_count: 1,
        ..Default::default()
    };
    props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
    props.memory_types[1].property_flags =
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
    props.memory_heaps[0].size = 8 << 30;
    *p_memory_properties = props;
}

unsafe extern "system" fn mock_create_device(
    _physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    if (*p_create_info).enabled_extension_count == FAIL_MARKER {
        return vk::Result::ERROR_FEATURE_NOT_PRESENT;
    }
    *p_device = dispatchable(new_dispatch_key());
    vk::Result::SUCCESS
}

unsafe extern "system" fn mock_destroy_device(
    device: vk::Device,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    DESTROYED.lock().unwrap().push(device.as_raw());
}

unsafe extern "system" fn mock_device_wait_idle(_device: vk::Device) -> vk::Result {
    vk::Result::TIMEOUT
}

/// Failed slots are left untouched, so only the layer's pre-clear makes
/// them null.
unsafe extern "system" fn mock_create_graphics_pipelines(
    device: vk::Device,
    _pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_pipelines: *mut vk::Pipeline,
) -> vk::Result {
    GRAPHICS_BATCHES.lock().unwrap().push(ForwardedBatch {
        device: device.as_raw(),
        count: create_info_count,
        p_create_infos: p_create_infos as usize,
    });
    if create_info_count == 0 || p_create_infos.is_null() || p_pipelines.is_null() {
        return vk::Result::SUCCESS;
    }

    let infos = slice::from_raw_parts(p_create_infos, create_info_count as usize);
    let out = slice::from_raw_parts_mut(p_pipelines, create_info_count as usize);
    let mut result = vk::Result::SUCCESS;
    let mut log = GRAPHICS.lock().unwrap();
    for (ci, slot) in infos.iter().zip(out.iter_mut()) {
        log.push(ForwardedGraphics {
            device: device.as_raw(),
            stage_count: ci.stage_count,
            p_stages: ci.p_stages as usize,
            layout: ci.layout,
            render_pass: ci.render_pass,
            base_pipeline_index: ci.base_pipeline_index,
            cull_mode: ci.p_rasterization_state.as_ref().map(|r| r.cull_mode),
            depth_bias_enable: ci.p_rasterization_state.as_ref().map(|r| r.depth_bias_enable),
            samples: ci.p_multisample_state.as_ref().map(|m| m.rasterization_samples),
        });
        if ci.base_pipeline_index == FAIL_PIPELINE {
            result = vk::Result::ERROR_OUT_OF_DEVICE_MEMORY;
        } else {
            *slot = next_handle();
        }
    }
    result
}

unsafe extern "system" fn mock_create_compute_pipelines(
    device: vk::Device,
    _pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    p_create_infos: *const vk::ComputePipelineCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_pipelines: *mut vk::Pipeline,
) -> vk::Result {
    COMPUTE_BATCHES.lock().unwrap().push(ForwardedBatch {
        device: device.as_raw(),
        count: create_info_count,
        p_create_infos: p_create_infos as usize,
    });
    if create_info_count == 0 || p_create_infos.is_null() || p_pipelines.is_null() {
        return vk::Result::SUCCESS;
    }

    let infos = slice::from_raw_parts(p_create_infos, create_info_count as usize);
    let out = slice::from_raw_parts_mut(p_pipelines, create_info_count as usize);
    let mut result = vk::Result::SUCCESS;
    let mut log = COMPUTE.lock().unwrap();
    for (ci, slot) in infos.iter().zip(out.iter_mut()) {
        log.push(ForwardedCompute {
            device: device.as_raw(),
            stage: ci.stage.stage,
            layout: ci.layout,
        });
        if ci.base_pipeline_index == FAIL_PIPELINE {
            result = vk::Result::ERROR_OUT_OF_DEVICE_MEMORY;
        } else {
            *slot = next_handle();
        }
    }
    result
}

unsafe extern "system" fn mock_allocate_memory(
    device: vk::Device,
    p_allocate_info: *const vk::MemoryAllocateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_memory: *mut vk::DeviceMemory,
) -> vk::Result {
    let info = &*p_allocate_info;
    ALLOCATIONS.lock().unwrap().push(ForwardedAllocation {
        device: device.as_raw(),
        p_allocate_info: p_allocate_info as usize,
        allocation_size: info.allocation_size,
        memory_type_index: info.memory_type_index,
    });
    *p_memory = next_handle();
    vk::Result::SUCCESS
}

unsafe extern "system" fn mock_queue_submit(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo<'_>,
    fence: vk::Fence,
) -> vk::Result {
    SUBMITS.lock().unwrap().push(ForwardedSubmit {
        queue: queue.as_raw(),
        submit_count,
        p_submits: p_submits as usize,
        fence,
    });
    vk::Result::SUCCESS
}

// ── Harness ─────────────────────────────────────────────────

pub fn context_with(configure: impl FnOnce(&mut LayerConfig)) -> LayerContext {
    let mut config = LayerConfig::default();
    configure(&mut config);
    LayerContext::new(config)
}

/// Run the layer's instance creation with a one-link loader chain ending in
/// the mock.
pub unsafe fn create_instance_with(
    ctx: &LayerContext,
    enabled_extension_count: u32,
) -> (vk::Result, vk::Instance) {
    let mut link = LayerInstanceLink {
        p_next: ptr::null_mut(),
        pfn_next_get_instance_proc_addr: mock_get_instance_proc_addr,
        pfn_next_get_physical_device_proc_addr: None,
    };
    let mut layer_info = LayerInstanceCreateInfo {
        s_type: LOADER_INSTANCE_CREATE_INFO,
        p_next: ptr::null(),
        function: LayerFunction::LINK_INFO,
        u: LayerInstanceCreateInfoPayload { p_layer_info: &mut link },
    };
    let mut create_info = vk::InstanceCreateInfo::default();
    create_info.p_next = ptr::addr_of_mut!(layer_info) as *const c_void;
    create_info.enabled_extension_count = enabled_extension_count;

    let mut instance = vk::Instance::null();
    let result = ctx.create_instance(&create_info, ptr::null(), &mut instance);
    (result, instance)
}

/// Run the layer's device creation with a one-link loader chain ending in
/// the mock.
pub unsafe fn create_device_with(
    ctx: &LayerContext,
    physical_device: vk::PhysicalDevice,
    enabled_extension_count: u32,
) -> (vk::Result, vk::Device) {
    let mut link = LayerDeviceLink {
        p_next: ptr::null_mut(),
        pfn_next_get_instance_proc_addr: mock_get_instance_proc_addr,
        pfn_next_get_device_proc_addr: mock_get_device_proc_addr,
    };
    let mut layer_info = LayerDeviceCreateInfo {
        s_type: LOADER_DEVICE_CREATE_INFO,
        p_next: ptr::null(),
        function: LayerFunction::LINK_INFO,
        u: LayerDeviceCreateInfoPayload { p_layer_info: &mut link },
    };
    let mut create_info = vk::DeviceCreateInfo::default();
    create_info.p_next = ptr::addr_of_mut!(layer_info) as *const c_void;
    create_info.enabled_extension_count = enabled_extension_count;

    let mut device = vk::Device::null();
    let result = ctx.create_device(physical_device, &create_info, ptr::null(), &mut device);
    (result, device)
}

/// A device created through `ctx`, together with its instance, physical
/// device and one queue.
pub struct TestDevice {
    pub instance: vk::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: vk::Device,
    pub queue: vk::Queue,
}

pub fn setup_device(ctx: &LayerContext) -> TestDevice {
    unsafe {
        let (result, instance) = create_instance_with(ctx, 0);
        assert_eq!(result, vk::Result::SUCCESS);
        let physical_device: vk::PhysicalDevice = child_of(instance);
        let (result, device) = create_device_with(ctx, physical_device, 0);
        assert_eq!(result, vk::Result::SUCCESS);
        TestDevice {
            instance,
            physical_device,
            device,
            queue: child_of(device),
        }
    }
}

/// A device created through `ctx` without a registered instance, so it has
/// dispatch but no device context.
pub fn setup_device_without_context(ctx: &LayerContext) -> vk::Device {
    unsafe {
        let physical_device: vk::PhysicalDevice = dispatchable(new_dispatch_key());
        let (result, device) = create_device_with(ctx, physical_device, 0);
        assert_eq!(result, vk::Result::SUCCESS);
        device
    }
}
