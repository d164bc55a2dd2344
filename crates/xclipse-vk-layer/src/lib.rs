//! Xclipse 940 Vulkan layer
//!
//! This cdylib sits between an application and the Vulkan driver. The loader
//! negotiates an interface version, then resolves every entry point through
//! this layer's `vkGetInstanceProcAddr` / `vkGetDeviceProcAddr`. A handful of
//! entry points are intercepted (pipeline creation, memory allocation, queue
//! submission and the instance/device lifecycle); everything else resolves
//! straight to the next layer's pointer and never passes through here.

use std::ffi::c_char;
use std::sync::OnceLock;

use ash::vk;
use tracing::{debug, info, warn};

use xclipse_core::config::default_config_path;
use xclipse_core::{LayerConfig, LayerError};

pub mod context;
pub mod device;
pub mod dispatch;
pub mod graphics_pipeline;
pub mod instance;
pub mod loader;
pub mod memory;
pub mod pipeline;
pub mod proc_table;
pub mod sync;

pub use context::LayerContext;
pub use instance::LAYER_IDENTITY;

use loader::{NegotiateLayerInterface, NegotiateLayerStructType};

/// Oldest loader-layer interface this layer accepts.
pub const MIN_LOADER_LAYER_INTERFACE_VERSION: u32 = 2;
/// Interface version this layer implements.
pub const CURRENT_LOADER_LAYER_INTERFACE_VERSION: u32 = 2;

// ── Layer singleton ─────────────────────────────────────────

static LAYER: OnceLock<LayerContext> = OnceLock::new();

/// The process-wide context behind the exported entry points.
pub fn layer() -> &'static LayerContext {
    LAYER.get_or_init(|| {
        let path = default_config_path();
        LayerContext::new(LayerConfig::load_or_default(&path))
    })
}

/// Convert an interceptor's outcome into the code returned to the caller.
pub(crate) fn into_vk_result(
    entry_point: &str,
    outcome: Result<vk::Result, LayerError>,
) -> vk::Result {
    match outcome {
        Ok(result) => result,
        Err(LayerError::Forwarded(result)) => {
            debug!("{}: next layer returned {:?}", entry_point, result);
            result
        }
        Err(e) => {
            warn!("{}: {}", entry_point, e);
            e.to_vk_result()
        }
    }
}

// ── Negotiation ─────────────────────────────────────────────

/// Fill in the loader's negotiation record and return the version written.
///
/// A null record or an unknown type tag is rejected without writing anything.
pub fn negotiate(interface: Option<&mut NegotiateLayerInterface>) -> Result<u32, LayerError> {
    let interface = interface.ok_or(LayerError::NotInitialized {
        entry_point: "vkNegotiateLoaderLayerInterfaceVersion",
    })?;
    if interface.s_type != NegotiateLayerStructType::INTERFACE_STRUCT {
        return Err(LayerError::UnknownNegotiationStruct(interface.s_type.0));
    }

    if interface.loader_layer_interface_version >= MIN_LOADER_LAYER_INTERFACE_VERSION {
        interface.pfn_get_instance_proc_addr = Some(vkGetInstanceProcAddr);
        interface.pfn_get_device_proc_addr = Some(vkGetDeviceProcAddr);
        interface.pfn_get_physical_device_proc_addr = None;
    }
    interface.loader_layer_interface_version = CURRENT_LOADER_LAYER_INTERFACE_VERSION;
    Ok(CURRENT_LOADER_LAYER_INTERFACE_VERSION)
}

#[no_mangle]
pub unsafe extern "system" fn vkNegotiateLoaderLayerInterfaceVersion(
    p_version_struct: *mut NegotiateLayerInterface,
) -> vk::Result {
    xclipse_common::logging::init_logging();
    match negotiate(p_version_struct.as_mut()) {
        Ok(version) => {
            info!(
                "{} negotiated loader interface v{}",
                LAYER_IDENTITY.name, version
            );
            vk::Result::SUCCESS
        }
        Err(e) => {
            warn!("layer negotiation rejected: {}", e);
            e.to_vk_result()
        }
    }
}

// ── Proc resolution ─────────────────────────────────────────

#[no_mangle]
pub unsafe extern "system" fn vkGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    layer().resolve_instance_proc(instance, p_name)
}

#[no_mangle]
pub unsafe extern "system" fn vkGetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    layer().resolve_device_proc(device, p_name)
}
