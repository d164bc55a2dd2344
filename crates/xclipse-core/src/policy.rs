//! Tuning applied to intercepted descriptors.
//!
//! Every function here is pure: it reads a caller descriptor and returns an
//! owned, adjusted copy. Shader stages, layouts and render targets are never
//! touched.

use ash::vk;

/// Smallest multiple of `alignment` that is >= `size`.
///
/// Sizes whose rounded value would not fit in a `DeviceSize`, and a zero
/// alignment, leave the size unchanged.
pub fn align_allocation_size(size: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    if alignment == 0 {
        return size;
    }
    size.div_ceil(alignment)
        .checked_mul(alignment)
        .unwrap_or(size)
}

/// Mobile rasterization defaults: no depth bias, no depth clamp, no
/// rasterizer discard, and back-face culling when culling was off.
pub fn tune_rasterization_state<'a>(
    state: &vk::PipelineRasterizationStateCreateInfo<'a>,
) -> vk::PipelineRasterizationStateCreateInfo<'a> {
    let mut tuned = *state;
    tuned.depth_bias_enable = vk::FALSE;
    tuned.depth_clamp_enable = vk::FALSE;
    tuned.rasterizer_discard_enable = vk::FALSE;
    if tuned.cull_mode == vk::CullModeFlags::NONE {
        tuned.cull_mode = vk::CullModeFlags::BACK;
    }
    tuned
}

/// Clamp a single-bit sample count to `max_samples`.
pub fn clamp_sample_count(samples: vk::SampleCountFlags, max_samples: u32) -> vk::SampleCountFlags {
    if samples == vk::SampleCountFlags::TYPE_1 || samples.as_raw() <= max_samples {
        samples
    } else {
        vk::SampleCountFlags::from_raw(max_samples)
    }
}

pub fn tune_multisample_state<'a>(
    state: &vk::PipelineMultisampleStateCreateInfo<'a>,
    max_samples: u32,
) -> vk::PipelineMultisampleStateCreateInfo<'a> {
    let mut tuned = *state;
    tuned.rasterization_samples = clamp_sample_count(state.rasterization_samples, max_samples);
    tuned
}

/// Workload guess for a queue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionClass {
    Compute,
    Transfer,
    Graphics,
}

/// Many command buffers look like compute, a single one like a transfer,
/// anything else is treated as graphics.
pub fn classify_submission(command_buffer_count: u32) -> SubmissionClass {
    match command_buffer_count {
        n if n > 2 => SubmissionClass::Compute,
        1 => SubmissionClass::Transfer,
        _ => SubmissionClass::Graphics,
    }
}

/// Whether memory type `index` is device-local, or `None` when the index is
/// outside the reported types.
pub fn is_device_local(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    index: u32,
) -> Option<bool> {
    if index >= memory_properties.memory_type_count {
        return None;
    }
    memory_properties
        .memory_types
        .get(index as usize)
        .map(|ty| ty.property_flags.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL))
}
