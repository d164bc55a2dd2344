//! Graphics pipeline creation.

use std::slice;

use ash::vk;
use tracing::debug;

use xclipse_core::policy;
use xclipse_core::LayerError;

use crate::context::LayerContext;
use crate::dispatch::required;
use crate::{into_vk_result, layer};

/// Union of the shader stages declared by a descriptor.
unsafe fn declared_stages(ci: &vk::GraphicsPipelineCreateInfo<'_>) -> vk::ShaderStageFlags {
    if ci.p_stages.is_null() || ci.stage_count == 0 {
        return vk::ShaderStageFlags::empty();
    }
    slice::from_raw_parts(ci.p_stages, ci.stage_count as usize)
        .iter()
        .fold(vk::ShaderStageFlags::empty(), |acc, stage| acc | stage.stage)
}

impl LayerContext {
    /// # Safety
    /// Arguments must satisfy the `vkCreateGraphicsPipelines` contract.
    pub unsafe fn create_graphics_pipelines(
        &self,
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        into_vk_result(
            "vkCreateGraphicsPipelines",
            self.try_create_graphics_pipelines(
                device,
                pipeline_cache,
                create_info_count,
                p_create_infos,
                p_allocator,
                p_pipelines,
            ),
        )
    }

    unsafe fn try_create_graphics_pipelines(
        &self,
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> Result<vk::Result, LayerError> {
        let dispatch = self
            .dispatch
            .device_for(device)
            .ok_or(LayerError::NotInitialized { entry_point: "vkCreateGraphicsPipelines" })?;
        let create = required(dispatch.create_graphics_pipelines, "vkCreateGraphicsPipelines")?;

        if create_info_count == 0 || p_create_infos.is_null() || p_pipelines.is_null() {
            return Ok(create(
                device,
                pipeline_cache,
                create_info_count,
                p_create_infos,
                p_allocator,
                p_pipelines,
            ));
        }

        let count = create_info_count as usize;
        let originals = slice::from_raw_parts(p_create_infos, count);

        // Owned copies of the tuned sub-states. They must not move until the
        // forwarded call returns.
        let tuning = self.device_context(device).is_some();
        let config = &self.config.pipelines;
        let rasterization: Vec<Option<vk::PipelineRasterizationStateCreateInfo<'_>>> = originals
            .iter()
            .map(|ci| {
                ci.p_rasterization_state
                    .as_ref()
                    .filter(|_| tuning && config.rasterization_defaults)
                    .map(policy::tune_rasterization_state)
            })
            .collect();
        let multisample: Vec<Option<vk::PipelineMultisampleStateCreateInfo<'_>>> = originals
            .iter()
            .map(|ci| {
                ci.p_multisample_state
                    .as_ref()
                    .filter(|_| tuning)
                    .map(|state| {
                        policy::tune_multisample_state(state, config.max_rasterization_samples)
                    })
            })
            .collect();

        let tuned: Vec<vk::GraphicsPipelineCreateInfo<'_>> = originals
            .iter()
            .zip(rasterization.iter().zip(multisample.iter()))
            .map(|(ci, (raster, msaa))| {
                let mut copy = *ci;
                if let Some(raster) = raster {
                    copy.p_rasterization_state = raster as *const _;
                }
                if let Some(msaa) = msaa {
                    copy.p_multisample_state = msaa as *const _;
                }
                copy
            })
            .collect();

        slice::from_raw_parts_mut(p_pipelines, count).fill(vk::Pipeline::null());
        let result = create(
            device,
            pipeline_cache,
            create_info_count,
            tuned.as_ptr(),
            p_allocator,
            p_pipelines,
        );

        let created = slice::from_raw_parts(p_pipelines, count);
        let recorded = self.pipelines.record_created(
            vk::PipelineBindPoint::GRAPHICS,
            created
                .iter()
                .zip(originals)
                .map(|(pipeline, ci)| (*pipeline, declared_stages(ci))),
        );
        debug!(
            "vkCreateGraphicsPipelines: {}/{} created, result {:?}, tuned {}",
            recorded.len(),
            count,
            result,
            tuning
        );
        Ok(result)
    }
}

pub unsafe extern "system" fn create_graphics_pipelines(
    device: vk::Device,
    pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    p_create_infos: *const vk::GraphicsPipelineCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_pipelines: *mut vk::Pipeline,
) -> vk::Result {
    layer().create_graphics_pipelines(
        device,
        pipeline_cache,
        create_info_count,
        p_create_infos,
        p_allocator,
        p_pipelines,
    )
}
