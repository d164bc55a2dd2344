//! Compute pipeline creation and the compute post-creation pass.

use std::slice;

use ash::vk;
use tracing::{debug, trace};

use xclipse_core::LayerError;

use crate::context::LayerContext;
use crate::dispatch::required;
use crate::{into_vk_result, layer};

impl LayerContext {
    /// # Safety
    /// Arguments must satisfy the `vkCreateComputePipelines` contract.
    pub unsafe fn create_compute_pipelines(
        &self,
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::ComputePipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> vk::Result {
        into_vk_result(
            "vkCreateComputePipelines",
            self.try_create_compute_pipelines(
                device,
                pipeline_cache,
                create_info_count,
                p_create_infos,
                p_allocator,
                p_pipelines,
            ),
        )
    }

    unsafe fn try_create_compute_pipelines(
        &self,
        device: vk::Device,
        pipeline_cache: vk::PipelineCache,
        create_info_count: u32,
        p_create_infos: *const vk::ComputePipelineCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_pipelines: *mut vk::Pipeline,
    ) -> Result<vk::Result, LayerError> {
        let dispatch = self
            .dispatch
            .device_for(device)
            .ok_or(LayerError::NotInitialized { entry_point: "vkCreateComputePipelines" })?;
        let create = required(dispatch.create_compute_pipelines, "vkCreateComputePipelines")?;

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
        slice::from_raw_parts_mut(p_pipelines, count).fill(vk::Pipeline::null());
        let result = create(
            device,
            pipeline_cache,
            create_info_count,
            p_create_infos,
            p_allocator,
            p_pipelines,
        );

        let originals = slice::from_raw_parts(p_create_infos, count);
        let created = slice::from_raw_parts(p_pipelines, count);
        let recorded = self.pipelines.record_created(
            vk::PipelineBindPoint::COMPUTE,
            created
                .iter()
                .zip(originals)
                .map(|(pipeline, ci)| (*pipeline, ci.stage.stage)),
        );

        if self.config.pipelines.compute_post_pass {
            let bumped = self.pipelines.bump_usage(&recorded);
            trace!("compute post-pass touched {} pipelines", bumped);
        }

        debug!(
            "vkCreateComputePipelines: {}/{} created, result {:?}",
            recorded.len(),
            count,
            result
        );
        Ok(result)
    }
}

pub unsafe extern "system" fn create_compute_pipelines(
    device: vk::Device,
    pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    p_create_infos: *const vk::ComputePipelineCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_pipelines: *mut vk::Pipeline,
) -> vk::Result {
    layer().create_compute_pipelines(
        device,
        pipeline_cache,
        create_info_count,
        p_create_infos,
        p_allocator,
        p_pipelines,
    )
}
