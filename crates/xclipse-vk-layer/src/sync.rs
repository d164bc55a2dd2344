//! Queue submission.

use std::slice;

use ash::vk;
use tracing::trace;

use xclipse_core::policy;
use xclipse_core::LayerError;

use crate::context::LayerContext;
use crate::dispatch::required;
use crate::{into_vk_result, layer};

impl LayerContext {
    /// Classify each submission for bookkeeping, then forward the batch and
    /// fence exactly as given.
    ///
    /// # Safety
    /// Arguments must satisfy the `vkQueueSubmit` contract.
    pub unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submit_count: u32,
        p_submits: *const vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> vk::Result {
        into_vk_result(
            "vkQueueSubmit",
            self.try_queue_submit(queue, submit_count, p_submits, fence),
        )
    }

    unsafe fn try_queue_submit(
        &self,
        queue: vk::Queue,
        submit_count: u32,
        p_submits: *const vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> Result<vk::Result, LayerError> {
        let dispatch = self
            .dispatch
            .device_for(queue)
            .ok_or(LayerError::NotInitialized { entry_point: "vkQueueSubmit" })?;
        let submit = required(dispatch.queue_submit, "vkQueueSubmit")?;

        if self.config.submission.classify && !p_submits.is_null() && submit_count > 0 {
            for si in slice::from_raw_parts(p_submits, submit_count as usize) {
                let class = policy::classify_submission(si.command_buffer_count);
                self.submissions.record(class);
                trace!(
                    "submit with {} command buffers classified {:?}",
                    si.command_buffer_count,
                    class
                );
            }
        }

        Ok(submit(queue, submit_count, p_submits, fence))
    }
}

pub unsafe extern "system" fn queue_submit(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo<'_>,
    fence: vk::Fence,
) -> vk::Result {
    layer().queue_submit(queue, submit_count, p_submits, fence)
}
