use std::collections::HashMap;

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Metadata tracked for a pipeline created through an intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineRecord {
    pub pipeline: vk::Pipeline,
    /// Starts at 1 on creation, only ever incremented.
    pub usage_count: u64,
    pub bind_point: vk::PipelineBindPoint,
    pub shader_stages: vk::ShaderStageFlags,
    /// Store-wide creation sequence number. A handle value that is handed out
    /// again by the driver gets a fresh record with a newer generation.
    pub generation: u64,
}

/// Pipeline handle -> record map guarded by a single lock.
///
/// Every read and write goes through the same mutex, and callers never hold
/// it across a call into the next layer.
pub struct PipelineStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    records: HashMap<vk::Pipeline, PipelineRecord>,
    next_generation: u64,
}

impl PipelineStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                next_generation: 1,
            }),
        }
    }

    /// Record a batch of freshly created pipelines under one lock acquisition.
    ///
    /// Null handles are the driver's way of marking failed batch entries and
    /// are skipped. Returns the handles that were recorded, in batch order.
    pub fn record_created<I>(&self, bind_point: vk::PipelineBindPoint, created: I) -> Vec<vk::Pipeline>
    where
        I: IntoIterator<Item = (vk::Pipeline, vk::ShaderStageFlags)>,
    {
        let mut inner = self.inner.lock();
        let mut recorded = Vec::new();
        for (pipeline, shader_stages) in created {
            if pipeline == vk::Pipeline::null() {
                continue;
            }
            let generation = inner.next_generation;
            inner.next_generation += 1;
            let record = PipelineRecord {
                pipeline,
                usage_count: 1,
                bind_point,
                shader_stages,
                generation,
            };
            if let Some(stale) = inner.records.insert(pipeline, record) {
                debug!(
                    "pipeline 0x{:x} reused, replacing generation {} with {}",
                    pipeline.as_raw(),
                    stale.generation,
                    generation
                );
            }
            recorded.push(pipeline);
        }
        trace!("recorded {} {:?} pipelines", recorded.len(), bind_point);
        recorded
    }

    /// Increment the usage counter of each known pipeline.
    /// Unknown handles are ignored. Returns how many records were updated.
    pub fn bump_usage(&self, pipelines: &[vk::Pipeline]) -> usize {
        let mut inner = self.inner.lock();
        let mut updated = 0;
        for pipeline in pipelines {
            if let Some(record) = inner.records.get_mut(pipeline) {
                record.usage_count += 1;
                updated += 1;
            }
        }
        updated
    }

    /// Look up the record for a pipeline.
    pub fn get(&self, pipeline: vk::Pipeline) -> Option<PipelineRecord> {
        self.inner.lock().records.get(&pipeline).copied()
    }

    /// Return number of tracked pipelines.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}

impl Default for PipelineStore {
    fn default() -> Self {
        Self::new()
    }
}
