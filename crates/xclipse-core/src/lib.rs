//! Driver-independent pieces of the Xclipse 940 layer: configuration, error
//! taxonomy, the pipeline record store and the tuning policy applied to
//! intercepted descriptors.

pub mod config;
pub mod error;
pub mod pipeline_store;
pub mod policy;

pub use config::LayerConfig;
pub use error::LayerError;
pub use pipeline_store::{PipelineRecord, PipelineStore};
