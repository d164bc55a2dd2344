use ash::vk;

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// A forwarded entry point was needed before it was captured.
    #[error("next-layer entry point not initialized: {entry_point}")]
    NotInitialized { entry_point: &'static str },

    #[error("loader link info missing from {0} pNext chain")]
    MissingLinkInfo(&'static str),

    #[error("unrecognized negotiation struct type: {0}")]
    UnknownNegotiationStruct(i32),

    #[error("next layer returned {0:?}")]
    Forwarded(vk::Result),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LayerError {
    /// Status code reported to the caller for this error.
    ///
    /// Forwarded failures are passed through verbatim; everything the layer
    /// raises itself is an initialization failure.
    pub fn to_vk_result(&self) -> vk::Result {
        match self {
            LayerError::Forwarded(code) => *code,
            _ => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }
}

impl From<vk::Result> for LayerError {
    fn from(code: vk::Result) -> Self {
        LayerError::Forwarded(code)
    }
}
