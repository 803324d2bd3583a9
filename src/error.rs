use thiserror::Error;

/// Failures during start-up. Every variant is fatal for the process.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to create overlay window: {0}")]
    Window(#[source] anyhow::Error),

    #[error("Failed to create Direct3D device: {0}")]
    Device(#[source] anyhow::Error),

    #[error("Failed to create swap chain: {0}")]
    SwapChain(#[source] anyhow::Error),

    #[error("Failed to allocate offscreen targets: {0}")]
    Targets(#[source] anyhow::Error),

    #[error("Failed to build shader '{name}': {source}")]
    Shader {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to create pipeline state: {0}")]
    Pipeline(#[source] anyhow::Error),
}

/// Per-frame faults. None of them stop the render loop.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Back buffer is unavailable")]
    BackBufferUnavailable,

    #[error("Swap chain resize to {width}x{height} failed: {source}")]
    Resize {
        width: u32,
        height: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to map blur parameters: {0}")]
    Map(#[source] anyhow::Error),

    #[error("Present failed: {0}")]
    Present(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("No desktop update within the timeout")]
    Timeout,

    #[error("Desktop duplication access lost")]
    AccessLost,

    #[error("Desktop duplication failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Adapter has no output to duplicate")]
    NoOutput,

    #[error("Failed to duplicate output: {0}")]
    Duplicate(String),
}

impl FrameError {
    /// Resize and back-buffer faults are retried on the next resize or render.
    pub fn retry_on_next_frame(&self) -> bool {
        matches!(self, Self::BackBufferUnavailable | Self::Resize { .. })
    }
}

impl AcquireError {
    /// Whether the duplication source must be dropped and re-created.
    pub fn invalidates_source(&self) -> bool {
        matches!(self, Self::AccessLost)
    }
}
