use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("Texture '{label}' expects {expected} bytes for {width}x{height}, got {actual}")]
    TextureSize {
        label: String,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
