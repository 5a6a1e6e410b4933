pub mod backend;
pub mod compositor;
pub mod environment;
pub mod gbuffer;
pub mod headless;

pub use backend::{
    BackendCapabilities,
    RenderBackend,
    RenderPath,
    RenderTarget,
};
pub use compositor::{
    CompositeMode,
    DeferredCompositor,
    ResolveUniforms,
};
pub use environment::EnvironmentMap;
pub use gbuffer::{
    GBuffer,
    GBufferAttachment,
};
pub use headless::{
    HeadlessBackend,
    RenderCommand,
};
