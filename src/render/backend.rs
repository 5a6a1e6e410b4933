use bevy::prelude::*;

use crate::{
    batch::{
        material::SplatMaterial,
        BatchId,
    },
    gaussian::packed::PackedTexture,
    render::{
        compositor::ResolveUniforms,
        environment::EnvironmentMap,
        gbuffer::GBuffer,
    },
    sort::DepthIndex,
};


/// Colour attachments the g-buffer needs without the optional normal target.
pub const MIN_DEFERRED_ATTACHMENTS: u32 = 3;


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackendCapabilities {
    pub max_color_attachments: u32,
    pub max_texture_dimension_2d: u32,
}

impl BackendCapabilities {
    pub fn from_wgpu(limits: &wgpu::Limits) -> Self {
        Self {
            max_color_attachments: limits.max_color_attachments,
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
        }
    }

    /// resolved once, forward when deferred is off or unsupported
    pub fn render_path(&self, deferred_requested: bool) -> RenderPath {
        if !deferred_requested || self.max_color_attachments < MIN_DEFERRED_ATTACHMENTS {
            return RenderPath::Forward;
        }

        RenderPath::Deferred {
            normal_attachment: self.max_color_attachments > MIN_DEFERRED_ATTACHMENTS,
        }
    }
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self::from_wgpu(&wgpu::Limits::default())
    }
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenderPath {
    Deferred {
        normal_attachment: bool,
    },
    Forward,
}

impl RenderPath {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenderTarget {
    GBuffer,
    Frame,
}


/// Draw submission surface the compositor drives on the render thread.
pub trait RenderBackend: Send + Sync + 'static {
    fn capabilities(&self) -> BackendCapabilities;

    fn create_gbuffer(&mut self, gbuffer: &GBuffer);

    fn upload_batch(
        &mut self,
        batch: BatchId,
        revision: u64,
        texture: &PackedTexture,
        depth_index: &DepthIndex,
    );

    fn upload_environment_map(&mut self, environment: &EnvironmentMap);

    fn bind_target(&mut self, target: RenderTarget);

    /// zeroes every attachment of the bound target
    fn clear(&mut self);

    fn bind_material(&mut self, batch: BatchId, entity: Option<Entity>, material: &SplatMaterial);

    fn draw_batch(&mut self, batch: BatchId, instance_count: usize);

    fn draw_resolve(&mut self, uniforms: &ResolveUniforms);
}
