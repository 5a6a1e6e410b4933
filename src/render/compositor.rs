use std::collections::HashMap;

use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};

use crate::{
    batch::{
        BatchId,
        BatchManager,
        GBufferEntry,
    },
    camera::CameraMatrices,
    render::{
        backend::{
            BackendCapabilities,
            RenderBackend,
            RenderPath,
            RenderTarget,
        },
        environment::EnvironmentMap,
        gbuffer::GBuffer,
    },
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
)]
pub enum CompositeMode {
    Color,
    Position,
    Pbr,
    Normal,
    #[default]
    Lit,
}

impl CompositeMode {
    pub const ALL: [Self; 5] = [
        Self::Color,
        Self::Position,
        Self::Pbr,
        Self::Normal,
        Self::Lit,
    ];

    pub fn index(&self) -> u32 {
        *self as u32
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() as usize + 1) % Self::ALL.len()]
    }
}


/// Resolve pass uniforms, laid out for a uniform buffer.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ResolveUniforms {
    pub inverse_projection: Mat4,
    pub world_from_view: Mat4,
    pub viewport: UVec2,
    pub mode: u32,
    /// zero without an environment map
    pub environment_factor: f32,
}


/// Owns the g-buffer and resolves every visible batch into the frame.
#[derive(Debug)]
pub struct DeferredCompositor {
    capabilities: BackendCapabilities,
    path: RenderPath,
    gbuffer: Option<GBuffer>,
    mode: CompositeMode,
    environment: Option<EnvironmentMap>,
    environment_uploaded: bool,
    uploaded: HashMap<BatchId, u64>,
}

impl DeferredCompositor {
    pub fn new(capabilities: BackendCapabilities, deferred_requested: bool) -> Self {
        let path = capabilities.render_path(deferred_requested);

        if deferred_requested && !path.is_deferred() {
            warn!(
                "deferred splat rendering needs {} colour attachments, backend offers {}; using forward rendering",
                crate::render::backend::MIN_DEFERRED_ATTACHMENTS,
                capabilities.max_color_attachments,
            );
        }

        Self {
            capabilities,
            path,
            gbuffer: None,
            mode: CompositeMode::default(),
            environment: None,
            environment_uploaded: false,
            uploaded: HashMap::new(),
        }
    }

    pub fn path(&self) -> RenderPath {
        self.path
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    pub fn gbuffer(&self) -> Option<&GBuffer> {
        self.gbuffer.as_ref()
    }

    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    /// advances to the next display mode
    pub fn set_mode(&mut self) -> CompositeMode {
        self.mode = self.mode.next();
        self.mode
    }

    pub fn environment(&self) -> Option<&EnvironmentMap> {
        self.environment.as_ref()
    }

    pub fn set_environment_map(&mut self, environment: EnvironmentMap) {
        info!("environment map loaded, {} texel faces", environment.face_size());
        self.environment = Some(environment);
        self.environment_uploaded = false;
    }

    /// Recreates the attachments when the size changed, false otherwise.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, size: UVec2) -> bool {
        let RenderPath::Deferred { normal_attachment } = self.path else {
            return false;
        };

        if self.gbuffer.as_ref().is_some_and(|gbuffer| gbuffer.size() == size) {
            return false;
        }

        let gbuffer = GBuffer::new(size, normal_attachment);
        backend.create_gbuffer(&gbuffer);
        self.gbuffer = Some(gbuffer);
        debug!("g-buffer resized to {}x{}", size.x, size.y);
        true
    }

    fn upload_changed(&mut self, backend: &mut dyn RenderBackend, manager: &BatchManager, entries: &[GBufferEntry]) {
        for entry in entries {
            let Some(batch) = manager.batch(entry.batch) else {
                continue;
            };
            let Some(texture) = batch.texture() else {
                continue;
            };

            if self.uploaded.get(&entry.batch) == Some(&batch.revision()) {
                continue;
            }

            backend.upload_batch(entry.batch, batch.revision(), texture, batch.depth_index());
            self.uploaded.insert(entry.batch, batch.revision());
        }

        if let (Some(environment), false) = (&self.environment, self.environment_uploaded) {
            backend.upload_environment_map(environment);
            self.environment_uploaded = true;
        }
    }

    pub fn resolve_uniforms(&self, camera: &CameraMatrices) -> ResolveUniforms {
        ResolveUniforms {
            inverse_projection: camera.projection.inverse(),
            world_from_view: camera.view.inverse(),
            viewport: camera.viewport,
            mode: self.mode.index(),
            environment_factor: if self.environment.is_some() { 1.0 } else { 0.0 },
        }
    }

    /// Submits one frame for every visible batch in draw order.
    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        manager: &mut BatchManager,
        camera: &CameraMatrices,
    ) {
        let entries = manager.gbuffer_entries();
        self.upload_changed(backend, manager, &entries);

        if !self.path.is_deferred() {
            backend.bind_target(RenderTarget::Frame);
            for entry in &entries {
                backend.bind_material(entry.batch, entry.entity, &entry.forward_material);
                backend.draw_batch(entry.batch, entry.instance_count);
            }
            return;
        }

        self.resize(backend, camera.viewport);

        backend.bind_target(RenderTarget::GBuffer);
        backend.clear();

        for entry in &entries {
            backend.bind_material(entry.batch, entry.entity, &entry.deferred_material);
            backend.draw_batch(entry.batch, entry.instance_count);
            backend.bind_material(entry.batch, entry.entity, &entry.forward_material);
        }

        backend.bind_target(RenderTarget::Frame);
        backend.draw_resolve(&self.resolve_uniforms(camera));
    }

    /// forgets uploads, used on scene reset
    pub fn reset(&mut self) {
        self.uploaded.clear();
    }
}
