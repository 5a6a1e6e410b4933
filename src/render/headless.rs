use std::collections::VecDeque;

use bevy::prelude::*;

use crate::{
    batch::{
        material::{
            MaterialTarget,
            SplatMaterial,
        },
        BatchId,
    },
    gaussian::packed::PackedTexture,
    render::{
        backend::{
            BackendCapabilities,
            RenderBackend,
            RenderTarget,
        },
        compositor::ResolveUniforms,
        environment::EnvironmentMap,
        gbuffer::{
            GBuffer,
            GBufferAttachment,
        },
    },
    sort::DepthIndex,
};


#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    CreateGBuffer {
        size: UVec2,
        attachments: Vec<GBufferAttachment>,
    },
    UploadBatch {
        batch: BatchId,
        revision: u64,
        splats: usize,
        texture_size: UVec2,
    },
    UploadEnvironmentMap {
        face_size: usize,
    },
    BindTarget(RenderTarget),
    Clear,
    BindMaterial {
        batch: BatchId,
        target: MaterialTarget,
    },
    Draw {
        batch: BatchId,
        instances: usize,
    },
    Resolve {
        mode: u32,
        environment_factor: f32,
    },
}


/// Records submissions instead of issuing them, for tooling and tests.
#[derive(Clone, Debug, Default)]
pub struct HeadlessBackend {
    capabilities: BackendCapabilities,
    commands: VecDeque<RenderCommand>,
    command_limit: Option<usize>,
}

impl HeadlessBackend {
    pub fn new(capabilities: BackendCapabilities) -> Self {
        Self {
            capabilities,
            commands: VecDeque::new(),
            command_limit: None,
        }
    }

    /// keeps only the newest `limit` commands, for long running apps
    pub fn with_command_limit(mut self, limit: usize) -> Self {
        self.command_limit = Some(limit);
        self
    }

    pub fn with_color_attachments(max_color_attachments: u32) -> Self {
        Self::new(BackendCapabilities {
            max_color_attachments,
            ..default()
        })
    }

    /// recorded commands, oldest first
    pub fn commands(&self) -> &VecDeque<RenderCommand> {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands).into()
    }

    pub fn instances_drawn(&self) -> usize {
        self.commands
            .iter()
            .map(|command| match command {
                RenderCommand::Draw { instances, .. } => *instances,
                _ => 0,
            })
            .sum()
    }

    fn record(&mut self, command: RenderCommand) {
        self.commands.push_back(command);

        if let Some(limit) = self.command_limit {
            while self.commands.len() > limit {
                self.commands.pop_front();
            }
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_gbuffer(&mut self, gbuffer: &GBuffer) {
        self.record(RenderCommand::CreateGBuffer {
            size: gbuffer.size(),
            attachments: gbuffer.attachments().to_vec(),
        });
    }

    fn upload_batch(
        &mut self,
        batch: BatchId,
        revision: u64,
        texture: &PackedTexture,
        _depth_index: &DepthIndex,
    ) {
        self.record(RenderCommand::UploadBatch {
            batch,
            revision,
            splats: texture.vertex_count(),
            texture_size: UVec2::new(texture.width(), texture.height()),
        });
    }

    fn upload_environment_map(&mut self, environment: &EnvironmentMap) {
        self.record(RenderCommand::UploadEnvironmentMap {
            face_size: environment.face_size(),
        });
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.record(RenderCommand::BindTarget(target));
    }

    fn clear(&mut self) {
        self.record(RenderCommand::Clear);
    }

    fn bind_material(&mut self, batch: BatchId, _entity: Option<Entity>, material: &SplatMaterial) {
        self.record(RenderCommand::BindMaterial {
            batch,
            target: material.target,
        });
    }

    fn draw_batch(&mut self, batch: BatchId, instance_count: usize) {
        self.record(RenderCommand::Draw {
            batch,
            instances: instance_count,
        });
    }

    fn draw_resolve(&mut self, uniforms: &ResolveUniforms) {
        self.record(RenderCommand::Resolve {
            mode: uniforms.mode,
            environment_factor: uniforms.environment_factor,
        });
    }
}
