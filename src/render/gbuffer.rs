use bevy::math::UVec2;


pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;


#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
)]
pub enum GBufferAttachment {
    Color,
    Position,
    Pbr,
    Normal,
}

impl GBufferAttachment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Color => "splat_gbuffer_color",
            Self::Position => "splat_gbuffer_position",
            Self::Pbr => "splat_gbuffer_pbr",
            Self::Normal => "splat_gbuffer_normal",
        }
    }
}


/// Attachment set for one viewport size, cleared to zero every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GBuffer {
    size: UVec2,
    attachments: Vec<GBufferAttachment>,
}

impl GBuffer {
    pub fn new(size: UVec2, with_normal: bool) -> Self {
        let mut attachments = vec![
            GBufferAttachment::Color,
            GBufferAttachment::Position,
            GBufferAttachment::Pbr,
        ];
        if with_normal {
            attachments.push(GBufferAttachment::Normal);
        }

        Self {
            size,
            attachments,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn attachments(&self) -> &[GBufferAttachment] {
        &self.attachments
    }

    pub fn texture_descriptors(&self) -> Vec<wgpu::TextureDescriptor<'static>> {
        self.attachments
            .iter()
            .map(|attachment| wgpu::TextureDescriptor {
                label: Some(attachment.label()),
                size: wgpu::Extent3d {
                    width: self.size.x.max(1),
                    height: self.size.y.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: GBUFFER_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .collect()
    }

    /// additive blending into the zero-cleared attachments
    pub fn color_target_states(&self) -> Vec<Option<wgpu::ColorTargetState>> {
        self.attachments
            .iter()
            .map(|_| Some(wgpu::ColorTargetState {
                format: GBUFFER_FORMAT,
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                }),
                write_mask: wgpu::ColorWrites::ALL,
            }))
            .collect()
    }
}
