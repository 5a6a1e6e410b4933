use bevy::prelude::*;

use crate::batch::BatchId;


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Reflect,
)]
pub enum MaterialTarget {
    /// shades straight into the frame
    #[default]
    Forward,
    /// writes color, position, pbr and normal attachments for the resolve pass
    Deferred,
}


/// Per-batch material parameters, bound to one texture and depth index revision.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Reflect,
)]
pub struct SplatMaterial {
    pub batch: BatchId,
    pub target: MaterialTarget,
    pub revision: u64,
    pub focal: Vec2,
    pub viewport: UVec2,
    pub alpha_discard_epsilon: f32,
}

impl SplatMaterial {
    pub fn forward(batch: BatchId, revision: u64) -> Self {
        Self {
            batch,
            target: MaterialTarget::Forward,
            revision,
            focal: Vec2::ZERO,
            viewport: UVec2::ZERO,
            alpha_discard_epsilon: crate::settings::ALPHA_DISCARD_EPSILON,
        }
    }

    pub fn to_deferred(&self) -> Self {
        Self {
            target: MaterialTarget::Deferred,
            ..self.clone()
        }
    }

    pub fn is_current(&self, revision: u64, focal: Vec2, viewport: UVec2) -> bool {
        self.revision == revision && self.focal == focal && self.viewport == viewport
    }
}
