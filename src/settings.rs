use bevy::prelude::*;
use bevy_args::{
    Deserialize,
    Parser,
    Serialize,
};

use crate::sort::{
    CullMargin,
    SortMode,
};


/// floats per raw splat record in the richest layout
pub const RAW_FLOAT_PER_SPLAT: usize = 28;

/// 32-bit words per packed splat record
pub const PACKED_FLOAT_PER_SPLAT: usize = 16;

/// rgba texels per packed splat record
pub const PACKED_PIX_PER_SPLAT: usize = 4;

/// splats per packed texture row, also the depth index row capacity
pub const DATA_TEXTURE_WIDTH: usize = 1024;

pub const DEPTH_BUCKETS: usize = 256 * 256;

pub const MAX_VISIBLE_TRUNKS: usize = 256;

pub const ALPHA_DISCARD_EPSILON: f32 = 0.005;


#[derive(
    Clone,
    Debug,
    Resource,
    Reflect,
    Serialize,
    Deserialize,
    Parser,
)]
#[reflect(Resource)]
#[command(about = "bevy_splat_stream", version, long_about = None)]
pub struct SplatStreamSettings {
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub deferred: bool,

    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub chunk_streaming: bool,

    #[arg(long, default_value_t = MAX_VISIBLE_TRUNKS)]
    pub max_visible_chunks: usize,

    /// frames between chunk sweeps
    #[arg(long, default_value_t = 6)]
    pub sweep_interval: u32,

    #[arg(long, default_value_t = 4)]
    pub max_chunks_per_sweep: usize,

    /// per-component view/projection tolerance before a resort is issued
    #[arg(long, default_value_t = 0.1)]
    pub sort_epsilon: f32,

    #[arg(long, value_enum, default_value_t = SortMode::Worker)]
    pub sort_mode: SortMode,

    /// ndc margin applied around the frustum when culling splats
    #[arg(long, default_value_t = 0.2)]
    pub cull_margin: f32,

    /// widen the margin per splat by its projected radius
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub adaptive_cull_margin: bool,

    #[arg(long, default_value_t = ALPHA_DISCARD_EPSILON)]
    pub alpha_discard_epsilon: f32,

    #[arg(long, default_value = "")]
    pub scene: String,

    #[arg(long, default_value = "res")]
    pub source_root: String,

    /// headless runs exit after this many frames, 0 runs until interrupted
    #[arg(long, default_value_t = 600)]
    pub max_frames: u32,
}

impl Default for SplatStreamSettings {
    fn default() -> Self {
        Self {
            deferred: true,
            chunk_streaming: false,
            max_visible_chunks: MAX_VISIBLE_TRUNKS,
            sweep_interval: 6,
            max_chunks_per_sweep: 4,
            sort_epsilon: 0.1,
            sort_mode: SortMode::Worker,
            cull_margin: 0.2,
            adaptive_cull_margin: true,
            alpha_discard_epsilon: ALPHA_DISCARD_EPSILON,
            scene: "".to_string(),
            source_root: "res".to_string(),
            max_frames: 600,
        }
    }
}

impl SplatStreamSettings {
    pub fn cull_margin(&self) -> CullMargin {
        if self.adaptive_cull_margin {
            CullMargin::Adaptive { base: self.cull_margin }
        } else {
            CullMargin::Fixed(self.cull_margin)
        }
    }
}
