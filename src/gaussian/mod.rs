pub mod data;
pub mod f16;
pub mod packed;
pub mod rand;
pub mod raw;
pub mod rotation_scale;

pub use data::SplatData;
pub use packed::{
    PackedSplatRecord,
    PackedTexture,
};
pub use raw::{
    RawLayout,
    RawSplat,
};
