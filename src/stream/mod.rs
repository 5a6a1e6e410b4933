pub mod manifest;
pub mod streamer;
pub mod systems;

pub use manifest::{
    ChunkBounds,
    ChunkDescriptor,
    ChunkManifest,
};
pub use streamer::{
    ChunkState,
    ChunkStreamer,
};
