use std::{
    future::Future,
    pin::Pin,
};

use crate::{
    error::SplatError,
    stream::manifest::{
        ChunkDescriptor,
        ChunkManifest,
    },
};

pub mod file;
pub mod payload;

#[cfg(feature = "io_ply")]
pub mod ply;

pub use file::FileSource;
pub use payload::{
    DatasetPayload,
    EnvironmentPayload,
    PayloadFormat,
};


pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SplatError>> + Send + 'a>>;


/// Byte-fetch collaborator for scenes, chunks and environment maps.
///
/// Chunk fetch failures should be reported as [`SplatError::TransientIo`] so
/// the streamer retries them.
pub trait SplatSource: Send + Sync + 'static {
    fn fetch_scene<'a>(&'a self, scene: &'a str) -> SourceFuture<'a, DatasetPayload>;

    fn fetch_environment_map<'a>(&'a self, scene: &'a str) -> SourceFuture<'a, EnvironmentPayload>;

    fn fetch_chunk_manifest<'a>(&'a self, scene: &'a str) -> SourceFuture<'a, ChunkManifest>;

    fn fetch_chunk<'a>(&'a self, scene: &'a str, chunk: &'a ChunkDescriptor) -> SourceFuture<'a, DatasetPayload>;
}
