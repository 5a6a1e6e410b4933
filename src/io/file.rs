use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::SplatError,
    gaussian::raw::RawLayout,
    io::{
        payload::{
            DatasetPayload,
            EnvironmentPayload,
            PayloadFormat,
        },
        SourceFuture,
        SplatSource,
    },
    settings::PACKED_FLOAT_PER_SPLAT,
    stream::manifest::{
        ChunkDescriptor,
        ChunkManifest,
    },
};


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredFormat {
    Raw,
    #[default]
    Packed,
}


/// Sidecar describing `scene.bin`, the counts a server would send as headers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneHeader {
    pub vertex_count: usize,
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,
    #[serde(default)]
    pub format: StoredFormat,
}

fn default_channel_count() -> usize {
    PACKED_FLOAT_PER_SPLAT
}


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentHeader {
    pub width: usize,
}


/// Reads scenes from a directory tree:
///
/// ```text
/// <root>/<scene>/scene.json + scene.bin    (or point_cloud.ply with io_ply)
/// <root>/<scene>/environment.json + environment.bin
/// <root>/<scene>/chunks/metadata.json
/// <root>/<scene>/chunks/<file>
/// ```
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scene_dir(&self, scene: &str) -> PathBuf {
        self.root.join(scene)
    }

    pub fn chunk_dir(&self, scene: &str) -> PathBuf {
        self.scene_dir(scene).join("chunks")
    }

    fn read_scene(&self, scene: &str) -> Result<DatasetPayload, SplatError> {
        let dir = self.scene_dir(scene);
        let header_path = dir.join("scene.json");

        #[cfg(feature = "io_ply")]
        if !header_path.exists() {
            let ply_path = dir.join("point_cloud.ply");
            if ply_path.exists() {
                let mut reader = std::io::BufReader::new(std::fs::File::open(ply_path)?);
                let floats = crate::io::ply::parse_ply(&mut reader)?;
                return Ok(DatasetPayload::from_raw_floats(RawLayout::FULL, &floats));
            }
        }

        let header: SceneHeader = serde_json::from_slice(&std::fs::read(header_path)?)?;
        let bytes = std::fs::read(dir.join("scene.bin"))?;

        let format = match header.format {
            StoredFormat::Raw => PayloadFormat::Raw(RawLayout::FULL),
            StoredFormat::Packed => PayloadFormat::Packed,
        };

        Ok(DatasetPayload {
            bytes,
            declared_vertex_count: header.vertex_count,
            declared_channel_count: header.channel_count,
            format,
        })
    }

    fn read_environment_map(&self, scene: &str) -> Result<EnvironmentPayload, SplatError> {
        let dir = self.scene_dir(scene);
        let header: EnvironmentHeader = serde_json::from_slice(&std::fs::read(dir.join("environment.json"))?)?;
        let bytes = std::fs::read(dir.join("environment.bin"))?;

        if bytes.len() % 4 != 0 {
            return Err(crate::error::ValidationError::EnvironmentMap {
                float_count: bytes.len() / 4,
            }.into());
        }

        Ok(EnvironmentPayload {
            floats: bytemuck::pod_collect_to_vec(&bytes),
            face_size: Some(header.width),
        })
    }

    fn read_chunk(&self, scene: &str, chunk: &ChunkDescriptor) -> Result<DatasetPayload, SplatError> {
        let bytes = std::fs::read(self.chunk_dir(scene).join(&chunk.file))
            .map_err(|err| SplatError::transient(chunk.id.clone(), err))?;

        Ok(DatasetPayload::packed(bytes, chunk.vertex_count, PACKED_FLOAT_PER_SPLAT))
    }
}

impl SplatSource for FileSource {
    fn fetch_scene<'a>(&'a self, scene: &'a str) -> SourceFuture<'a, DatasetPayload> {
        Box::pin(async move { self.read_scene(scene) })
    }

    fn fetch_environment_map<'a>(&'a self, scene: &'a str) -> SourceFuture<'a, EnvironmentPayload> {
        Box::pin(async move { self.read_environment_map(scene) })
    }

    fn fetch_chunk_manifest<'a>(&'a self, scene: &'a str) -> SourceFuture<'a, ChunkManifest> {
        Box::pin(async move {
            let bytes = std::fs::read(self.chunk_dir(scene).join("metadata.json"))?;
            let mut manifest = ChunkManifest::from_slice(&bytes)?;
            if manifest.scene.is_empty() {
                manifest.scene = scene.to_string();
            }
            Ok(manifest)
        })
    }

    fn fetch_chunk<'a>(&'a self, scene: &'a str, chunk: &'a ChunkDescriptor) -> SourceFuture<'a, DatasetPayload> {
        Box::pin(async move { self.read_chunk(scene, chunk) })
    }
}
