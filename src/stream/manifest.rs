use std::collections::HashSet;

use bevy::math::Vec3;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::{
        SplatError,
        ValidationError,
    },
    math::Aabb,
};


#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl ChunkBounds {
    pub fn aabb(&self) -> Aabb {
        Aabb::new(Vec3::from_array(self.min), Vec3::from_array(self.max))
    }
}


/// Immutable spatial partition descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub id: String,
    pub file: String,
    pub bounds: ChunkBounds,
    #[serde(rename = "vertexCount")]
    pub vertex_count: usize,
}

impl ChunkDescriptor {
    pub fn aabb(&self) -> Aabb {
        self.bounds.aabb()
    }

    pub fn centroid(&self) -> Vec3 {
        self.aabb().center()
    }
}


#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkManifest {
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub trunk_size: Option<f32>,
    #[serde(default)]
    pub total_vertex: Option<usize>,
    pub chunks: Vec<ChunkDescriptor>,
}

impl ChunkManifest {
    pub fn from_json(json: &str) -> Result<Self, SplatError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SplatError> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut ids = HashSet::new();

        for chunk in &self.chunks {
            if !ids.insert(chunk.id.as_str()) {
                return Err(ValidationError::ChunkMetadata(format!("duplicate chunk id {}", chunk.id)));
            }

            if !chunk.aabb().is_valid() {
                return Err(ValidationError::ChunkMetadata(format!("chunk {} has inverted or non-finite bounds", chunk.id)));
            }
        }

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ChunkDescriptor> {
        self.chunks.iter().find(|chunk| chunk.id == id)
    }
}
