use std::collections::{
    HashMap,
    HashSet,
};

use bevy::prelude::*;

use crate::{
    error::SplatError,
    math::Frustum,
    settings::SplatStreamSettings,
    stream::manifest::{
        ChunkDescriptor,
        ChunkManifest,
    },
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Reflect,
)]
pub enum ChunkState {
    #[default]
    Unknown,
    Loading,
    Loaded,
}


/// Frustum and distance driven chunk loading.
///
/// Sweeps run every `sweep_interval` frames and never overlap. Loaded chunks
/// are never evicted.
#[derive(Resource)]
pub struct ChunkStreamer {
    manifest: ChunkManifest,
    states: HashMap<String, ChunkState>,
    rejected: HashSet<String>,
    sweep_interval: u32,
    frames_since_sweep: u32,
    max_visible_chunks: usize,
    max_chunks_per_sweep: usize,
    sweeping: bool,
}

impl Default for ChunkStreamer {
    fn default() -> Self {
        Self::from_settings(ChunkManifest::default(), &SplatStreamSettings::default())
    }
}

impl ChunkStreamer {
    pub fn new(
        manifest: ChunkManifest,
        sweep_interval: u32,
        max_visible_chunks: usize,
        max_chunks_per_sweep: usize,
    ) -> Self {
        Self {
            manifest,
            states: HashMap::new(),
            rejected: HashSet::new(),
            sweep_interval: sweep_interval.max(1),
            // the first tick sweeps immediately
            frames_since_sweep: sweep_interval.max(1) - 1,
            max_visible_chunks,
            max_chunks_per_sweep,
            sweeping: false,
        }
    }

    pub fn from_settings(manifest: ChunkManifest, settings: &SplatStreamSettings) -> Self {
        Self::new(
            manifest,
            settings.sweep_interval,
            settings.max_visible_chunks,
            settings.max_chunks_per_sweep,
        )
    }

    pub fn manifest(&self) -> &ChunkManifest {
        &self.manifest
    }

    /// replaces the known chunk set, states of ids still present are kept
    pub fn set_manifest(&mut self, manifest: ChunkManifest) {
        self.states.retain(|id, _| manifest.get(id).is_some());
        self.rejected.retain(|id| manifest.get(id).is_some());
        info!(
            "chunk manifest for '{}': {} chunks, {} splats",
            manifest.scene,
            manifest.chunks.len(),
            manifest.total_vertex.unwrap_or_default(),
        );
        self.manifest = manifest;
    }

    pub fn state(&self, id: &str) -> ChunkState {
        self.states.get(id).copied().unwrap_or_default()
    }

    pub fn count(&self, state: ChunkState) -> usize {
        match state {
            ChunkState::Unknown => self.manifest.chunks.len() - self.states.len(),
            _ => self.states.values().filter(|s| **s == state).count(),
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeping
    }

    /// advances the frame counter, true when a sweep is due
    pub fn tick(&mut self) -> bool {
        if self.sweeping {
            return false;
        }

        self.frames_since_sweep += 1;
        if self.frames_since_sweep < self.sweep_interval {
            return false;
        }

        self.frames_since_sweep = 0;
        true
    }

    /// chunks a sweep for this camera would fetch, without changing any state
    pub fn select_candidates(&self, view: &Mat4, projection: &Mat4) -> Vec<&ChunkDescriptor> {
        let frustum = Frustum::from_view_projection(view, projection);
        let camera_position = view.inverse().w_axis.truncate();

        let mut candidates: Vec<&ChunkDescriptor> = self
            .manifest
            .chunks
            .iter()
            .filter(|chunk| frustum.intersects_aabb(&chunk.aabb()))
            .collect();

        if candidates.is_empty() {
            candidates = self.manifest.chunks.iter().collect();
        }

        candidates.sort_by(|a, b| {
            let a = a.centroid().distance_squared(camera_position);
            let b = b.centroid().distance_squared(camera_position);
            a.total_cmp(&b)
        });

        candidates
            .into_iter()
            .take(self.max_visible_chunks)
            .filter(|chunk| self.state(&chunk.id) == ChunkState::Unknown)
            .take(self.max_chunks_per_sweep)
            .collect()
    }

    /// Starts a sweep, every returned chunk is now `Loading`.
    ///
    /// Returns nothing while a previous sweep is still in flight.
    pub fn plan_sweep(&mut self, view: &Mat4, projection: &Mat4) -> Vec<ChunkDescriptor> {
        if self.sweeping {
            return Vec::new();
        }

        let planned: Vec<ChunkDescriptor> = self
            .select_candidates(view, projection)
            .into_iter()
            .cloned()
            .collect();

        for chunk in &planned {
            self.states.insert(chunk.id.clone(), ChunkState::Loading);
        }

        self.sweeping = !planned.is_empty();
        if self.sweeping {
            debug!("chunk sweep fetching {:?}", planned.iter().map(|c| c.id.as_str()).collect::<Vec<_>>());
        }

        planned
    }

    /// marks a single chunk `Loading`, false when it is already loading or loaded
    pub fn fetch_chunk(&mut self, id: &str) -> Result<bool, SplatError> {
        if self.manifest.get(id).is_none() {
            return Err(SplatError::UnknownChunk(id.to_string()));
        }

        if self.state(id) != ChunkState::Unknown {
            return Ok(false);
        }

        self.states.insert(id.to_string(), ChunkState::Loading);
        Ok(true)
    }

    /// `Loading -> Loaded` on success, `Loading -> Unknown` on a retryable failure
    pub fn complete_fetch(&mut self, id: &str, succeeded: bool) {
        if self.state(id) != ChunkState::Loading {
            warn!("chunk {} completed while not loading", id);
            return;
        }

        if succeeded {
            self.states.insert(id.to_string(), ChunkState::Loaded);
        } else {
            self.states.remove(id);
        }
    }

    /// `Loading -> Loaded` without a batch, the chunk is never planned again
    pub fn reject_fetch(&mut self, id: &str) {
        if self.state(id) != ChunkState::Loading {
            warn!("chunk {} rejected while not loading", id);
            return;
        }

        self.states.insert(id.to_string(), ChunkState::Loaded);
        self.rejected.insert(id.to_string());
    }

    /// routes a failed fetch, only transient failures are retried
    pub fn fail_fetch(&mut self, id: &str, err: &SplatError) {
        if err.is_transient() {
            self.complete_fetch(id, false);
        } else {
            self.reject_fetch(id);
        }
    }

    pub fn is_rejected(&self, id: &str) -> bool {
        self.rejected.contains(id)
    }

    pub fn finish_sweep(&mut self) {
        self.sweeping = false;
    }
}
