use std::sync::Arc;

use bevy::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    gaussian::{
        data::SplatData,
        packed::PackedTexture,
    },
    sort::{
        CullMargin,
        DepthIndex,
        SortGate,
        SortMode,
        SplatWorker,
        VisibilitySorter,
        WorkerResponse,
    },
};

pub mod manager;
pub mod material;

pub use manager::{
    BatchManager,
    GBufferEntry,
};
pub use material::SplatMaterial;


#[derive(
    Clone,
    Copy,
    Component,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Reflect,
    Serialize,
    Deserialize,
)]
pub struct BatchId(pub u32);


#[derive(Clone, Debug, PartialEq)]
pub enum BatchOrigin {
    /// anchored at its transform origin
    Scene,
    /// anchored at the precomputed chunk centroid
    Chunk {
        id: String,
        centroid: Vec3,
    },
}

impl BatchOrigin {
    pub fn is_chunk(&self) -> bool {
        matches!(self, Self::Chunk { .. })
    }
}


enum BatchPipeline {
    Inline(VisibilitySorter),
    Worker {
        worker: SplatWorker,
        gate: SortGate,
    },
}


/// One packed texture and depth index pair plus the manager-owned ordering state.
pub struct SplatBatch {
    id: BatchId,
    origin: BatchOrigin,
    world_from_local: Mat4,
    entity: Option<Entity>,
    pipeline: BatchPipeline,
    texture: Option<Arc<PackedTexture>>,
    depth_index: DepthIndex,
    revision: u64,
    pub(crate) visible: bool,
    pub(crate) render_order: Option<u32>,
    pub(crate) view_z: f32,
}

impl SplatBatch {
    pub fn new(
        id: BatchId,
        origin: BatchOrigin,
        mode: SortMode,
        epsilon: f32,
        margin: CullMargin,
    ) -> Self {
        let pipeline = match mode {
            SortMode::Inline => BatchPipeline::Inline(VisibilitySorter::new(epsilon, margin)),
            SortMode::Worker => BatchPipeline::Worker {
                worker: SplatWorker::spawn(margin),
                gate: SortGate::new(epsilon),
            },
        };

        Self {
            id,
            origin,
            world_from_local: Mat4::IDENTITY,
            entity: None,
            pipeline,
            texture: None,
            depth_index: DepthIndex::empty(),
            revision: 0,
            visible: true,
            render_order: None,
            view_z: 0.0,
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn origin(&self) -> &BatchOrigin {
        &self.origin
    }

    pub fn entity(&self) -> Option<Entity> {
        self.entity
    }

    pub fn set_entity(&mut self, entity: Entity) {
        self.entity = Some(entity);
    }

    pub fn world_from_local(&self) -> Mat4 {
        self.world_from_local
    }

    pub fn set_world_from_local(&mut self, world_from_local: Mat4) {
        self.world_from_local = world_from_local;
    }

    /// chunk centroid, or the transform origin for whole scenes
    pub fn anchor(&self) -> Vec3 {
        match &self.origin {
            BatchOrigin::Chunk { centroid, .. } => *centroid,
            BatchOrigin::Scene => self.world_from_local.w_axis.truncate(),
        }
    }

    pub fn texture(&self) -> Option<&Arc<PackedTexture>> {
        self.texture.as_ref()
    }

    pub fn depth_index(&self) -> &DepthIndex {
        &self.depth_index
    }

    pub fn instance_count(&self) -> usize {
        self.depth_index.visible_count()
    }

    /// bumped whenever the texture or depth index is replaced
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn render_order(&self) -> Option<u32> {
        self.render_order
    }

    pub fn view_z(&self) -> f32 {
        self.view_z
    }

    /// replaces the whole dataset, the previous order is discarded
    pub fn set_data(&mut self, data: SplatData) {
        debug!("batch {:?}: new buffer of {} splats", self.id, data.vertex_count());

        match &mut self.pipeline {
            BatchPipeline::Inline(sorter) => {
                let texture = Arc::new(data.into_texture());
                let camera = sorter.last_camera();
                sorter.invalidate();

                self.depth_index = match camera {
                    Some((view, projection)) => sorter.sort_now(texture.records(), &view, &projection),
                    None => DepthIndex::empty(),
                };
                self.texture = Some(texture);
                self.revision += 1;
            }
            BatchPipeline::Worker { worker, .. } => {
                worker.submit(data);
            }
        }
    }

    /// `view` is the camera's view matrix, the batch transform is applied here
    pub fn update_camera(&mut self, view: &Mat4, projection: &Mat4) -> bool {
        let local_view = *view * self.world_from_local;

        match &mut self.pipeline {
            BatchPipeline::Inline(sorter) => {
                let Some(texture) = &self.texture else {
                    sorter.invalidate();
                    return false;
                };

                match sorter.sort(texture.records(), &local_view, projection) {
                    Some(depth_index) => {
                        self.depth_index = depth_index;
                        self.revision += 1;
                        true
                    }
                    None => false,
                }
            }
            BatchPipeline::Worker { worker, gate } => {
                if !gate.admit(&local_view, projection) {
                    return false;
                }

                worker.request_sort(local_view, *projection);
                true
            }
        }
    }

    /// collects finished worker output, true when anything changed
    pub fn poll(&mut self) -> bool {
        let BatchPipeline::Worker { worker, .. } = &self.pipeline else {
            return false;
        };

        let mut changed = false;
        for response in worker.drain_results() {
            match response {
                WorkerResponse::Packed { texture, .. } => {
                    self.texture = Some(texture);
                    self.depth_index = DepthIndex::empty();
                }
                WorkerResponse::Sorted { depth_index, .. } => self.depth_index = depth_index,
            }
            changed = true;
        }

        if changed {
            self.revision += 1;
        }
        changed
    }
}
