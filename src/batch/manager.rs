use std::collections::HashMap;

use bevy::prelude::*;

use crate::{
    batch::{
        material::{
            MaterialTarget,
            SplatMaterial,
        },
        BatchId,
        BatchOrigin,
        SplatBatch,
    },
    gaussian::data::SplatData,
    settings::SplatStreamSettings,
    sort::{
        CullMargin,
        SortMode,
    },
};


/// One visible batch ready for the g-buffer pass, in draw order.
#[derive(Clone, Debug, PartialEq)]
pub struct GBufferEntry {
    pub batch: BatchId,
    pub entity: Option<Entity>,
    pub render_order: u32,
    pub instance_count: usize,
    pub forward_material: SplatMaterial,
    pub deferred_material: SplatMaterial,
}


/// Owns every batch and is the only writer of their visibility and draw order.
#[derive(Resource)]
pub struct BatchManager {
    batches: Vec<SplatBatch>,
    next_id: u32,
    sort_mode: SortMode,
    sort_epsilon: f32,
    cull_margin: CullMargin,
    max_visible_chunks: usize,
    alpha_discard_epsilon: f32,
    hidden: bool,
    focal: Vec2,
    viewport: UVec2,
    deferred_materials: HashMap<BatchId, SplatMaterial>,
    container: Option<Entity>,
}

impl Default for BatchManager {
    fn default() -> Self {
        Self::from_settings(&SplatStreamSettings::default())
    }
}

impl BatchManager {
    pub fn from_settings(settings: &SplatStreamSettings) -> Self {
        Self {
            batches: Vec::new(),
            next_id: 0,
            sort_mode: settings.sort_mode,
            sort_epsilon: settings.sort_epsilon,
            cull_margin: settings.cull_margin(),
            max_visible_chunks: settings.max_visible_chunks,
            alpha_discard_epsilon: settings.alpha_discard_epsilon,
            hidden: false,
            focal: Vec2::ZERO,
            viewport: UVec2::ZERO,
            deferred_materials: HashMap::new(),
            container: None,
        }
    }

    pub fn max_visible_chunks(&self) -> usize {
        self.max_visible_chunks
    }

    pub fn container(&self) -> Option<Entity> {
        self.container
    }

    pub fn set_container(&mut self, container: Entity) {
        self.container = Some(container);
    }

    pub fn batches(&self) -> &[SplatBatch] {
        &self.batches
    }

    pub fn batch(&self, id: BatchId) -> Option<&SplatBatch> {
        self.batches.iter().find(|batch| batch.id() == id)
    }

    pub fn batch_mut(&mut self, id: BatchId) -> Option<&mut SplatBatch> {
        self.batches.iter_mut().find(|batch| batch.id() == id)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn chunk_batch_count(&self) -> usize {
        self.batches.iter().filter(|batch| batch.origin().is_chunk()).count()
    }

    pub fn visible_chunk_count(&self) -> usize {
        self.batches
            .iter()
            .filter(|batch| batch.origin().is_chunk() && batch.is_visible())
            .count()
    }

    fn create_batch(&mut self, origin: BatchOrigin, data: SplatData) -> BatchId {
        let id = BatchId(self.next_id);
        self.next_id += 1;

        let mut batch = SplatBatch::new(
            id,
            origin,
            self.sort_mode,
            self.sort_epsilon,
            self.cull_margin,
        );
        batch.set_data(data);
        self.batches.push(batch);

        id
    }

    /// replaces the first batch's dataset, creating it when the manager is empty
    pub fn set_buffer(&mut self, data: SplatData) -> BatchId {
        match self.batches.first_mut() {
            Some(batch) => {
                batch.set_data(data);
                batch.id()
            }
            None => self.create_batch(BatchOrigin::Scene, data),
        }
    }

    pub fn add_batch(&mut self, data: SplatData) -> BatchId {
        let id = self.create_batch(BatchOrigin::Scene, data);
        debug!("added scene batch {:?}", id);
        id
    }

    /// factory used by chunk streaming, the batch is anchored at `centroid`
    pub fn add_chunk_batch(&mut self, data: SplatData, chunk_id: impl Into<String>, centroid: Vec3) -> BatchId {
        let chunk_id = chunk_id.into();
        let id = self.create_batch(
            BatchOrigin::Chunk {
                id: chunk_id.clone(),
                centroid,
            },
            data,
        );
        debug!("added chunk batch {:?} for chunk {}", id, chunk_id);
        id
    }

    /// hides or reveals every batch on top of the chunk cap
    pub fn toggle_visible(&mut self) -> bool {
        self.hidden = !self.hidden;
        if self.hidden {
            for batch in self.batches.iter_mut() {
                batch.visible = false;
                batch.render_order = None;
            }
        }
        !self.hidden
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_viewport(&mut self, viewport: UVec2) {
        self.viewport = viewport;
    }

    /// drains worker output for every batch
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for batch in self.batches.iter_mut() {
            changed |= batch.poll();
        }
        changed
    }

    pub fn update_uniforms(&mut self, view: &Mat4, projection: &Mat4, focal: Vec2) {
        self.focal = focal;

        for batch in self.batches.iter_mut() {
            batch.update_camera(view, projection);
            batch.poll();
        }

        let view_row_z = view.row(2);
        for batch in self.batches.iter_mut() {
            batch.view_z = view_row_z.dot(batch.anchor().extend(1.0));
            batch.visible = !self.hidden;
            batch.render_order = None;
        }

        if self.hidden {
            return;
        }

        self.apply_chunk_cap();
        self.assign_render_order();
    }

    fn apply_chunk_cap(&mut self) {
        let mut chunks: Vec<usize> = self
            .batches
            .iter()
            .enumerate()
            .filter(|(_, batch)| batch.origin().is_chunk())
            .map(|(index, _)| index)
            .collect();

        if chunks.len() <= self.max_visible_chunks {
            return;
        }

        // nearest in front first, anything behind the camera last
        chunks.sort_by(|&a, &b| {
            let a = &self.batches[a];
            let b = &self.batches[b];
            (a.view_z > 0.0)
                .cmp(&(b.view_z > 0.0))
                .then(b.view_z.total_cmp(&a.view_z))
        });

        for &index in &chunks[self.max_visible_chunks..] {
            self.batches[index].visible = false;
        }
    }

    /// ascending view z is back to front
    fn assign_render_order(&mut self) {
        let mut visible: Vec<usize> = self
            .batches
            .iter()
            .enumerate()
            .filter(|(_, batch)| batch.visible)
            .map(|(index, _)| index)
            .collect();

        visible.sort_by(|&a, &b| self.batches[a].view_z.total_cmp(&self.batches[b].view_z));

        for (order, index) in visible.into_iter().enumerate() {
            self.batches[index].render_order = Some(order as u32);
        }
    }

    /// visible batches in draw order with their deferred materials
    pub fn gbuffer_entries(&mut self) -> Vec<GBufferEntry> {
        let mut entries: Vec<GBufferEntry> = Vec::new();

        for batch in self.batches.iter().filter(|batch| batch.is_visible()) {
            let Some(render_order) = batch.render_order() else {
                continue;
            };

            let revision = batch.revision();
            let deferred_material = self
                .deferred_materials
                .entry(batch.id())
                .and_modify(|material| {
                    if !material.is_current(revision, self.focal, self.viewport) {
                        material.revision = revision;
                        material.focal = self.focal;
                        material.viewport = self.viewport;
                    }
                })
                .or_insert_with(|| {
                    SplatMaterial {
                        focal: self.focal,
                        viewport: self.viewport,
                        alpha_discard_epsilon: self.alpha_discard_epsilon,
                        ..SplatMaterial::forward(batch.id(), revision)
                    }.to_deferred()
                })
                .clone();

            let forward_material = SplatMaterial {
                target: MaterialTarget::Forward,
                ..deferred_material.clone()
            };

            entries.push(GBufferEntry {
                batch: batch.id(),
                entity: batch.entity(),
                render_order,
                instance_count: batch.instance_count(),
                forward_material,
                deferred_material,
            });
        }

        entries.sort_by_key(|entry| entry.render_order);
        entries
    }

    /// drops every batch, used on scene reset
    pub fn clear(&mut self) {
        self.batches.clear();
        self.deferred_materials.clear();
        self.hidden = false;
    }
}
