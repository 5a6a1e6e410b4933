use bevy::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    gaussian::packed::PackedSplatRecord,
    math::pad_to,
    settings::{
        DATA_TEXTURE_WIDTH,
        DEPTH_BUCKETS,
    },
};

pub mod worker;

pub use worker::{
    SplatWorker,
    WorkerResponse,
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum SortMode {
    /// pack and sort on a dedicated thread per batch
    #[default]
    Worker,
    /// pack and sort synchronously inside the frame
    Inline,
}


/// Slack around the `[-1, 1]` ndc cube before a splat is culled.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub enum CullMargin {
    Fixed(f32),
    /// `max(base, radius * max(P00, P11) / clip.w)` per splat
    Adaptive {
        base: f32,
    },
}

impl Default for CullMargin {
    fn default() -> Self {
        Self::Adaptive { base: 0.2 }
    }
}

impl CullMargin {
    fn for_splat(&self, record: &PackedSplatRecord, focal_scale: f32, clip_w: f32) -> f32 {
        match *self {
            Self::Fixed(margin) => margin,
            Self::Adaptive { base } => base.max(record.radius() * focal_scale / clip_w),
        }
    }
}


/// Back-to-front splat indices, padded to whole texture rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepthIndex {
    indices: Vec<u32>,
    visible_count: usize,
}

impl DepthIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// the instance count to draw
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn visible(&self) -> &[u32] {
        &self.indices[..self.visible_count]
    }

    /// includes the zero padding
    pub fn padded(&self) -> &[u32] {
        &self.indices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.indices.as_slice())
    }
}


/// Tracks the last camera a sort was issued for.
#[derive(Clone, Debug, PartialEq)]
pub struct SortGate {
    epsilon: f32,
    last: Option<(Mat4, Mat4)>,
}

impl SortGate {
    pub fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            last: None,
        }
    }

    pub fn last_camera(&self) -> Option<(Mat4, Mat4)> {
        self.last
    }

    /// true when any component of view or projection moved by `epsilon` or more
    pub fn is_dirty(&self, view: &Mat4, projection: &Mat4) -> bool {
        let Some((last_view, last_projection)) = &self.last else {
            return true;
        };

        let moved = |a: &Mat4, b: &Mat4| {
            a.to_cols_array()
                .iter()
                .zip(b.to_cols_array().iter())
                .any(|(a, b)| (a - b).abs() >= self.epsilon)
        };

        moved(view, last_view) || moved(projection, last_projection)
    }

    /// records the camera when it passes the gate
    pub fn admit(&mut self, view: &Mat4, projection: &Mat4) -> bool {
        if !self.is_dirty(view, projection) {
            return false;
        }

        self.last = Some((*view, *projection));
        true
    }

    pub fn record(&mut self, view: &Mat4, projection: &Mat4) {
        self.last = Some((*view, *projection));
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}


#[derive(Clone, Debug, Default)]
struct SortScratch {
    survivors: Vec<(u32, f32)>,
    buckets: Vec<u16>,
    counts: Vec<u32>,
}


/// Culls and orders one batch's splats for a camera.
///
/// One instance per batch; the epsilon gate and counting-sort scratch are never
/// shared.
#[derive(Clone, Debug)]
pub struct VisibilitySorter {
    gate: SortGate,
    margin: CullMargin,
    scratch: SortScratch,
}

impl Default for VisibilitySorter {
    fn default() -> Self {
        Self::new(0.1, CullMargin::default())
    }
}

impl VisibilitySorter {
    pub fn new(epsilon: f32, margin: CullMargin) -> Self {
        Self {
            gate: SortGate::new(epsilon),
            margin,
            scratch: SortScratch::default(),
        }
    }

    pub fn last_camera(&self) -> Option<(Mat4, Mat4)> {
        self.gate.last_camera()
    }

    /// forces the next [`sort`](Self::sort) to run, used when the buffer is replaced
    pub fn invalidate(&mut self) {
        self.gate.invalidate();
    }

    /// `None` when the camera is within epsilon of the previous sort
    pub fn sort(
        &mut self,
        records: &[PackedSplatRecord],
        view: &Mat4,
        projection: &Mat4,
    ) -> Option<DepthIndex> {
        if !self.gate.admit(view, projection) {
            return None;
        }

        Some(self.sort_records(records, view, projection))
    }

    /// sorts regardless of the gate, still recording the camera
    pub fn sort_now(
        &mut self,
        records: &[PackedSplatRecord],
        view: &Mat4,
        projection: &Mat4,
    ) -> DepthIndex {
        self.gate.record(view, projection);
        self.sort_records(records, view, projection)
    }

    fn sort_records(
        &mut self,
        records: &[PackedSplatRecord],
        view: &Mat4,
        projection: &Mat4,
    ) -> DepthIndex {
        let clip_from_world = *projection * *view;
        let view_row_z = view.row(2);
        let focal_scale = projection.x_axis.x.abs().max(projection.y_axis.y.abs());

        let SortScratch {
            survivors,
            buckets,
            counts,
        } = &mut self.scratch;

        survivors.clear();
        for (index, record) in records.iter().enumerate() {
            let position = record.position().extend(1.0);

            let view_z = view_row_z.dot(position);
            if view_z > 0.0 {
                continue;
            }

            let clip = clip_from_world * position;
            if clip.w <= 0.0 {
                continue;
            }

            let bound = 1.0 + self.margin.for_splat(record, focal_scale, clip.w);
            let ndc = clip.truncate() / clip.w;
            if !(ndc.abs().cmple(Vec3::splat(bound)).all()) {
                continue;
            }

            survivors.push((index as u32, view_z));
        }

        let visible_count = survivors.len();
        let mut indices = vec![0u32; pad_to(visible_count, DATA_TEXTURE_WIDTH)];
        if visible_count == 0 {
            return DepthIndex {
                indices,
                visible_count,
            };
        }

        let (min_depth, max_depth) = survivors
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &(_, depth)| {
                (min.min(depth), max.max(depth))
            });
        let range = max_depth - min_depth;
        let scale = (DEPTH_BUCKETS - 1) as f32 / if range > 0.0 { range } else { 1.0 };

        buckets.clear();
        buckets.extend(survivors.iter().map(|&(_, depth)| {
            ((depth - min_depth) * scale).round().clamp(0.0, (DEPTH_BUCKETS - 1) as f32) as u16
        }));

        counts.clear();
        counts.resize(DEPTH_BUCKETS, 0);
        for &bucket in buckets.iter() {
            counts[bucket as usize] += 1;
        }

        let mut offset = 0;
        for count in counts.iter_mut() {
            let start = offset;
            offset += *count;
            *count = start;
        }

        for (&(index, _), &bucket) in survivors.iter().zip(buckets.iter()) {
            let slot = &mut counts[bucket as usize];
            indices[*slot as usize] = index;
            *slot += 1;
        }

        DepthIndex {
            indices,
            visible_count,
        }
    }
}
