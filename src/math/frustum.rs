use bevy::math::{
    Mat4,
    Vec3,
    Vec4,
};

use crate::math::Aabb;


const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;


/// Six inward-facing planes `(n, d)` with `n · p + d >= 0` inside.
///
/// Extracted assuming an OpenGL style clip volume, `-w <= z <= w`. Bevy's own
/// `Frustum` expects reverse-z infinite projections and is not used here, the
/// splat cameras carry an explicit far plane that chunk selection relies on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_clip_from_world(clip_from_world: &Mat4) -> Self {
        let rows = [
            clip_from_world.row(0),
            clip_from_world.row(1),
            clip_from_world.row(2),
            clip_from_world.row(3),
        ];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[3] + rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    pub fn from_view_projection(view: &Mat4, projection: &Mat4) -> Self {
        Self::from_clip_from_world(&(*projection * *view))
    }

    /// Conservative p-vertex test, boxes straddling a corner may pass.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let p_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            normal.dot(p_vertex) + plane.w >= 0.0
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(point) + plane.w >= 0.0)
    }
}
