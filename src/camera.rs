use bevy::prelude::*;


/// Marks the camera that drives sorting and chunk streaming.
#[derive(
    Clone,
    Component,
    Debug,
    Default,
    Reflect,
)]
#[reflect(Component)]
pub struct SplatCamera;


/// The matrices a frame is sorted, streamed and resolved with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: UVec2,
}

impl CameraMatrices {
    /// Perspective cameras get an OpenGL style projection with their finite far
    /// plane, so chunk selection can cull by distance. Other projections are used
    /// as the camera reports them.
    pub fn from_camera(
        camera: &Camera,
        projection: &Projection,
        transform: &GlobalTransform,
    ) -> Self {
        let projection = match projection {
            Projection::Perspective(perspective) => Mat4::perspective_rh_gl(
                perspective.fov,
                perspective.aspect_ratio,
                perspective.near,
                perspective.far,
            ),
            _ => camera.clip_from_view(),
        };

        Self {
            view: transform.compute_matrix().inverse(),
            projection,
            viewport: camera.physical_viewport_size().unwrap_or(UVec2::ONE),
        }
    }

    /// focal lengths in pixels
    pub fn focal(&self) -> Vec2 {
        Vec2::new(
            self.projection.x_axis.x * self.viewport.x as f32 * 0.5,
            self.projection.y_axis.y * self.viewport.y as f32 * 0.5,
        )
    }
}
