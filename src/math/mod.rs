pub mod aabb;
pub mod frustum;

pub use aabb::Aabb;
pub use frustum::Frustum;


/// rounds `x` up to the next multiple of `multiple`
pub const fn pad_to(x: usize, multiple: usize) -> usize {
    x.div_ceil(multiple) * multiple
}
