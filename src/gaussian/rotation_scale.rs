use bevy::math::{Vec2, Vec3, Vec4};


/// First two columns of `R(q)`, scaled by the in-plane scales.
///
/// `rotation` is `(w, x, y, z)`. A zero quaternion is left unnormalized.
#[allow(non_snake_case)]
pub fn compute_rotation_scale(rotation: Vec4, scale: Vec2) -> [Vec3; 2] {
    let mut norm = rotation.length();
    if norm == 0.0 {
        norm = 1.0;
    }

    let r = rotation.x / norm;
    let x = rotation.y / norm;
    let y = rotation.z / norm;
    let z = rotation.w / norm;

    let R0 = Vec3::new(
        1.0 - 2.0 * (y * y + z * z),
        2.0 * (x * y + r * z),
        2.0 * (x * z - r * y),
    );
    let R1 = Vec3::new(
        2.0 * (x * y - r * z),
        1.0 - 2.0 * (x * x + z * z),
        2.0 * (y * z + r * x),
    );

    [R0 * scale.x, R1 * scale.y]
}

/// 3 sigma extent of the larger in-plane axis
pub fn rotation_scale_radius(columns: &[Vec3; 2]) -> f32 {
    3.0 * columns[0].length().max(columns[1].length())
}
