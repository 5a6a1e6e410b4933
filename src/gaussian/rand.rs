use bevy::prelude::*;
use rand::{
    prelude::Distribution,
    Rng,
};

use crate::gaussian::raw::{
    write_raw_buffer,
    RawLayout,
    RawSplat,
};


impl Distribution<RawSplat> for rand::distributions::Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RawSplat {
        let rotation = Quat::from_xyzw(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        ).normalize();

        let mut sh1 = [0.0; 9];
        for coefficient in sh1.iter_mut() {
            *coefficient = rng.gen_range(-0.5..0.5);
        }

        RawSplat {
            position: Vec3::new(
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
            ),
            opacity: rng.gen_range(0.0..0.8),
            scale: Vec3::new(
                rng.gen_range(0.0..0.5),
                rng.gen_range(0.0..0.5),
                0.0,
            ),
            rotation: if rotation.is_finite() { rotation } else { Quat::IDENTITY },
            sh0: Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ),
            sh1,
            pbr: Vec3::new(
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            ),
            origin_color: Vec3::new(
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            ),
        }
    }
}

pub fn random_raw_splats(n: usize) -> Vec<RawSplat> {
    let mut rng = rand::thread_rng();
    let mut splats: Vec<RawSplat> = Vec::with_capacity(n);

    for _ in 0..n {
        splats.push(rng.r#gen());
    }

    splats
}

/// `n` random splats written in the full raw layout
pub fn random_raw_buffer(n: usize) -> Vec<f32> {
    write_raw_buffer(&RawLayout::FULL, &random_raw_splats(n))
}
