use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};
use serde::{
    Deserialize,
    Serialize,
};
use static_assertions::const_assert_eq;

#[cfg(feature = "sort_rayon")]
use rayon::prelude::*;

use crate::{
    gaussian::{
        f16::{
            pack_half1,
            pack_half2,
            unpack_half1,
            unpack_half2,
        },
        raw::{
            RawLayout,
            RawSplatRecord,
        },
        rotation_scale::{
            compute_rotation_scale,
            rotation_scale_radius,
        },
    },
    settings::{
        DATA_TEXTURE_WIDTH,
        PACKED_FLOAT_PER_SPLAT,
        PACKED_PIX_PER_SPLAT,
    },
};


pub const SH_C0: f32 = 0.282_094_8;


/// Sixteen 32-bit words, four rgba texels.
///
/// The word order is shared with the resolve shaders and must stay bit exact:
/// position + opacity, three half2 rotation-scale pairs, base color rgba8,
/// five words of sh band 1, origin color rgba8, then half2 reflectance/roughness
/// and half1 metalness.
#[derive(
    Clone,
    Debug,
    Default,
    Copy,
    PartialEq,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct PackedSplatRecord {
    pub position_opacity: [f32; 4],
    pub rotation_scale: [u32; 3],
    pub base_color: u32,
    pub sh1: [u32; 5],
    pub origin_color: u32,
    pub pbr: [u32; 2],
}

const_assert_eq!(std::mem::size_of::<PackedSplatRecord>(), PACKED_FLOAT_PER_SPLAT * 4);

impl PackedSplatRecord {
    pub fn position(&self) -> Vec3 {
        Vec3::from_slice(&self.position_opacity)
    }

    pub fn opacity(&self) -> f32 {
        self.position_opacity[3]
    }

    /// the two scaled rotation columns
    pub fn rotation_scale_columns(&self) -> [Vec3; 2] {
        let (rs0, rs1) = unpack_half2(self.rotation_scale[0]);
        let (rs2, rs3) = unpack_half2(self.rotation_scale[1]);
        let (rs4, rs5) = unpack_half2(self.rotation_scale[2]);

        [
            Vec3::new(rs0, rs2, rs4),
            Vec3::new(rs1, rs3, rs5),
        ]
    }

    pub fn radius(&self) -> f32 {
        rotation_scale_radius(&self.rotation_scale_columns())
    }

    pub fn base_color(&self) -> [u8; 4] {
        self.base_color.to_le_bytes()
    }

    pub fn origin_color(&self) -> [u8; 4] {
        self.origin_color.to_le_bytes()
    }

    pub fn sh1(&self) -> [f32; 9] {
        let mut coefficients = [0.0; 9];
        for (i, word) in self.sh1[..4].iter().enumerate() {
            let (x, y) = unpack_half2(*word);
            coefficients[2 * i] = x;
            coefficients[2 * i + 1] = y;
        }
        coefficients[8] = unpack_half1(self.sh1[4]);
        coefficients
    }

    /// reflectance, roughness, metalness
    pub fn pbr(&self) -> Vec3 {
        let (reflectance, roughness) = unpack_half2(self.pbr[0]);
        Vec3::new(reflectance, roughness, unpack_half1(self.pbr[1]))
    }
}


fn quantize_unorm8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn pack_rgba8(color: Vec3) -> u32 {
    u32::from_le_bytes([
        quantize_unorm8(color.x),
        quantize_unorm8(color.y),
        quantize_unorm8(color.z),
        255,
    ])
}

pub fn base_color_from_sh0(sh0: Vec3) -> Vec3 {
    Vec3::splat(0.5) + SH_C0 * sh0
}


/// Pure per-record transform. Malformed input passes through unvalidated.
pub fn pack(raw: &RawSplatRecord) -> PackedSplatRecord {
    let position = raw.position();
    let [column0, column1] = compute_rotation_scale(raw.rotation_wxyz(), raw.scale());

    let mut packed = PackedSplatRecord {
        position_opacity: [position.x, position.y, position.z, raw.opacity()],
        rotation_scale: [
            pack_half2(column0.x, column1.x),
            pack_half2(column0.y, column1.y),
            pack_half2(column0.z, column1.z),
        ],
        base_color: pack_rgba8(base_color_from_sh0(raw.sh0())),
        ..default()
    };

    if let Some(sh1) = raw.sh1() {
        packed.sh1 = [
            pack_half2(sh1[0], sh1[1]),
            pack_half2(sh1[2], sh1[3]),
            pack_half2(sh1[4], sh1[5]),
            pack_half2(sh1[6], sh1[7]),
            pack_half1(sh1[8]),
        ];
    }

    if let Some(origin_color) = raw.origin_color() {
        packed.origin_color = pack_rgba8(origin_color);
    }

    if let Some(pbr) = raw.pbr() {
        packed.pbr = [
            pack_half2(pbr.x, pbr.y),
            pack_half1(pbr.z),
        ];
    }

    packed
}

/// Packs every whole record of `buffer`, preserving order.
#[cfg(feature = "sort_rayon")]
pub fn pack_all(layout: RawLayout, buffer: &[f32]) -> Vec<PackedSplatRecord> {
    buffer
        .par_chunks_exact(layout.stride())
        .map(|data| pack(&RawSplatRecord::new(layout, data)))
        .collect()
}

#[cfg(not(feature = "sort_rayon"))]
pub fn pack_all(layout: RawLayout, buffer: &[f32]) -> Vec<PackedSplatRecord> {
    layout
        .records(buffer)
        .map(|record| pack(&record))
        .collect()
}


/// Row-major grid of packed records, `DATA_TEXTURE_WIDTH` splats per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedTexture {
    records: Vec<PackedSplatRecord>,
    vertex_count: usize,
}

impl PackedTexture {
    pub fn from_records(mut records: Vec<PackedSplatRecord>) -> Self {
        let vertex_count = records.len();
        let padded = Self::rows_for(vertex_count) * DATA_TEXTURE_WIDTH;
        records.resize(padded, PackedSplatRecord::default());

        Self {
            records,
            vertex_count,
        }
    }

    fn rows_for(vertex_count: usize) -> usize {
        vertex_count.div_ceil(DATA_TEXTURE_WIDTH)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// width in rgba texels
    pub fn width(&self) -> u32 {
        (DATA_TEXTURE_WIDTH * PACKED_PIX_PER_SPLAT) as u32
    }

    pub fn height(&self) -> u32 {
        Self::rows_for(self.vertex_count) as u32
    }

    /// only the first `vertex_count` records are meaningful
    pub fn records(&self) -> &[PackedSplatRecord] {
        &self.records[..self.vertex_count]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.records.as_slice())
    }
}
