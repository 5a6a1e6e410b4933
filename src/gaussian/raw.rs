use bevy::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub enum ScaleChannels {
    /// flat splats, the third axis is implied zero
    #[default]
    Two,
    Three,
}

impl ScaleChannels {
    pub const fn len(&self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub enum RotationEncoding {
    /// stored `w, x, y, z`
    #[default]
    Quaternion,
    /// stored roll (x), pitch (y), yaw (z), composed z * y * x
    Euler,
}

impl RotationEncoding {
    pub const fn len(&self) -> usize {
        match self {
            Self::Quaternion => 4,
            Self::Euler => 3,
        }
    }
}


/// Describes the float layout of one raw splat record.
///
/// Field order is fixed: position, opacity, scale, rotation, sh band 0, then the
/// optional sh band 1, pbr triple and origin color.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub struct RawLayout {
    pub scale: ScaleChannels,
    pub rotation: RotationEncoding,
    pub sh_band1: bool,
    pub pbr: bool,
    pub origin_color: bool,
}

impl Default for RawLayout {
    fn default() -> Self {
        Self::FULL
    }
}

impl RawLayout {
    pub const FULL: Self = Self {
        scale: ScaleChannels::Two,
        rotation: RotationEncoding::Quaternion,
        sh_band1: true,
        pbr: true,
        origin_color: true,
    };

    pub const BASIC: Self = Self {
        scale: ScaleChannels::Three,
        rotation: RotationEncoding::Euler,
        sh_band1: false,
        pbr: false,
        origin_color: false,
    };

    pub const POSITION_OFFSET: usize = 0;
    pub const OPACITY_OFFSET: usize = 3;
    pub const SCALE_OFFSET: usize = 4;

    pub const fn rotation_offset(&self) -> usize {
        Self::SCALE_OFFSET + self.scale.len()
    }

    pub const fn sh0_offset(&self) -> usize {
        self.rotation_offset() + self.rotation.len()
    }

    pub const fn sh1_offset(&self) -> usize {
        self.sh0_offset() + 3
    }

    pub const fn pbr_offset(&self) -> usize {
        self.sh1_offset() + if self.sh_band1 { 9 } else { 0 }
    }

    pub const fn origin_color_offset(&self) -> usize {
        self.pbr_offset() + if self.pbr { 3 } else { 0 }
    }

    /// floats per record
    pub const fn stride(&self) -> usize {
        self.origin_color_offset() + if self.origin_color { 3 } else { 0 }
    }

    pub fn record<'a>(&self, buffer: &'a [f32], index: usize) -> RawSplatRecord<'a> {
        let stride = self.stride();
        RawSplatRecord {
            layout: *self,
            data: &buffer[index * stride..(index + 1) * stride],
        }
    }

    /// trailing floats that do not fill a record are ignored
    pub fn records(self, buffer: &[f32]) -> impl ExactSizeIterator<Item = RawSplatRecord<'_>> {
        let layout = self;
        buffer
            .chunks_exact(layout.stride())
            .map(move |data| RawSplatRecord { layout, data })
    }

    pub fn vertex_count(&self, buffer: &[f32]) -> usize {
        buffer.len() / self.stride()
    }
}


/// Borrowed view over one record of a raw float buffer.
#[derive(Clone, Copy, Debug)]
pub struct RawSplatRecord<'a> {
    layout: RawLayout,
    data: &'a [f32],
}

impl<'a> RawSplatRecord<'a> {
    pub fn new(layout: RawLayout, data: &'a [f32]) -> Self {
        debug_assert_eq!(data.len(), layout.stride());
        Self { layout, data }
    }

    pub fn layout(&self) -> RawLayout {
        self.layout
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_slice(&self.data[RawLayout::POSITION_OFFSET..])
    }

    pub fn opacity(&self) -> f32 {
        self.data[RawLayout::OPACITY_OFFSET]
    }

    /// the two in-plane scales, any third scale is dropped
    pub fn scale(&self) -> Vec2 {
        Vec2::from_slice(&self.data[RawLayout::SCALE_OFFSET..])
    }

    /// rotation as `(w, x, y, z)`, not normalized
    pub fn rotation_wxyz(&self) -> Vec4 {
        let offset = self.layout.rotation_offset();
        match self.layout.rotation {
            RotationEncoding::Quaternion => Vec4::from_slice(&self.data[offset..]),
            RotationEncoding::Euler => {
                let q = Quat::from_euler(
                    EulerRot::ZYX,
                    self.data[offset + 2],
                    self.data[offset + 1],
                    self.data[offset],
                );
                Vec4::new(q.w, q.x, q.y, q.z)
            }
        }
    }

    pub fn sh0(&self) -> Vec3 {
        Vec3::from_slice(&self.data[self.layout.sh0_offset()..])
    }

    pub fn sh1(&self) -> Option<[f32; 9]> {
        if !self.layout.sh_band1 {
            return None;
        }

        let offset = self.layout.sh1_offset();
        let mut coefficients = [0.0; 9];
        coefficients.copy_from_slice(&self.data[offset..offset + 9]);
        Some(coefficients)
    }

    /// reflectance, roughness, metalness
    pub fn pbr(&self) -> Option<Vec3> {
        self.layout.pbr.then(|| Vec3::from_slice(&self.data[self.layout.pbr_offset()..]))
    }

    pub fn origin_color(&self) -> Option<Vec3> {
        self.layout.origin_color.then(|| Vec3::from_slice(&self.data[self.layout.origin_color_offset()..]))
    }
}


/// Owned splat attributes, used to author raw buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawSplat {
    pub position: Vec3,
    pub opacity: f32,
    pub scale: Vec3,
    pub rotation: Quat,
    pub sh0: Vec3,
    pub sh1: [f32; 9],
    pub pbr: Vec3,
    pub origin_color: Vec3,
}

impl Default for RawSplat {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            opacity: 1.0,
            scale: Vec3::new(0.01, 0.01, 0.0),
            rotation: Quat::IDENTITY,
            sh0: Vec3::ZERO,
            sh1: [0.0; 9],
            pbr: Vec3::ZERO,
            origin_color: Vec3::ZERO,
        }
    }
}

impl RawSplat {
    pub fn write_to(&self, layout: &RawLayout, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position.to_array());
        out.push(self.opacity);

        match layout.scale {
            ScaleChannels::Two => out.extend_from_slice(&[self.scale.x, self.scale.y]),
            ScaleChannels::Three => out.extend_from_slice(&self.scale.to_array()),
        }

        match layout.rotation {
            RotationEncoding::Quaternion => out.extend_from_slice(&[
                self.rotation.w,
                self.rotation.x,
                self.rotation.y,
                self.rotation.z,
            ]),
            RotationEncoding::Euler => {
                let (yaw, pitch, roll) = self.rotation.to_euler(EulerRot::ZYX);
                out.extend_from_slice(&[roll, pitch, yaw]);
            }
        }

        out.extend_from_slice(&self.sh0.to_array());

        if layout.sh_band1 {
            out.extend_from_slice(&self.sh1);
        }
        if layout.pbr {
            out.extend_from_slice(&self.pbr.to_array());
        }
        if layout.origin_color {
            out.extend_from_slice(&self.origin_color.to_array());
        }
    }
}

pub fn write_raw_buffer(layout: &RawLayout, splats: &[RawSplat]) -> Vec<f32> {
    let mut buffer = Vec::with_capacity(splats.len() * layout.stride());
    for splat in splats {
        splat.write_to(layout, &mut buffer);
    }
    buffer
}
