use crate::gaussian::{
    packed::{
        pack_all,
        PackedSplatRecord,
        PackedTexture,
    },
    raw::RawLayout,
};


/// A validated dataset buffer, owned and ready to hand to a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum SplatData {
    Raw {
        layout: RawLayout,
        floats: Vec<f32>,
    },
    Packed(Vec<PackedSplatRecord>),
}

impl SplatData {
    pub fn raw(floats: Vec<f32>) -> Self {
        Self::Raw {
            layout: RawLayout::FULL,
            floats,
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Raw { layout, floats } => layout.vertex_count(floats),
            Self::Packed(records) => records.len(),
        }
    }

    /// packs raw floats, pre-packed records are only padded
    pub fn into_texture(self) -> PackedTexture {
        let records = match self {
            Self::Raw { layout, floats } => pack_all(layout, &floats),
            Self::Packed(records) => records,
        };

        PackedTexture::from_records(records)
    }
}
