use crate::{
    error::ValidationError,
    gaussian::{
        data::SplatData,
        raw::RawLayout,
    },
    settings::PACKED_FLOAT_PER_SPLAT,
};


#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PayloadFormat {
    /// raw float records, packed after ingestion
    Raw(RawLayout),
    /// already packed 16 word records
    #[default]
    Packed,
}

impl PayloadFormat {
    /// 32-bit words per record
    pub fn stride(&self) -> usize {
        match self {
            Self::Raw(layout) => layout.stride(),
            Self::Packed => PACKED_FLOAT_PER_SPLAT,
        }
    }
}


/// Bytes from a dataset source with the counts it declared out of band.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetPayload {
    pub bytes: Vec<u8>,
    pub declared_vertex_count: usize,
    pub declared_channel_count: usize,
    pub format: PayloadFormat,
}

impl DatasetPayload {
    pub fn packed(bytes: Vec<u8>, declared_vertex_count: usize, declared_channel_count: usize) -> Self {
        Self {
            bytes,
            declared_vertex_count,
            declared_channel_count,
            format: PayloadFormat::Packed,
        }
    }

    pub fn raw(layout: RawLayout, bytes: Vec<u8>, declared_vertex_count: usize, declared_channel_count: usize) -> Self {
        Self {
            bytes,
            declared_vertex_count,
            declared_channel_count,
            format: PayloadFormat::Raw(layout),
        }
    }

    pub fn from_raw_floats(layout: RawLayout, floats: &[f32]) -> Self {
        Self::raw(
            layout,
            bytemuck::cast_slice::<f32, u8>(floats).to_vec(),
            layout.vertex_count(floats),
            PACKED_FLOAT_PER_SPLAT,
        )
    }

    /// Checks the declared counts against the buffer, whole or not at all.
    pub fn validate(self) -> Result<SplatData, ValidationError> {
        let stride_bytes = self.format.stride() * 4;
        let byte_length = self.bytes.len();

        if byte_length % stride_bytes != 0 {
            return Err(ValidationError::MisalignedBuffer {
                byte_length,
                stride_bytes,
            });
        }

        let derived = byte_length / stride_bytes;
        if self.declared_vertex_count != derived {
            return Err(ValidationError::VertexCount {
                declared: self.declared_vertex_count,
                derived,
            });
        }

        if self.declared_channel_count != PACKED_FLOAT_PER_SPLAT {
            return Err(ValidationError::ChannelCount {
                declared: self.declared_channel_count,
                expected: PACKED_FLOAT_PER_SPLAT,
            });
        }

        Ok(match self.format {
            PayloadFormat::Raw(layout) => SplatData::Raw {
                layout,
                floats: bytemuck::pod_collect_to_vec(&self.bytes),
            },
            PayloadFormat::Packed => SplatData::Packed(bytemuck::pod_collect_to_vec(&self.bytes)),
        })
    }
}


/// Six square rgba float faces as served, with the declared face size.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentPayload {
    pub floats: Vec<f32>,
    pub face_size: Option<usize>,
}
