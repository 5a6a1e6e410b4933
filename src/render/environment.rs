use crate::{
    error::ValidationError,
    io::payload::EnvironmentPayload,
};


pub const ENVIRONMENT_FACES: usize = 6;


/// Six square rgba float faces, row-major, no mips.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentMap {
    face_size: usize,
    floats: Vec<f32>,
}

impl EnvironmentMap {
    /// floats in a map with faces of `face_size` texels square, `None` on overflow
    pub fn float_count(face_size: usize) -> Option<usize> {
        face_size
            .checked_mul(face_size)?
            .checked_mul(ENVIRONMENT_FACES * 4)
    }

    /// Validates the buffer length, inferring the face size when none is declared.
    pub fn from_floats(floats: Vec<f32>, face_size: Option<usize>) -> Result<Self, ValidationError> {
        let float_count = floats.len();

        let face_size = match face_size {
            Some(face_size) => {
                if face_size == 0 || Self::float_count(face_size) != Some(float_count) {
                    return Err(ValidationError::EnvironmentMapWidth {
                        face_size,
                        float_count,
                    });
                }
                face_size
            }
            None => Self::infer_face_size(float_count)
                .ok_or(ValidationError::EnvironmentMap { float_count })?,
        };

        Ok(Self {
            face_size,
            floats,
        })
    }

    fn infer_face_size(float_count: usize) -> Option<usize> {
        let per_face = ENVIRONMENT_FACES * 4;
        if float_count == 0 || float_count % per_face != 0 {
            return None;
        }

        let texels = float_count / per_face;
        let side = (texels as f64).sqrt().round() as usize;
        (side * side == texels).then_some(side)
    }

    pub fn face_size(&self) -> usize {
        self.face_size
    }

    pub fn floats(&self) -> &[f32] {
        &self.floats
    }

    pub fn face(&self, index: usize) -> &[f32] {
        let face_len = self.face_size * self.face_size * 4;
        &self.floats[index * face_len..(index + 1) * face_len]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.floats.as_slice())
    }
}

impl TryFrom<EnvironmentPayload> for EnvironmentMap {
    type Error = ValidationError;

    fn try_from(payload: EnvironmentPayload) -> Result<Self, Self::Error> {
        Self::from_floats(payload.floats, payload.face_size)
    }
}
