use thiserror::Error;


/// Fatal to the load that produced it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("vertex count mismatch: declared {declared}, buffer holds {derived}")]
    VertexCount {
        declared: usize,
        derived: usize,
    },

    #[error("channel count mismatch: declared {declared}, expected {expected}")]
    ChannelCount {
        declared: usize,
        expected: usize,
    },

    #[error("buffer of {byte_length} bytes is not a whole number of {stride_bytes}-byte records")]
    MisalignedBuffer {
        byte_length: usize,
        stride_bytes: usize,
    },

    #[error("environment map of {float_count} floats is not six square rgba faces")]
    EnvironmentMap {
        float_count: usize,
    },

    #[error("environment map declares face size {face_size} but holds {float_count} floats")]
    EnvironmentMapWidth {
        face_size: usize,
        float_count: usize,
    },

    #[error("malformed chunk metadata: {0}")]
    ChunkMetadata(String),

    #[error("ply is missing required properties: {0:?}")]
    MissingProperties(Vec<String>),
}


#[derive(Debug, Error)]
pub enum SplatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("fetching chunk {chunk_id} failed: {reason}")]
    TransientIo {
        chunk_id: String,
        reason: String,
    },

    #[error("unknown chunk {0}")]
    UnknownChunk(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SplatError {
    pub fn transient(chunk_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::TransientIo {
            chunk_id: chunk_id.into(),
            reason: reason.to_string(),
        }
    }

    /// transient failures are retried by the streamer instead of aborting the load
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo { .. })
    }
}
