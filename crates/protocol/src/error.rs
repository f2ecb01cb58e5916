use thiserror::Error;
use tokio_util::codec::LinesCodecError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame exceeds {max} bytes")]
    FrameTooLong { max: usize },

    #[error("Malformed frame: {0}")]
    Malformed(String),
}

impl From<LinesCodecError> for ProtocolError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::MaxLineLengthExceeded => ProtocolError::FrameTooLong {
                max: crate::codec::MAX_FRAME_BYTES,
            },
            LinesCodecError::Io(io) => ProtocolError::Io(io),
        }
    }
}
