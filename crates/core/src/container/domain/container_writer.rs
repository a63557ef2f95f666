use thiserror::Error;

use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::recording_metadata::RecordingMetadata;

/// Calls made out of order for the writer's lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("container session has not been started")]
    NotBegun,
    #[error("container session already started")]
    AlreadyBegun,
    #[error("container session already finalized")]
    AlreadyFinalized,
    #[error("container session failed earlier and cannot continue")]
    SessionFailed,
    #[error("frame is {actual_width}x{actual_height} but session is {width}x{height}")]
    DimensionsChanged {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("container I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid session parameters: {0}")]
    InvalidParameters(String),
    #[error("container would exceed the 4 GiB RIFF size limit")]
    SizeOverflow,
}

/// Sizes of a finalized container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerSummary {
    pub frame_count: u32,
    pub file_len: u64,
    /// Value stored in the `movi` LIST size field.
    pub movi_size: u32,
    /// Payload length of the `idx1` chunk.
    pub index_len: u32,
}

/// Lifecycle of a writer's session.
///
/// `Failed` is terminal: the partially written output must not be treated
/// as playable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Open,
    Closed,
    Failed,
}

/// Streams encoded frames into a container whose header is completed
/// once the last frame is known.
pub trait ContainerWriter: Send {
    fn begin(&mut self, metadata: &RecordingMetadata) -> Result<(), MuxError>;

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<(), MuxError>;

    /// Writes the index and patches every deferred size field. Legal
    /// exactly once per session.
    fn finalize(&mut self) -> Result<ContainerSummary, MuxError>;

    fn state(&self) -> WriterState;

    fn frames_written(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_converts_into_mux_error() {
        let err: MuxError = ProtocolError::AlreadyFinalized.into();
        assert!(matches!(
            err,
            MuxError::Protocol(ProtocolError::AlreadyFinalized)
        ));
        assert_eq!(err.to_string(), "container session already finalized");
    }

    #[test]
    fn test_io_error_message() {
        let err: MuxError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.to_string(), "container I/O failed: disk full");
    }
}
