use crate::container::domain::avi_layout::{padded_len, CHUNK_HEADER_LEN};
use crate::shared::recording_metadata::RecordingMetadata;

/// Stream positions recorded while the headers are written, revisited
/// once the final sizes are known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Position of the `RIFF` tag; its size field sits 4 bytes later.
    pub riff_start: u64,
    /// `avih.dwTotalFrames`
    pub total_frames_pos: u64,
    /// `strh.dwLength`
    pub stream_length_pos: u64,
    pub movi_size_field_pos: u64,
    /// First byte after the `movi` FourCC; index offsets are relative to it.
    pub movi_payload_start: u64,
}

impl HeaderLayout {
    pub fn riff_size_pos(&self) -> u64 {
        self.riff_start + 4
    }
}

/// Per-session bookkeeping: fixed parameters, running counters and the
/// positions to backpatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerSession {
    metadata: RecordingMetadata,
    layout: HeaderLayout,
    frame_count: u32,
    movi_offset: u64,
}

impl ContainerSession {
    pub fn new(metadata: RecordingMetadata, layout: HeaderLayout) -> Self {
        Self {
            metadata,
            layout,
            frame_count: 0,
            movi_offset: 0,
        }
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Offset of the next chunk header relative to the movi payload.
    pub fn movi_offset(&self) -> u64 {
        self.movi_offset
    }

    /// Absolute stream position where the next chunk header goes.
    pub fn next_chunk_pos(&self) -> u64 {
        self.layout.movi_payload_start + self.movi_offset
    }

    /// Accounts for one written chunk (header, payload and pad byte).
    pub fn record_chunk(&mut self, payload_len: u64) {
        self.movi_offset += CHUNK_HEADER_LEN + padded_len(payload_len);
        self.frame_count += 1;
    }
}
