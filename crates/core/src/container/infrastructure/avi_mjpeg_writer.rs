use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::container::domain::avi_layout::{
    padded_len, AVI, AVIF_HASINDEX, AVIH, AVIH_SIZE, AVIIF_KEYFRAME, BITS_PER_PIXEL,
    CHUNK_HEADER_LEN, HDRL, HDRL_LIST_SIZE, IDX1, INDEX_ENTRY_LEN, LIST, MAX_DIMENSION, MJPG,
    MOVI, RIFF, STRF, STRF_SIZE, STRH, STRH_SIZE, STRL, STRL_LIST_SIZE, VIDEO_CHUNK, VIDS,
};
use crate::container::domain::chunk_index::ChunkIndexBuilder;
use crate::container::domain::container_session::{ContainerSession, HeaderLayout};
use crate::container::domain::container_writer::{
    ContainerSummary, ContainerWriter, MuxError, ProtocolError, WriterState,
};
use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::recording_metadata::RecordingMetadata;

/// Streams MJPEG frames into a RIFF/AVI container.
///
/// Headers go out first with zeroed size and frame-count fields, each
/// frame chunk is written as soon as it arrives, and `finalize` appends
/// `idx1` then seeks back to patch the four deferred fields. Only the
/// 16-byte index records are kept in memory.
///
/// Odd-length payloads are followed by a zero pad byte so every chunk
/// starts on an even offset; size fields and index sizes hold the
/// unpadded length.
pub struct AviMjpegWriter<W: Write + Seek> {
    sink: W,
    state: WriterState,
    session: Option<ContainerSession>,
    index: ChunkIndexBuilder,
}

impl AviMjpegWriter<BufWriter<File>> {
    /// Creates (or truncates) `path` and wraps it in a buffered writer.
    pub fn create(path: &Path) -> Result<Self, MuxError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Seek> AviMjpegWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::Idle,
            session: None,
            index: ChunkIndexBuilder::new(),
        }
    }

    pub fn session(&self) -> Option<&ContainerSession> {
        self.session.as_ref()
    }

    pub fn index(&self) -> &ChunkIndexBuilder {
        &self.index
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn fail<T>(&mut self, err: MuxError) -> Result<T, MuxError> {
        log::warn!("AVI session failed: {err}");
        self.state = WriterState::Failed;
        Err(err)
    }

    fn open_session(&self) -> Result<ContainerSession, MuxError> {
        match (self.state, self.session) {
            (WriterState::Open, Some(session)) => Ok(session),
            (WriterState::Idle, _) => Err(ProtocolError::NotBegun.into()),
            (WriterState::Closed, _) => Err(ProtocolError::AlreadyFinalized.into()),
            _ => Err(ProtocolError::SessionFailed.into()),
        }
    }

    fn write_chunk(&mut self, session: &ContainerSession, payload: &[u8]) -> Result<(), MuxError> {
        let len = payload.len() as u64;
        let offset = to_u32(session.movi_offset())?;
        let size = to_u32(len)?;

        // The finished file must still fit the 32-bit RIFF size once this
        // chunk and its index record are in place.
        let projected = session.next_chunk_pos() - session.layout().riff_start
            + CHUNK_HEADER_LEN
            + padded_len(len)
            + CHUNK_HEADER_LEN
            + INDEX_ENTRY_LEN * (self.index.len() as u64 + 1);
        to_u32(projected - CHUNK_HEADER_LEN)?;

        self.sink.write_all(&VIDEO_CHUNK)?;
        write_u32(&mut self.sink, size)?;
        self.sink.write_all(payload)?;
        if len & 1 == 1 {
            self.sink.write_all(&[0])?;
        }

        self.index.append(VIDEO_CHUNK, AVIIF_KEYFRAME, offset, size);
        Ok(())
    }

    fn write_trailer(&mut self, session: &ContainerSession) -> Result<ContainerSummary, MuxError> {
        let layout = *session.layout();
        let idx1_pos = self.sink.stream_position()?;
        debug_assert_eq!(idx1_pos, session.next_chunk_pos());

        let index_len = to_u32(self.index.byte_len())?;
        self.sink.write_all(&IDX1)?;
        write_u32(&mut self.sink, index_len)?;
        self.sink.write_all(&self.index.serialize())?;
        let end = self.sink.stream_position()?;

        // movi is sized up to end of stream, so it also spans idx1
        let movi_size = to_u32(end - layout.movi_size_field_pos - CHUNK_HEADER_LEN)?;
        let riff_size = to_u32(end - layout.riff_start - CHUNK_HEADER_LEN)?;
        let frames = session.frame_count();

        patch_u32(&mut self.sink, layout.movi_size_field_pos, movi_size)?;
        patch_u32(&mut self.sink, layout.riff_size_pos(), riff_size)?;
        patch_u32(&mut self.sink, layout.total_frames_pos, frames)?;
        patch_u32(&mut self.sink, layout.stream_length_pos, frames)?;
        self.sink.seek(SeekFrom::Start(end))?;
        self.sink.flush()?;

        Ok(ContainerSummary {
            frame_count: frames,
            file_len: end - layout.riff_start,
            movi_size,
            index_len,
        })
    }
}

impl<W: Write + Seek + Send> ContainerWriter for AviMjpegWriter<W> {
    fn begin(&mut self, metadata: &RecordingMetadata) -> Result<(), MuxError> {
        match self.state {
            WriterState::Idle => {}
            WriterState::Open => return Err(ProtocolError::AlreadyBegun.into()),
            WriterState::Closed => return Err(ProtocolError::AlreadyFinalized.into()),
            WriterState::Failed => return Err(ProtocolError::SessionFailed.into()),
        }
        validate_metadata(metadata)?;

        match write_headers(&mut self.sink, metadata) {
            Ok(layout) => {
                log::debug!(
                    "AVI session started: {}x{} @ {} fps, movi payload at {}",
                    metadata.width,
                    metadata.height,
                    metadata.fps,
                    layout.movi_payload_start
                );
                self.session = Some(ContainerSession::new(*metadata, layout));
                self.state = WriterState::Open;
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<(), MuxError> {
        let mut session = self.open_session()?;
        let meta = *session.metadata();
        if frame.width() != meta.width || frame.height() != meta.height {
            return Err(ProtocolError::DimensionsChanged {
                width: meta.width,
                height: meta.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            }
            .into());
        }

        if let Err(e) = self.write_chunk(&session, frame.data()) {
            return self.fail(e);
        }
        session.record_chunk(frame.len() as u64);
        self.session = Some(session);
        Ok(())
    }

    fn finalize(&mut self) -> Result<ContainerSummary, MuxError> {
        let session = self.open_session()?;
        match self.write_trailer(&session) {
            Ok(summary) => {
                self.state = WriterState::Closed;
                log::debug!(
                    "AVI session finalized: {} frames, {} bytes",
                    summary.frame_count,
                    summary.file_len
                );
                Ok(summary)
            }
            Err(e) => self.fail(e),
        }
    }

    fn state(&self) -> WriterState {
        self.state
    }

    fn frames_written(&self) -> u32 {
        self.session.map_or(0, |s| s.frame_count())
    }
}

fn validate_metadata(metadata: &RecordingMetadata) -> Result<(), MuxError> {
    if metadata.fps == 0 {
        return Err(MuxError::InvalidParameters("fps must be at least 1".into()));
    }
    for (name, value) in [("width", metadata.width), ("height", metadata.height)] {
        if value == 0 || value > MAX_DIMENSION {
            return Err(MuxError::InvalidParameters(format!(
                "{name} must be between 1 and {MAX_DIMENSION}, got {value}"
            )));
        }
    }
    Ok(())
}

/// Writes everything up to and including the `movi` FourCC, recording the
/// positions `finalize` will revisit.
fn write_headers<W: Write + Seek>(
    w: &mut W,
    metadata: &RecordingMetadata,
) -> io::Result<HeaderLayout> {
    let width = metadata.width;
    let height = metadata.height;
    let riff_start = w.stream_position()?;

    w.write_all(&RIFF)?;
    write_u32(w, 0)?;
    w.write_all(&AVI)?;

    w.write_all(&LIST)?;
    write_u32(w, HDRL_LIST_SIZE)?;
    w.write_all(&HDRL)?;

    w.write_all(&AVIH)?;
    write_u32(w, AVIH_SIZE)?;
    write_u32(w, metadata.micros_per_frame())?;
    write_u32(w, 0)?; // max bytes per second
    write_u32(w, 0)?; // padding granularity
    write_u32(w, AVIF_HASINDEX)?;
    let total_frames_pos = w.stream_position()?;
    write_u32(w, 0)?;
    write_u32(w, 0)?; // initial frames
    write_u32(w, 1)?; // streams
    write_u32(w, 0)?; // suggested buffer size
    write_u32(w, width)?;
    write_u32(w, height)?;
    for _ in 0..4 {
        write_u32(w, 0)?;
    }

    w.write_all(&LIST)?;
    write_u32(w, STRL_LIST_SIZE)?;
    w.write_all(&STRL)?;

    w.write_all(&STRH)?;
    write_u32(w, STRH_SIZE)?;
    w.write_all(&VIDS)?;
    w.write_all(&MJPG)?;
    write_u32(w, 0)?; // flags
    write_u32(w, 0)?; // priority + language
    write_u32(w, 0)?; // initial frames
    write_u32(w, 1)?; // scale
    write_u32(w, metadata.fps)?;
    write_u32(w, 0)?; // start
    let stream_length_pos = w.stream_position()?;
    write_u32(w, 0)?;
    write_u32(w, 0)?; // suggested buffer size
    write_u32(w, 0)?; // quality
    write_u32(w, 0)?; // sample size
    // rcFrame; dimensions were validated to fit i16
    for coord in [0, 0, width as u16, height as u16] {
        w.write_all(&coord.to_le_bytes())?;
    }

    w.write_all(&STRF)?;
    write_u32(w, STRF_SIZE)?;
    write_u32(w, STRF_SIZE)?;
    write_u32(w, width)?;
    write_u32(w, height)?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&BITS_PER_PIXEL.to_le_bytes())?;
    w.write_all(&MJPG)?;
    write_u32(w, width.saturating_mul(height).saturating_mul(3))?;
    for _ in 0..4 {
        write_u32(w, 0)?;
    }

    w.write_all(&LIST)?;
    let movi_size_field_pos = w.stream_position()?;
    write_u32(w, 0)?;
    w.write_all(&MOVI)?;
    let movi_payload_start = w.stream_position()?;

    Ok(HeaderLayout {
        riff_start,
        total_frames_pos,
        stream_length_pos,
        movi_size_field_pos,
        movi_payload_start,
    })
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn patch_u32<W: Write + Seek>(w: &mut W, pos: u64, value: u32) -> io::Result<()> {
    w.seek(SeekFrom::Start(pos))?;
    write_u32(w, value)
}

fn to_u32(value: u64) -> Result<u32, MuxError> {
    u32::try_from(value).map_err(|_| MuxError::SizeOverflow)
}
