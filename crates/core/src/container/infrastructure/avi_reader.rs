use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

use crate::container::domain::avi_layout::{
    fourcc_str, padded_len, FourCc, AVI, AVIH, AVIH_SIZE, CHUNK_HEADER_LEN, HDRL, IDX1,
    INDEX_ENTRY_LEN, LIST, MOVI, RIFF, STRF, STRF_SIZE, STRH, STRH_SIZE, STRL,
};
use crate::container::domain::chunk_index::ChunkIndexEntry;

#[derive(Error, Debug)]
pub enum AviReadError {
    #[error("failed to read container: {0}")]
    Io(#[from] io::Error),
    #[error("not a RIFF/AVI file")]
    NotRiff,
    #[error("malformed container: {0}")]
    Malformed(String),
    #[error("missing '{0}' chunk")]
    MissingChunk(String),
    #[error("frame {index} out of range ({count} frames indexed)")]
    FrameOutOfRange { index: usize, count: usize },
    #[error("failed to decode frame {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
}

/// `avih` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MainHeader {
    pub micros_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub streams: u32,
    pub width: u32,
    pub height: u32,
}

/// `strh` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    pub kind: FourCc,
    pub handler: FourCc,
    pub scale: u32,
    pub rate: u32,
    pub length: u32,
    /// `rcFrame` as (left, top, right, bottom).
    pub frame: (i16, i16, i16, i16),
}

/// `strf` contents for a video stream (`BITMAPINFOHEADER`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: FourCc,
    pub size_image: u32,
}

/// Parses a single-stream AVI and gives indexed access to its frames.
///
/// The whole RIFF tree is walked once on open; frame payloads are read
/// lazily through the `idx1` index.
pub struct AviReader<R: Read + Seek> {
    reader: R,
    file_len: u64,
    riff_size: u32,
    main_header: MainHeader,
    stream_header: StreamHeader,
    format: BitmapInfo,
    movi_list_start: u64,
    movi_size: u32,
    idx1_pos: u64,
    index: Vec<ChunkIndexEntry>,
}

impl AviReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, AviReadError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

#[derive(Default)]
struct HeaderChunks {
    main: Option<MainHeader>,
    stream: Option<StreamHeader>,
    format: Option<BitmapInfo>,
}

impl<R: Read + Seek> AviReader<R> {
    pub fn from_reader(mut reader: R) -> Result<Self, AviReadError> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_len < 12 {
            return Err(AviReadError::NotRiff);
        }
        let riff = read_fourcc(&mut reader)?;
        let riff_size = read_u32(&mut reader)?;
        let form = read_fourcc(&mut reader)?;
        if riff != RIFF || form != AVI {
            return Err(AviReadError::NotRiff);
        }

        let end = file_len.min(CHUNK_HEADER_LEN + riff_size as u64);
        let mut headers = HeaderChunks::default();
        let mut movi: Option<(u64, u32)> = None;
        let mut idx1: Option<(u64, Vec<ChunkIndexEntry>)> = None;

        let mut pos = 12;
        while pos + CHUNK_HEADER_LEN <= end {
            reader.seek(SeekFrom::Start(pos))?;
            let tag = read_fourcc(&mut reader)?;
            let size = read_u32(&mut reader)?;
            let body_end = pos + CHUNK_HEADER_LEN + size as u64;
            if body_end > file_len {
                return Err(AviReadError::Malformed(format!(
                    "chunk '{}' at {pos} extends past end of file",
                    fourcc_str(&tag)
                )));
            }

            if tag == LIST {
                let list_type = read_fourcc(&mut reader)?;
                if list_type == HDRL {
                    read_hdrl(&mut reader, pos + 12, body_end, &mut headers)?;
                } else if list_type == MOVI {
                    // Walk into movi: idx1 may sit inside its extent or after it.
                    movi = Some((pos, size));
                    pos += 12;
                    continue;
                }
            } else if tag == IDX1 {
                idx1 = Some((pos, read_index(&mut reader, size)?));
            }

            pos = pos + CHUNK_HEADER_LEN + padded_len(size as u64);
        }

        let missing = |name: &FourCc| AviReadError::MissingChunk(fourcc_str(name));
        let main_header = headers.main.ok_or_else(|| missing(&AVIH))?;
        let stream_header = headers.stream.ok_or_else(|| missing(&STRH))?;
        let format = headers.format.ok_or_else(|| missing(&STRF))?;
        let (movi_list_start, movi_size) = movi.ok_or_else(|| missing(&MOVI))?;
        let (idx1_pos, index) = idx1.ok_or_else(|| missing(&IDX1))?;

        Ok(Self {
            reader,
            file_len,
            riff_size,
            main_header,
            stream_header,
            format,
            movi_list_start,
            movi_size,
            idx1_pos,
            index,
        })
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn riff_size(&self) -> u32 {
        self.riff_size
    }

    pub fn main_header(&self) -> &MainHeader {
        &self.main_header
    }

    pub fn stream_header(&self) -> &StreamHeader {
        &self.stream_header
    }

    pub fn format(&self) -> &BitmapInfo {
        &self.format
    }

    /// Position of the `LIST` tag that opens the movi list.
    pub fn movi_list_start(&self) -> u64 {
        self.movi_list_start
    }

    pub fn movi_size(&self) -> u32 {
        self.movi_size
    }

    pub fn movi_payload_start(&self) -> u64 {
        self.movi_list_start + 12
    }

    pub fn idx1_pos(&self) -> u64 {
        self.idx1_pos
    }

    pub fn index(&self) -> &[ChunkIndexEntry] {
        &self.index
    }

    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    /// Returns the payload of frame `index`, located through `idx1`.
    pub fn read_frame(&mut self, index: usize) -> Result<Vec<u8>, AviReadError> {
        let entry = *self
            .index
            .get(index)
            .ok_or(AviReadError::FrameOutOfRange {
                index,
                count: self.index.len(),
            })?;

        let pos = self.movi_payload_start() + entry.offset as u64;
        if pos + CHUNK_HEADER_LEN + entry.size as u64 > self.file_len {
            return Err(AviReadError::Malformed(format!(
                "frame {index} at {pos} extends past end of file"
            )));
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        let tag = read_fourcc(&mut self.reader)?;
        let size = read_u32(&mut self.reader)?;
        if tag != entry.tag || size != entry.size {
            return Err(AviReadError::Malformed(format!(
                "frame {index}: index says '{}'/{} bytes, chunk says '{}'/{} bytes",
                fourcc_str(&entry.tag),
                entry.size,
                fourcc_str(&tag),
                size
            )));
        }

        let mut payload = vec![0u8; size as usize];
        self.reader.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Decodes frame `index` from JPEG to RGB.
    pub fn decode_frame(&mut self, index: usize) -> Result<image::RgbImage, AviReadError> {
        let payload = self.read_frame(index)?;
        let image = image::load_from_memory_with_format(&payload, image::ImageFormat::Jpeg)
            .map_err(|source| AviReadError::Decode { index, source })?;
        Ok(image.to_rgb8())
    }

    /// Checks every size, count and offset field against the bytes that are
    /// actually present. Returns one message per violation.
    pub fn verify(&mut self) -> Result<Vec<String>, AviReadError> {
        let mut problems = Vec::new();
        let frames = self.index.len() as u64;

        if self.riff_size as u64 + CHUNK_HEADER_LEN != self.file_len {
            problems.push(format!(
                "RIFF size {} does not match file length {} - 8",
                self.riff_size, self.file_len
            ));
        }

        let movi_size_field_pos = self.movi_list_start + 4;
        let expected_movi = self
            .file_len
            .saturating_sub(movi_size_field_pos + CHUNK_HEADER_LEN);
        if self.movi_size as u64 != expected_movi {
            problems.push(format!(
                "movi size {} does not match file length {} - {movi_size_field_pos} - 8",
                self.movi_size, self.file_len
            ));
        }
        if self.idx1_pos < self.movi_payload_start() {
            problems.push(format!(
                "idx1 at {} precedes the movi payload",
                self.idx1_pos
            ));
        }

        if self.main_header.total_frames as u64 != frames {
            problems.push(format!(
                "avih.dwTotalFrames is {} but index holds {frames} entries",
                self.main_header.total_frames
            ));
        }
        if self.stream_header.length as u64 != frames {
            problems.push(format!(
                "strh.dwLength is {} but index holds {frames} entries",
                self.stream_header.length
            ));
        }

        let movi_payload_len = self.idx1_pos.saturating_sub(self.movi_payload_start());
        for i in 0..self.index.len() {
            let entry = self.index[i];
            if !entry.is_keyframe() {
                problems.push(format!("frame {i} is not flagged as a keyframe"));
            }
            let chunk_end =
                entry.offset as u64 + CHUNK_HEADER_LEN + padded_len(entry.size as u64);
            if chunk_end > movi_payload_len {
                problems.push(format!("frame {i} lies outside the movi payload"));
                continue;
            }
            if let Err(e) = self.read_frame(i) {
                problems.push(e.to_string());
            }
        }

        Ok(problems)
    }
}

fn read_hdrl<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    headers: &mut HeaderChunks,
) -> Result<(), AviReadError> {
    let mut pos = start;
    while pos + CHUNK_HEADER_LEN <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let tag = read_fourcc(reader)?;
        let size = read_u32(reader)?;
        let body_end = pos + CHUNK_HEADER_LEN + size as u64;
        if body_end > end {
            return Err(AviReadError::Malformed(format!(
                "'{}' overruns its header list",
                fourcc_str(&tag)
            )));
        }

        if tag == AVIH {
            expect_size(&tag, size, AVIH_SIZE)?;
            headers.main = Some(read_main_header(reader)?);
        } else if tag == STRH {
            expect_size(&tag, size, STRH_SIZE)?;
            headers.stream = Some(read_stream_header(reader)?);
        } else if tag == STRF {
            expect_size(&tag, size, STRF_SIZE)?;
            headers.format = Some(read_bitmap_info(reader)?);
        } else if tag == LIST && read_fourcc(reader)? == STRL {
            // Only the first stream is of interest.
            if headers.stream.is_none() {
                read_hdrl(reader, pos + 12, body_end, headers)?;
            }
        }

        pos = pos + CHUNK_HEADER_LEN + padded_len(size as u64);
    }
    Ok(())
}

fn expect_size(tag: &FourCc, actual: u32, expected: u32) -> Result<(), AviReadError> {
    if actual < expected {
        return Err(AviReadError::Malformed(format!(
            "'{}' is {actual} bytes, expected {expected}",
            fourcc_str(tag)
        )));
    }
    Ok(())
}

fn read_main_header<R: Read>(reader: &mut R) -> Result<MainHeader, AviReadError> {
    let micros_per_frame = read_u32(reader)?;
    let max_bytes_per_sec = read_u32(reader)?;
    let _padding_granularity = read_u32(reader)?;
    let flags = read_u32(reader)?;
    let total_frames = read_u32(reader)?;
    let _initial_frames = read_u32(reader)?;
    let streams = read_u32(reader)?;
    let _suggested_buffer_size = read_u32(reader)?;
    let width = read_u32(reader)?;
    let height = read_u32(reader)?;
    Ok(MainHeader {
        micros_per_frame,
        max_bytes_per_sec,
        flags,
        total_frames,
        streams,
        width,
        height,
    })
}

fn read_stream_header<R: Read>(reader: &mut R) -> Result<StreamHeader, AviReadError> {
    let kind = read_fourcc(reader)?;
    let handler = read_fourcc(reader)?;
    let _flags = read_u32(reader)?;
    let _priority_and_language = read_u32(reader)?;
    let _initial_frames = read_u32(reader)?;
    let scale = read_u32(reader)?;
    let rate = read_u32(reader)?;
    let _start = read_u32(reader)?;
    let length = read_u32(reader)?;
    let _suggested_buffer_size = read_u32(reader)?;
    let _quality = read_u32(reader)?;
    let _sample_size = read_u32(reader)?;
    let frame = (
        read_i16(reader)?,
        read_i16(reader)?,
        read_i16(reader)?,
        read_i16(reader)?,
    );
    Ok(StreamHeader {
        kind,
        handler,
        scale,
        rate,
        length,
        frame,
    })
}

fn read_bitmap_info<R: Read>(reader: &mut R) -> Result<BitmapInfo, AviReadError> {
    let _header_size = read_u32(reader)?;
    let width = read_u32(reader)? as i32;
    let height = read_u32(reader)? as i32;
    let planes = read_u16(reader)?;
    let bit_count = read_u16(reader)?;
    let compression = read_fourcc(reader)?;
    let size_image = read_u32(reader)?;
    Ok(BitmapInfo {
        width,
        height,
        planes,
        bit_count,
        compression,
        size_image,
    })
}

fn read_index<R: Read>(reader: &mut R, size: u32) -> Result<Vec<ChunkIndexEntry>, AviReadError> {
    if size as u64 % INDEX_ENTRY_LEN != 0 {
        return Err(AviReadError::Malformed(format!(
            "idx1 size {size} is not a multiple of {INDEX_ENTRY_LEN}"
        )));
    }
    let count = (size as u64 / INDEX_ENTRY_LEN) as usize;
    let mut entries = Vec::with_capacity(count);
    let mut record = [0u8; INDEX_ENTRY_LEN as usize];
    for _ in 0..count {
        reader.read_exact(&mut record)?;
        entries.push(ChunkIndexEntry::from_bytes(&record));
    }
    Ok(entries)
}

fn read_fourcc<R: Read>(reader: &mut R) -> io::Result<FourCc> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    Ok(tag)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_i16<R: Read>(reader: &mut R) -> io::Result<i16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::container::domain::container_writer::ContainerWriter;
    use crate::container::infrastructure::avi_mjpeg_writer::AviMjpegWriter;
    use crate::shared::encoded_frame::EncodedFrame;
    use crate::shared::recording_metadata::RecordingMetadata;

    fn write_container(payloads: &[&[u8]]) -> Vec<u8> {
        let mut writer = AviMjpegWriter::new(Cursor::new(Vec::new()));
        writer.begin(&RecordingMetadata::new(4, 4, 10)).unwrap();
        for p in payloads {
            writer
                .write_frame(&EncodedFrame::new(p.to_vec(), 4, 4))
                .unwrap();
        }
        writer.finalize().unwrap();
        writer.into_inner().into_inner()
    }

    #[test]
    fn test_parses_headers() {
        let bytes = write_container(&[b"abcd", b"efgh"]);
        let reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();

        assert_eq!(reader.main_header().total_frames, 2);
        assert_eq!(reader.main_header().micros_per_frame, 100_000);
        assert_eq!(reader.main_header().width, 4);
        assert_eq!(reader.stream_header().kind, *b"vids");
        assert_eq!(reader.stream_header().handler, *b"MJPG");
        assert_eq!(reader.stream_header().rate, 10);
        assert_eq!(reader.stream_header().frame, (0, 0, 4, 4));
        assert_eq!(reader.format().compression, *b"MJPG");
        assert_eq!(reader.format().bit_count, 24);
        assert_eq!(reader.frame_count(), 2);
    }

    #[test]
    fn test_read_frame_returns_payload() {
        let bytes = write_container(&[b"first", b"second!"]);
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.read_frame(0).unwrap(), b"first");
        assert_eq!(reader.read_frame(1).unwrap(), b"second!");
    }

    #[test]
    fn test_read_frame_out_of_range() {
        let bytes = write_container(&[b"only"]);
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        let err = reader.read_frame(3).unwrap_err();
        assert!(matches!(
            err,
            AviReadError::FrameOutOfRange { index: 3, count: 1 }
        ));
    }

    #[test]
    fn test_verify_accepts_writer_output() {
        let bytes = write_container(&[b"abc", b"defgh", b"ij"]);
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        assert!(reader.verify().unwrap().is_empty());
    }

    #[test]
    fn test_verify_reports_bad_riff_size() {
        let mut bytes = write_container(&[b"abcd"]);
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        let problems = reader.verify().unwrap();
        assert!(problems.iter().any(|p| p.contains("RIFF size")));
    }

    #[test]
    fn test_verify_reports_frame_count_mismatch() {
        let mut bytes = write_container(&[b"abcd", b"efgh"]);
        bytes[48..52].copy_from_slice(&5u32.to_le_bytes());
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        let problems = reader.verify().unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("dwTotalFrames"));
    }

    #[test]
    fn test_verify_reports_movi_size_that_stops_before_idx1() {
        let mut bytes = write_container(&[b"abcd", b"efgh"]);
        // 'movi' FourCC plus two 12-byte chunks, leaving idx1 outside
        bytes[216..220].copy_from_slice(&28u32.to_le_bytes());
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.frame_count(), 2);
        let problems = reader.verify().unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("movi size 28"));
    }

    #[test]
    fn test_movi_extent_covers_idx1() {
        let bytes = write_container(&[b"abcd"]);
        let len = bytes.len() as u64;
        let reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.movi_size() as u64, len - 216 - 8);
        assert!(reader.idx1_pos() < reader.movi_list_start() + 8 + reader.movi_size() as u64);
    }

    #[test]
    fn test_rejects_non_riff_input() {
        let err = AviReader::from_reader(Cursor::new(b"not an avi file".to_vec())).err();
        assert!(matches!(err, Some(AviReadError::NotRiff)));
    }

    #[test]
    fn test_rejects_truncated_file() {
        let bytes = write_container(&[b"abcdefgh"]);
        let truncated = bytes[..230].to_vec();
        let err = AviReader::from_reader(Cursor::new(truncated)).err();
        assert!(matches!(err, Some(AviReadError::Malformed(_))));
    }

    #[test]
    fn test_decode_frame_rejects_non_jpeg() {
        let bytes = write_container(&[b"definitely not jpeg"]);
        let mut reader = AviReader::from_reader(Cursor::new(bytes)).unwrap();
        let err = reader.decode_frame(0).unwrap_err();
        assert!(matches!(err, AviReadError::Decode { index: 0, .. }));
    }
}
