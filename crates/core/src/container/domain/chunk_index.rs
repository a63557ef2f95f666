use crate::container::domain::avi_layout::{FourCc, AVIIF_KEYFRAME, INDEX_ENTRY_LEN};

/// One `idx1` record.
///
/// `offset` is relative to the first byte after the `movi` FourCC and
/// points at the chunk header; `size` is the unpadded payload length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkIndexEntry {
    pub tag: FourCc,
    pub flags: u32,
    pub offset: u32,
    pub size: u32,
}

impl ChunkIndexEntry {
    pub fn is_keyframe(&self) -> bool {
        self.flags & AVIIF_KEYFRAME != 0
    }

    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_LEN as usize] {
        let mut out = [0u8; INDEX_ENTRY_LEN as usize];
        out[0..4].copy_from_slice(&self.tag);
        out[4..8].copy_from_slice(&self.flags.to_le_bytes());
        out[8..12].copy_from_slice(&self.offset.to_le_bytes());
        out[12..16].copy_from_slice(&self.size.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; INDEX_ENTRY_LEN as usize]) -> Self {
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Self {
            tag: [bytes[0], bytes[1], bytes[2], bytes[3]],
            flags: word(4),
            offset: word(8),
            size: word(12),
        }
    }
}

/// Accumulates index records in playback order while frames stream out.
#[derive(Clone, Debug, Default)]
pub struct ChunkIndexBuilder {
    entries: Vec<ChunkIndexEntry>,
}

impl ChunkIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tag: FourCc, flags: u32, offset: u32, size: u32) {
        debug_assert!(
            self.entries.last().map_or(true, |last| offset > last.offset),
            "chunk offsets must increase"
        );
        self.entries.push(ChunkIndexEntry {
            tag,
            flags,
            offset,
            size,
        });
    }

    pub fn entries(&self) -> &[ChunkIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the serialized `idx1` payload.
    pub fn byte_len(&self) -> u64 {
        self.entries.len() as u64 * INDEX_ENTRY_LEN
    }

    /// Entries back-to-back, as stored after the `idx1` chunk header.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len() as usize);
        for entry in &self.entries {
            out.extend_from_slice(&entry.to_bytes());
        }
        out
    }
}
