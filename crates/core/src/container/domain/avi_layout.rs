//! FourCC tags, flags and fixed chunk sizes of a single-stream MJPEG AVI.

pub type FourCc = [u8; 4];

pub const RIFF: FourCc = *b"RIFF";
pub const AVI: FourCc = *b"AVI ";
pub const LIST: FourCc = *b"LIST";
pub const HDRL: FourCc = *b"hdrl";
pub const AVIH: FourCc = *b"avih";
pub const STRL: FourCc = *b"strl";
pub const STRH: FourCc = *b"strh";
pub const STRF: FourCc = *b"strf";
pub const MOVI: FourCc = *b"movi";
pub const IDX1: FourCc = *b"idx1";
pub const VIDS: FourCc = *b"vids";
pub const MJPG: FourCc = *b"MJPG";

/// Stream 0, compressed video.
pub const VIDEO_CHUNK: FourCc = *b"00dc";

/// `avih.dwFlags`: the file carries an `idx1` index.
pub const AVIF_HASINDEX: u32 = 0x10;
/// `idx1` entry flag: the chunk is a keyframe. Every MJPEG frame is one.
pub const AVIIF_KEYFRAME: u32 = 0x10;

pub const CHUNK_HEADER_LEN: u64 = 8;
pub const INDEX_ENTRY_LEN: u64 = 16;

pub const AVIH_SIZE: u32 = 56;
pub const STRH_SIZE: u32 = 56;
/// `BITMAPINFOHEADER`
pub const STRF_SIZE: u32 = 40;

pub const STRL_LIST_SIZE: u32 = 4 + (8 + STRH_SIZE) + (8 + STRF_SIZE);
pub const HDRL_LIST_SIZE: u32 = 4 + (8 + AVIH_SIZE) + (8 + STRL_LIST_SIZE);

pub const BITS_PER_PIXEL: u16 = 24;

/// Largest dimension representable in `strh.rcFrame`, which stores
/// 16-bit signed coordinates.
pub const MAX_DIMENSION: u32 = i16::MAX as u32;

/// Bytes a chunk payload occupies on disk once padded to an even length.
pub fn padded_len(payload_len: u64) -> u64 {
    payload_len + (payload_len & 1)
}

pub fn fourcc_str(tag: &FourCc) -> String {
    tag.iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_header_list_sizes() {
        assert_eq!(STRL_LIST_SIZE, 116);
        assert_eq!(HDRL_LIST_SIZE, 192);
    }

    #[rstest]
    #[case::empty(0, 0)]
    #[case::odd(3, 4)]
    #[case::even(4, 4)]
    #[case::large_odd(1001, 1002)]
    fn test_padded_len(#[case] len: u64, #[case] expected: u64) {
        assert_eq!(padded_len(len), expected);
    }

    #[test]
    fn test_fourcc_str() {
        assert_eq!(fourcc_str(&AVI), "AVI ");
        assert_eq!(fourcc_str(&VIDEO_CHUNK), "00dc");
        assert_eq!(fourcc_str(&[0, b'a', 0xFF, b'b']), "?a?b");
    }
}
