/// A compressed frame payload ready to be muxed.
///
/// Transient: the writer consumes it immediately and keeps only its
/// index record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl EncodedFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
