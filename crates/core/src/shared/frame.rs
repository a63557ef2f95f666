use std::time::Duration;

use ndarray::{ArrayView3, ArrayViewMut3};

/// A single captured frame: contiguous interleaved bytes in row-major order.
///
/// Gray (1 channel), RGB (3) and RGBA (4) layouts are carried as-is; the
/// encoder decides what it accepts. The buffer length is not checked at
/// construction so capture backends can hand over whatever they produced
/// and the encoder reports the mismatch as an error.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp: Duration,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
        timestamp: Duration,
    ) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp,
        }
    }

    /// Allocates a zeroed frame of the given geometry.
    pub fn blank(width: u32, height: u32, channels: u8, index: usize, timestamp: Duration) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![0; len], width, height, channels, index, timestamp)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Capture time relative to the start of the recording session.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Byte length implied by the declared geometry.
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * (self.channels as usize)
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.expected_len()
    }

    /// Returns `None` when the buffer does not match the declared geometry.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    pub fn as_ndarray_mut(&mut self) -> Option<ArrayViewMut3<'_, u8>> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data).ok()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5, Duration::from_millis(40));
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.timestamp(), Duration::from_millis(40));
        assert_eq!(frame.data(), &data[..]);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_blank_has_expected_length() {
        let frame = Frame::blank(4, 3, 4, 0, Duration::ZERO);
        assert_eq!(frame.data().len(), 48);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mismatched_length_is_not_well_formed() {
        let frame = Frame::new(vec![0u8; 10], 2, 2, 3, 0, Duration::ZERO);
        assert_eq!(frame.expected_len(), 12);
        assert!(!frame.is_well_formed());
        assert!(frame.as_ndarray().is_none());
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0, Duration::ZERO);
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::blank(2, 2, 3, 0, Duration::ZERO);
        {
            let mut arr = frame.as_ndarray_mut().unwrap();
            arr[[0, 1, 2]] = 128; // row=0, col=1, B channel
        }
        assert_eq!(frame.data()[5], 128);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::new(vec![100u8; 12], 2, 2, 3, 0, Duration::ZERO);
        let mut cloned = frame.clone();
        cloned.as_ndarray_mut().unwrap()[[0, 0, 0]] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }
}
