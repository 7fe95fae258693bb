//! In-memory raster owned by a session.
//!
//! A [`PixelBuffer`] is a row-major, channel-interleaved array of 8-bit samples.
//! Color buffers are stored as RGB. Once a buffer is published to a session it
//! is never mutated; transforms always produce a new one.

use std::fmt;

use image::{DynamicImage, GrayImage, Luma, RgbImage};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("Sample count mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Unsupported channel count: {0}")]
    InvalidChannels(u8),
}

#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

/// ITU-R BT.601 luma, rounded to the nearest integer.
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    y.round().clamp(0.0, 255.0) as u8
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, BufferError> {
        if !matches!(channels, 1 | 3) {
            return Err(BufferError::InvalidChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_gray(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 1,
            data: image.into_raw(),
        }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: image.into_raw(),
        }
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

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_gray(&self) -> bool {
        self.channels == 1
    }

    /// Single-channel intensity view. Color buffers are reduced with BT.601 luma.
    pub fn to_luma(&self) -> GrayImage {
        let data = match self.channels {
            1 => self.data.clone(),
            _ => self
                .data
                .chunks_exact(self.channels as usize)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
        };
        GrayImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Three-channel view. Grayscale buffers are replicated across R, G and B.
    pub fn to_rgb(&self) -> RgbImage {
        let data = match self.channels {
            1 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            3 => self.data.clone(),
            n => self
                .data
                .chunks_exact(n as usize)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match self.channels {
            1 => DynamicImage::ImageLuma8(self.to_luma()),
            _ => DynamicImage::ImageRgb8(self.to_rgb()),
        }
    }

    /// Split interleaved samples into one plane per channel.
    pub fn planes(&self) -> Vec<GrayImage> {
        let n = self.channels as usize;
        (0..n)
            .map(|c| {
                let plane: Vec<u8> = self.data.iter().skip(c).step_by(n).copied().collect();
                GrayImage::from_raw(self.width, self.height, plane)
                    .unwrap_or_else(|| GrayImage::new(self.width, self.height))
            })
            .collect()
    }

    /// Interleave equally sized planes back into a buffer.
    pub fn from_planes(planes: &[GrayImage]) -> Result<Self, BufferError> {
        let channels =
            u8::try_from(planes.len()).map_err(|_| BufferError::InvalidChannels(u8::MAX))?;
        let Some(first) = planes.first() else {
            return Err(BufferError::InvalidChannels(0));
        };
        let (width, height) = first.dimensions();
        let count = width as usize * height as usize;
        for plane in planes {
            if plane.dimensions() != (width, height) {
                return Err(BufferError::LengthMismatch {
                    expected: count,
                    actual: plane.len(),
                });
            }
        }
        let mut data = Vec::with_capacity(count * planes.len());
        for i in 0..count {
            for plane in planes {
                data.push(plane.as_raw()[i]);
            }
        }
        Self::new(width, height, channels, data)
    }

    #[inline]
    pub fn sample(&self, x: u32, y: u32, channel: u8) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels as usize
            + channel as usize;
        self.data[idx]
    }

    pub fn gray_pixel(&self, x: u32, y: u32) -> Luma<u8> {
        match self.channels {
            1 => Luma([self.sample(x, y, 0)]),
            _ => Luma([luma(
                self.sample(x, y, 0),
                self.sample(x, y, 1),
                self.sample(x, y, 2),
            )]),
        }
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = PixelBuffer::new(2, 2, 3, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                expected: 12,
                actual: 11
            }
        );
    }

    #[test]
    fn test_new_accepts_only_gray_or_rgb() {
        for channels in [0u8, 2, 4] {
            assert_eq!(
                PixelBuffer::new(1, 1, channels, vec![0; channels as usize]).unwrap_err(),
                BufferError::InvalidChannels(channels)
            );
        }
        assert!(PixelBuffer::new(1, 1, 1, vec![0]).is_ok());
        assert!(PixelBuffer::new(1, 1, 3, vec![0; 3]).is_ok());
    }

    #[test]
    fn test_from_planes_rejects_two_planes() {
        let planes = vec![GrayImage::new(2, 2), GrayImage::new(2, 2)];
        assert_eq!(
            PixelBuffer::from_planes(&planes).unwrap_err(),
            BufferError::InvalidChannels(2)
        );
    }

    #[test]
    fn test_planes_roundtrip() {
        let buf = PixelBuffer::new(2, 1, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let planes = buf.planes();
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[1].as_raw(), &vec![2, 5]);
        assert_eq!(PixelBuffer::from_planes(&planes).unwrap(), buf);
    }

    #[test]
    fn test_to_luma_weights() {
        let buf = PixelBuffer::new(3, 1, 3, vec![255, 0, 0, 0, 255, 0, 0, 0, 255]).unwrap();
        let gray = buf.to_luma();
        assert_eq!(gray.as_raw(), &vec![76, 150, 29]);
    }

    #[test]
    fn test_gray_to_rgb_replicates() {
        let buf = PixelBuffer::new(1, 1, 1, vec![42]).unwrap();
        assert_eq!(buf.to_rgb().as_raw(), &vec![42, 42, 42]);
    }
}
