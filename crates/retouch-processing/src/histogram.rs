use retouch_core::models::HistogramData;

use crate::buffer::PixelBuffer;

pub const BINS: usize = 256;

/// 256-bin counts per channel. One-channel buffers yield a single `gray`
/// series; anything else yields red, green and blue (alpha is ignored).
pub fn compute_histogram(buffer: &PixelBuffer) -> HistogramData {
    let n = buffer.channels() as usize;
    if n == 0 || buffer.is_empty() {
        return HistogramData::Gray {
            gray: vec![0; BINS],
        };
    }

    if buffer.is_gray() {
        let mut gray = vec![0u32; BINS];
        for px in buffer.data().chunks_exact(n) {
            gray[px[0] as usize] += 1;
        }
        return HistogramData::Gray { gray };
    }

    let mut series = [vec![0u32; BINS], vec![0u32; BINS], vec![0u32; BINS]];
    for px in buffer.data().chunks_exact(n) {
        for (c, counts) in series.iter_mut().enumerate() {
            counts[px[c.min(n - 1)] as usize] += 1;
        }
    }
    let [red, green, blue] = series;
    HistogramData::Color { red, green, blue }
}
