//! Region-of-interest highlighting.
//!
//! The luma image is smoothed (5x5 Gaussian) and run through Canny 50/150.
//! Outermost contours are boxed, and the largest boxes are outlined with a
//! 2px light pink rectangle on a color copy of the input.

use image::Rgb;
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::blur::gaussian_blur;
use super::edges::canny_gray;
use super::TransformError;
use crate::buffer::PixelBuffer;

const HIGHLIGHT: Rgb<u8> = Rgb([255, 182, 193]);
const SMOOTHING_KERNEL: u32 = 5;
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Axis-aligned box of a region, inclusive of both edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// The `max_regions` largest outer regions, biggest first.
pub fn find_regions(input: &PixelBuffer, max_regions: usize) -> Result<Vec<Region>, TransformError> {
    let gray = PixelBuffer::from_gray(input.to_luma());
    let smoothed = gaussian_blur(&gray, SMOOTHING_KERNEL)?.to_luma();
    let edges = canny_gray(&smoothed, CANNY_LOW, CANNY_HIGH);

    let mut regions: Vec<Region> = find_contours::<u32>(&edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let min_x = c.points.iter().map(|p| p.x).min()?;
            let max_x = c.points.iter().map(|p| p.x).max()?;
            let min_y = c.points.iter().map(|p| p.y).min()?;
            let max_y = c.points.iter().map(|p| p.y).max()?;
            Some(Region {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            })
        })
        .collect();

    // stable sort keeps scan order among equal areas
    regions.sort_by(|a, b| b.area().cmp(&a.area()));
    regions.truncate(max_regions);
    Ok(regions)
}

pub fn roi(input: &PixelBuffer, max_regions: usize) -> Result<PixelBuffer, TransformError> {
    if max_regions == 0 {
        return Err(TransformError::Invalid(
            "max_regions must be at least 1".to_string(),
        ));
    }
    let regions = find_regions(input, max_regions)?;
    tracing::trace!(count = regions.len(), "Highlighting regions");

    let mut canvas = input.to_rgb();
    for region in &regions {
        let outer = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
        draw_hollow_rect_mut(&mut canvas, outer, HIGHLIGHT);
        if region.width > 2 && region.height > 2 {
            let inner = Rect::at(region.x as i32 + 1, region.y as i32 + 1)
                .of_size(region.width - 2, region.height - 2);
            draw_hollow_rect_mut(&mut canvas, inner, HIGHLIGHT);
        }
    }
    Ok(PixelBuffer::from_rgb(canvas))
}
