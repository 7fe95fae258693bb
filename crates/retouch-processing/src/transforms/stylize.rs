//! Stylized filters: `beautify` and `flower_sketch`.
//!
//! beautify: bilateral smoothing (diameter 9, spatial sigma 75, color sigma
//! from the `smoothing` parameter), a light 3x3 sharpen, then a lift of the
//! HSV value channel by `brightness`.
//!
//! flower_sketch: three Canny edge maps (30/100, 50/150, 70/200) are traced
//! into contours, simplified, and stroked on a white canvas in a pastel
//! palette. Finer edge maps get thinner strokes; `intensity` scales all of
//! them. A final 3x3 Gaussian softens the strokes.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use imageproc::point::Point;

use super::blur::gaussian_blur;
use super::edges::canny_gray;
use super::{reflect101, to_sample, TransformError};
use crate::buffer::PixelBuffer;

const BILATERAL_DIAMETER: i64 = 9;
const BILATERAL_SIGMA_SPACE: f32 = 75.0;
const SHARPEN_AMOUNT: f32 = 0.25;

/// Rose, lavender, pink-violet, light pink and soft violet.
const PALETTE: [Rgb<u8>; 5] = [
    Rgb([209, 209, 242]),
    Rgb([200, 162, 200]),
    Rgb([255, 182, 193]),
    Rgb([255, 176, 228]),
    Rgb([230, 130, 180]),
];

const SKETCH_LAYERS: [(f32, f32); 3] = [(30.0, 100.0), (50.0, 150.0), (70.0, 200.0)];
const MIN_CONTOUR_AREA: f64 = 10.0;
const MIN_CONTOUR_POINTS: usize = 6;

pub fn beautify(
    input: &PixelBuffer,
    smoothing: f32,
    brightness: u8,
) -> Result<PixelBuffer, TransformError> {
    if !(smoothing.is_finite() && smoothing > 0.0) {
        return Err(TransformError::Invalid(format!(
            "smoothing must be positive, got {}",
            smoothing
        )));
    }
    let smooth = bilateral(input, smoothing)?;
    let sharp = sharpen(&smooth, SHARPEN_AMOUNT)?;
    Ok(lift_value(&sharp, brightness))
}

/// Bilateral filter over a circular window; the color distance is the L1
/// distance across channels.
fn bilateral(input: &PixelBuffer, sigma_color: f32) -> Result<PixelBuffer, TransformError> {
    let (w, h) = (input.width() as usize, input.height() as usize);
    let n = input.channels() as usize;
    let src = input.data();
    let radius = BILATERAL_DIAMETER / 2;

    let space_coeff = -0.5 / (BILATERAL_SIGMA_SPACE * BILATERAL_SIGMA_SPACE);
    let color_coeff = -0.5 / (sigma_color * sigma_color);

    let mut window = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2.sqrt() <= radius as f32 {
                window.push((dx, dy, (r2 * space_coeff).exp()));
            }
        }
    }
    // Lookup of exp(d^2 * color_coeff) for every possible L1 distance.
    let color_weight: Vec<f32> = (0..=255 * n)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let mut data = vec![0u8; src.len()];
    let mut acc = vec![0f32; n];
    for y in 0..h {
        for x in 0..w {
            let center = (y * w + x) * n;
            acc.iter_mut().for_each(|a| *a = 0.0);
            let mut weight_sum = 0.0f32;

            for &(dx, dy, space_w) in &window {
                let sx = reflect101(x as i64 + dx, w);
                let sy = reflect101(y as i64 + dy, h);
                let idx = (sy * w + sx) * n;
                let dist: usize = (0..n)
                    .map(|c| src[idx + c].abs_diff(src[center + c]) as usize)
                    .sum();
                let weight = space_w * color_weight[dist];
                weight_sum += weight;
                for c in 0..n {
                    acc[c] += weight * f32::from(src[idx + c]);
                }
            }

            for c in 0..n {
                data[center + c] = to_sample(acc[c] / weight_sum)?;
            }
        }
    }
    PixelBuffer::new(input.width(), input.height(), input.channels(), data)
        .map_err(|e| TransformError::Invalid(e.to_string()))
}

/// 3x3 unsharp kernel: `(1 + 4a) * center - a * (north + south + east + west)`.
fn sharpen(input: &PixelBuffer, amount: f32) -> Result<PixelBuffer, TransformError> {
    let (w, h) = (input.width() as usize, input.height() as usize);
    let n = input.channels() as usize;
    let src = input.data();
    let at = |x: i64, y: i64, c: usize| -> f32 {
        f32::from(src[(reflect101(y, h) * w + reflect101(x, w)) * n + c])
    };

    let mut data = Vec::with_capacity(src.len());
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            for c in 0..n {
                let cross = at(x - 1, y, c) + at(x + 1, y, c) + at(x, y - 1, c) + at(x, y + 1, c);
                data.push(to_sample((1.0 + 4.0 * amount) * at(x, y, c) - amount * cross)?);
            }
        }
    }
    PixelBuffer::new(input.width(), input.height(), input.channels(), data)
        .map_err(|e| TransformError::Invalid(e.to_string()))
}

/// Raise HSV value by `amount`, saturating at 255, keeping hue and saturation.
fn lift_value(input: &PixelBuffer, amount: u8) -> PixelBuffer {
    if amount == 0 {
        return input.clone();
    }
    if input.is_gray() {
        return PixelBuffer::from_gray(GrayImage::from_fn(input.width(), input.height(), |x, y| {
            image::Luma([input.sample(x, y, 0).saturating_add(amount)])
        }));
    }

    let mut rgb = input.to_rgb();
    for px in rgb.pixels_mut() {
        let v = px.0.iter().copied().max().unwrap_or(0);
        if v == 0 {
            px.0 = [amount; 3];
            continue;
        }
        let lifted = v.saturating_add(amount);
        let scale = f32::from(lifted) / f32::from(v);
        for s in px.0.iter_mut() {
            *s = (f32::from(*s) * scale).round().min(255.0) as u8;
        }
    }
    PixelBuffer::from_rgb(rgb)
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<u32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y)
        })
        .sum();
    twice.abs() / 2.0
}

fn closed_length(points: &[Point<u32>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            (f64::from(a.x) - f64::from(b.x)).hypot(f64::from(a.y) - f64::from(b.y))
        })
        .sum()
}

fn segment_distance(p: Point<u32>, a: Point<u32>, b: Point<u32>) -> f64 {
    let (px, py) = (f64::from(p.x), f64::from(p.y));
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let (bx, by) = (f64::from(b.x), f64::from(b.y));
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (px - ax).hypot(py - ay);
    }
    (dx * (ay - py) - dy * (ax - px)).abs() / len_sq.sqrt()
}

/// Ramer-Douglas-Peucker simplification of an open point run.
fn simplify(points: &[Point<u32>], epsilon: f64) -> Vec<Point<u32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let (mut max_dist, mut max_idx) = (0.0, start);
        for i in start + 1..end {
            let d = segment_distance(points[i], points[start], points[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }
        if max_dist > epsilon {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    points
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(p, _)| *p)
        .collect()
}

/// Simplify a closed outline by splitting it at the point farthest from the
/// first one and simplifying both halves.
fn simplify_closed(points: &[Point<u32>], epsilon: f64) -> Vec<Point<u32>> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let first = points[0];
    let far = (1..points.len())
        .max_by(|&a, &b| {
            let da = segment_distance(points[a], first, first);
            let db = segment_distance(points[b], first, first);
            da.total_cmp(&db)
        })
        .unwrap_or(points.len() / 2);

    let mut outline = simplify(&points[..=far], epsilon);
    let mut back: Vec<Point<u32>> = points[far..].to_vec();
    back.push(first);
    let back = simplify(&back, epsilon);
    // drop the shared endpoints
    outline.extend_from_slice(&back[1..back.len() - 1]);
    outline
}

fn stroke(canvas: &mut RgbImage, a: Point<u32>, b: Point<u32>, thickness: u32, color: Rgb<u8>) {
    let (ax, ay) = (a.x as f32, a.y as f32);
    let (bx, by) = (b.x as f32, b.y as f32);
    if thickness <= 1 {
        draw_line_segment_mut(canvas, (ax, ay), (bx, by), color);
        return;
    }
    let radius = (thickness / 2) as i32;
    let steps = ((bx - ax).hypot(by - ay) * 2.0).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = (ax + (bx - ax) * t).round() as i32;
        let y = (ay + (by - ay) * t).round() as i32;
        draw_filled_circle_mut(canvas, (x, y), radius, color);
    }
}

pub fn flower_sketch(input: &PixelBuffer, intensity: u32) -> Result<PixelBuffer, TransformError> {
    if !(1..=3).contains(&intensity) {
        return Err(TransformError::Invalid(format!(
            "intensity must be 1, 2 or 3, got {}",
            intensity
        )));
    }

    let gray = input.to_luma();
    let mut canvas = RgbImage::from_pixel(gray.width(), gray.height(), Rgb([255, 255, 255]));

    for (layer, &(low, high)) in SKETCH_LAYERS.iter().enumerate() {
        let edges = canny_gray(&gray, low, high);
        let thickness = ((3 - layer as u32) * intensity).max(1);

        for contour in find_contours::<u32>(&edges) {
            if contour.points.len() < MIN_CONTOUR_POINTS {
                continue;
            }
            let area = polygon_area(&contour.points);
            if area <= MIN_CONTOUR_AREA {
                continue;
            }
            let color = PALETTE[(area / 100.0) as usize % PALETTE.len()];
            let epsilon = 0.01 * closed_length(&contour.points);
            let outline = simplify_closed(&contour.points, epsilon);
            for i in 0..outline.len() {
                let next = outline[(i + 1) % outline.len()];
                stroke(&mut canvas, outline[i], next, thickness, color);
            }
        }
    }

    gaussian_blur(&PixelBuffer::from_rgb(canvas), 3)
}
