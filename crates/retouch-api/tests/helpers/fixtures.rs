//! Test fixtures: generated images and multipart forms.

use std::io::Cursor;

use axum_test::multipart::{MultipartForm, Part};
use image::{ImageFormat, Rgb, RgbImage};

/// RGB test card: a gradient background with a bright rectangle in the middle.
pub fn test_card(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = x > width / 4 && x < 3 * width / 4 && y > height / 4 && y < 3 * height / 4;
        if inside {
            Rgb([240, 210, 60])
        } else {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                120,
            ])
        }
    })
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .expect("Failed to encode fixture");
    out.into_inner()
}

pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(&test_card(width, height), ImageFormat::Png)
}

/// Multipart form with the file under the `image` field.
pub fn image_form(bytes: Vec<u8>, filename: &str, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "image",
        Part::bytes(bytes).file_name(filename).mime_type(mime),
    )
}

pub fn png_form(bytes: Vec<u8>) -> MultipartForm {
    image_form(bytes, "card.png", "image/png")
}
