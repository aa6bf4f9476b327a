//! Resolution normalization
//!
//! Every job is fit-contained into the paper's pixel grid: scaled (up or down)
//! until it touches the canvas on one axis, centred, and padded with white on
//! the other. Nothing is ever cropped.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::{PrintError, PrintResult};
use crate::payload::DecodedPayload;

/// PDF points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Largest bitmap side a paper size may ask for
pub const MAX_PIXELS_PER_SIDE: u32 = 20_000;

/// Photo paper geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSize {
    pub width_in: f32,
    pub height_in: f32,
    pub dpi: u32,
}

impl PaperSize {
    /// 4"x6" (4R) photo paper at 300 DPI
    pub const PHOTO_4R: PaperSize = PaperSize {
        width_in: 4.0,
        height_in: 6.0,
        dpi: 300,
    };

    pub fn new(width_in: f32, height_in: f32, dpi: u32) -> PrintResult<Self> {
        let valid = width_in.is_finite()
            && height_in.is_finite()
            && width_in > 0.0
            && height_in > 0.0
            && dpi > 0
            && width_in * dpi as f32 <= MAX_PIXELS_PER_SIDE as f32
            && height_in * dpi as f32 <= MAX_PIXELS_PER_SIDE as f32;
        if !valid {
            return Err(PrintError::Resize(format!(
                "invalid paper size {}x{}in @ {}dpi",
                width_in, height_in, dpi
            )));
        }
        Ok(Self {
            width_in,
            height_in,
            dpi,
        })
    }

    /// Target bitmap size in pixels (1200x1800 for 4R @ 300 DPI)
    ///
    /// Each side is clamped to `1..=MAX_PIXELS_PER_SIDE`.
    pub fn pixel_size(&self) -> (u32, u32) {
        let side = |inches: f32| {
            (inches * self.dpi as f32)
                .round()
                .clamp(1.0, MAX_PIXELS_PER_SIDE as f32) as u32
        };
        (side(self.width_in), side(self.height_in))
    }

    /// PDF page size in points (288x432 for 4R)
    pub fn page_size_pt(&self) -> (f32, f32) {
        (
            self.width_in * POINTS_PER_INCH,
            self.height_in * POINTS_PER_INCH,
        )
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::PHOTO_4R
    }
}

/// Bitmap at exactly the paper's pixel size
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub pixels: RgbImage,
    /// Size of the decoded upload
    pub source_width: u32,
    pub source_height: u32,
    /// Size of the scaled source inside the canvas
    pub content_width: u32,
    pub content_height: u32,
    /// Top-left corner of the scaled source inside the canvas
    pub offset_x: u32,
    pub offset_y: u32,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Encode as PNG (for the job's on-disk copy)
    pub fn to_png(&self) -> PrintResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| PrintError::Resize(format!("png encode failed: {}", e)))?;
        Ok(buf.into_inner())
    }
}

/// Largest size with the source aspect ratio that fits inside `max_w` x `max_h`
///
/// Both sides are at least 1 px.
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }
    let ratio = f64::min(
        max_w as f64 / src_w as f64,
        max_h as f64 / src_h as f64,
    );
    let w = (src_w as f64 * ratio).round().clamp(1.0, max_w.max(1) as f64) as u32;
    let h = (src_h as f64 * ratio).round().clamp(1.0, max_h.max(1) as f64) as u32;
    (w, h)
}

/// Decode the payload and fit-contain it into the paper's pixel grid
pub fn normalize_image(payload: &DecodedPayload, paper: &PaperSize) -> PrintResult<NormalizedImage> {
    let img = image::load_from_memory_with_format(&payload.bytes, payload.format)
        .map_err(|e| PrintError::Resize(format!("cannot decode pixels: {}", e)))?;
    fit_contain(&img, paper)
}

/// Fit-contain an already decoded image into the paper's pixel grid
pub fn fit_contain(img: &DynamicImage, paper: &PaperSize) -> PrintResult<NormalizedImage> {
    let (src_w, src_h) = (img.width(), img.height());
    if src_w == 0 || src_h == 0 {
        return Err(PrintError::Resize("image has zero size".to_string()));
    }

    let (canvas_w, canvas_h) = paper.pixel_size();
    let (content_w, content_h) = fit_within(src_w, src_h, canvas_w, canvas_h);
    let offset_x = (canvas_w - content_w) / 2;
    let offset_y = (canvas_h - content_h) / 2;

    let scaled = if (content_w, content_h) == (src_w, src_h) {
        img.to_rgba8()
    } else {
        img.resize_exact(content_w, content_h, FilterType::Lanczos3)
            .to_rgba8()
    };

    // Alpha is flattened onto the white padding
    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &scaled, offset_x as i64, offset_y as i64);

    tracing::debug!(
        src = %format!("{}x{}", src_w, src_h),
        content = %format!("{}x{}", content_w, content_h),
        canvas = %format!("{}x{}", canvas_w, canvas_h),
        "Normalized image"
    );

    Ok(NormalizedImage {
        pixels: DynamicImage::ImageRgba8(canvas).to_rgb8(),
        source_width: src_w,
        source_height: src_h,
        content_width: content_w,
        content_height: content_h,
        offset_x,
        offset_y,
    })
}
