//! Single-page PDF composition
//!
//! The normalized bitmap becomes one DeviceRGB image XObject drawn across a
//! page sized to the paper in points.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::{PrintError, PrintResult};
use crate::normalize::{NormalizedImage, PaperSize};

/// Resource name of the embedded photo
const IMAGE_NAME: &str = "Im0";

/// Where the image lands on the page, in points from the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Scale the image to the page width, keep its aspect ratio, centre it
    pub fn centered(page_w: f32, page_h: f32, image_w: u32, image_h: u32) -> PrintResult<Self> {
        if image_w == 0 || image_h == 0 {
            return Err(PrintError::PdfBuild("image has zero size".to_string()));
        }
        let width = page_w;
        let height = width / image_w as f32 * image_h as f32;
        Ok(Self {
            x: (page_w - width) / 2.0,
            y: (page_h - height) / 2.0,
            width,
            height,
        })
    }

    /// Whether the placement stays inside the page (with rounding slack)
    pub fn fits(&self, page_w: f32, page_h: f32) -> bool {
        const EPSILON: f32 = 0.01;
        self.x >= -EPSILON
            && self.y >= -EPSILON
            && self.x + self.width <= page_w + EPSILON
            && self.y + self.height <= page_h + EPSILON
    }
}

/// Build the print PDF for a normalized image
pub fn compose_pdf(image: &NormalizedImage, paper: &PaperSize) -> PrintResult<Vec<u8>> {
    let (page_w, page_h) = paper.page_size_pt();
    let placement = Placement::centered(page_w, page_h, image.width(), image.height())?;
    if !placement.fits(page_w, page_h) {
        return Err(PrintError::PdfBuild(format!(
            "image {}x{} does not fit page {}x{}pt",
            image.width(),
            image.height(),
            page_w,
            page_h
        )));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        image.pixels.as_raw().clone(),
    ));

    // Image space is a unit square; `cm` maps it onto the placement rectangle
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PrintError::PdfBuild(format!("failed to serialize PDF: {}", e)))?;

    tracing::debug!(
        bytes = bytes.len(),
        page = %format!("{}x{}pt", page_w, page_h),
        "Composed PDF"
    );

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::fit_contain;
    use image::{DynamicImage, Rgb, RgbImage};

    fn number(obj: &Object) -> f32 {
        match obj {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => panic!("not a number: {:?}", other),
        }
    }

    fn normalized(width: u32, height: u32, paper: &PaperSize) -> NormalizedImage {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
        fit_contain(&img, paper).unwrap()
    }

    #[test]
    fn test_single_page_with_paper_media_box() {
        let paper = PaperSize::default();
        let bytes = compose_pdf(&normalized(800, 600, &paper), &paper).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = *pages.get(&1).unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box: Vec<f32> = page
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(number)
            .collect();
        // The page is the paper in points (4"x6" at 72pt/in), not the
        // 1200x1800 bitmap, which is scaled onto it
        assert_eq!(media_box, vec![0.0, 0.0, 288.0, 432.0]);
        assert_eq!(paper.page_size_pt(), (288.0, 432.0));
    }

    #[test]
    fn test_image_drawn_centered() {
        let paper = PaperSize::default();
        let bytes = compose_pdf(&normalized(640, 480, &paper), &paper).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_and_decode_page_content(page_id).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap();
        let m: Vec<f32> = cm.operands.iter().map(number).collect();

        let (w, h, x, y) = (m[0], m[3], m[4], m[5]);
        assert!((x - (288.0 - w) / 2.0).abs() < 0.01);
        assert!((y - (432.0 - h) / 2.0).abs() < 0.01);
        assert!(content.operations.iter().any(|op| op.operator == "Do"));
    }

    #[test]
    fn test_placement_centered_for_various_ratios() {
        for (iw, ih) in [(1200u32, 1800u32), (1200, 900), (100, 100), (50, 300), (300, 50)] {
            let p = Placement::centered(288.0, 432.0, iw, ih).unwrap();
            assert_eq!(p.width, 288.0);
            assert!((p.height - 288.0 / iw as f32 * ih as f32).abs() < 0.001);
            assert!((p.x - (288.0 - p.width) / 2.0).abs() < 0.001);
            assert!((p.y - (432.0 - p.height) / 2.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_placement_overflow_detected() {
        // taller than the page once scaled to page width
        let p = Placement::centered(288.0, 432.0, 100, 1000).unwrap();
        assert!(!p.fits(288.0, 432.0));
        // the normalized canvas always matches the page aspect
        let p = Placement::centered(288.0, 432.0, 1200, 1800).unwrap();
        assert!(p.fits(288.0, 432.0));
        assert!(Placement::centered(288.0, 432.0, 0, 10).is_err());
    }
}
