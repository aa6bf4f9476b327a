//! Print job preparation
//!
//! Runs the synchronous half of a job: decode, normalize, compose and persist.
//! CPU bound; async callers should run it on a blocking thread.

use std::path::PathBuf;
use uuid::Uuid;

use crate::error::PrintResult;
use crate::normalize::{PaperSize, normalize_image};
use crate::payload::decode_image_payload;
use crate::pdf::compose_pdf;
use crate::spool::{JobFiles, SpoolDir};

/// A job whose PDF is on disk and ready to be sent to the printer
#[derive(Debug)]
pub struct PreparedJob {
    /// Owns the job directory; dropping it removes every file below
    pub files: JobFiles,
    pub pdf_path: PathBuf,
    pub pdf_bytes: usize,
    /// Pixel size of the uploaded image
    pub source_size: (u32, u32),
}

/// Decode, normalize, compose and persist one image payload
///
/// On error the partially written job directory is removed before returning.
pub fn prepare_job(
    image_str: &str,
    paper: &PaperSize,
    spool: &SpoolDir,
    job_id: Uuid,
) -> PrintResult<PreparedJob> {
    let payload = decode_image_payload(image_str)?;

    let mut files = spool.create_job(job_id)?;
    files.write_source(payload.extension(), &payload.bytes)?;

    let normalized = normalize_image(&payload, paper)?;
    files.write_normalized(&normalized.to_png()?)?;

    let pdf = compose_pdf(&normalized, paper)?;
    let pdf_path = files.write_pdf(&pdf)?;

    let source_size = (normalized.source_width, normalized.source_height);

    tracing::info!(
        job_id = %job_id,
        format = ?payload.format,
        source = %format!("{}x{}", source_size.0, source_size.1),
        pdf_bytes = pdf.len(),
        "Print job prepared"
    );

    Ok(PreparedJob {
        files,
        pdf_path,
        pdf_bytes: pdf.len(),
        source_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn data_url(width: u32, height: u32) -> String {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, _| Rgb([x as u8, 64, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
        )
    }

    #[test]
    fn test_prepare_job_writes_all_files() {
        let root = tempfile::tempdir().unwrap();
        let spool = SpoolDir::new(root.path()).unwrap();
        let job_id = Uuid::new_v4();

        let job = prepare_job(&data_url(80, 60), &PaperSize::default(), &spool, job_id).unwrap();

        assert_eq!(job.source_size, (80, 60));
        assert!(job.pdf_path.exists());
        assert_eq!(
            job.pdf_path.file_name().unwrap().to_str().unwrap(),
            format!("{}.pdf", job_id)
        );
        assert!(job.files.dir().join("source.png").exists());
        assert!(job.files.dir().join("normalized.png").exists());

        let normalized = image::open(job.files.dir().join("normalized.png")).unwrap();
        assert_eq!((normalized.width(), normalized.height()), (1200, 1800));

        let pdf = std::fs::read(&job.pdf_path).unwrap();
        assert_eq!(pdf.len(), job.pdf_bytes);
        assert_eq!(lopdf::Document::load_mem(&pdf).unwrap().get_pages().len(), 1);

        let dir = job.files.dir().to_path_buf();
        job.files.close().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_failed_job_leaves_nothing_behind() {
        let root = tempfile::tempdir().unwrap();
        let spool = SpoolDir::new(root.path()).unwrap();

        let result = prepare_job("not base64!!", &PaperSize::default(), &spool, Uuid::new_v4());
        assert!(matches!(result, Err(crate::PrintError::Decode(_))));

        // valid base64 header, truncated PNG body: fails after the job dir exists
        let truncated = &data_url(20, 20)[..60];
        let result = prepare_job(truncated, &PaperSize::default(), &spool, Uuid::new_v4());
        assert!(result.is_err());

        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
