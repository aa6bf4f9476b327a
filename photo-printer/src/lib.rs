//! # photo-printer
//!
//! Photo print library - turns an uploaded image into a print job.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - base64 / data URL payload decoding
//! - fit-contain normalization to the paper's pixel grid (4"x6" @ 300 DPI)
//! - single-page PDF composition
//! - per-job spool directories with guaranteed cleanup
//! - OS print command dispatch (SumatraPDF on Windows, `lp` on macOS/Linux)
//!
//! Serving requests and tracking job status stays in application code
//! (print-server).
//!
//! ## Example
//!
//! ```ignore
//! use photo_printer::{CommandPrinter, PaperSize, Platform, Printer, PrinterSettings, SpoolDir};
//!
//! let spool = SpoolDir::new("temp")?;
//! let job = photo_printer::prepare_job(&image_str, &PaperSize::default(), &spool, job_id)?;
//!
//! let printer = CommandPrinter::for_platform(&Platform::current(), &PrinterSettings::default())?;
//! printer.print(&job.pdf_path).await?;
//! job.files.close()?;
//! ```

mod error;
mod job;
mod normalize;
mod payload;
mod pdf;
mod printer;
mod spool;

// Re-exports
pub use error::{PrintError, PrintResult};
pub use job::{PreparedJob, prepare_job};
pub use normalize::{
    MAX_PIXELS_PER_SIDE, NormalizedImage, POINTS_PER_INCH, PaperSize, fit_contain, fit_within,
    normalize_image,
};
pub use payload::{DecodedPayload, decode_image_payload};
pub use pdf::{Placement, compose_pdf};
pub use printer::{
    CommandPrinter, DEFAULT_PRINT_TIMEOUT, DEFAULT_SUMATRA_PATH, Platform, PrintCommand,
    PrintOutcome, Printer, PrinterSettings,
};
pub use spool::{JobFiles, SpoolDir};
