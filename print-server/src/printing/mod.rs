//! Photo print jobs
//!
//! - `types`: job records and request/response bodies
//! - `registry`: in-memory job status store
//! - `service`: accept, prepare and dispatch

pub mod registry;
pub mod service;
pub mod types;

pub use registry::JobRegistry;
pub use service::PrintJobService;
pub use types::*;
