//! Photo print server
//!
//! Accepts base64 photos over HTTP and prints them on 4"x6" photo paper.
//!
//! # Module layout
//!
//! ```text
//! print-server/src/
//! ├── core/          # config, state, errors, background tasks, server
//! ├── api/           # HTTP routes and handlers
//! ├── printing/      # job records, registry, dispatch
//! └── utils/         # logging
//! ```
//!
//! Image decoding, PDF composition and the OS print command live in the
//! `photo-printer` crate.

pub mod api;
pub mod core;
pub mod printing;
pub mod utils;

pub use core::{Config, Server, ServerError, ServerState};
pub use printing::{JobRegistry, JobStatus, PrintJob, PrintJobService};
pub use utils::logger::{cleanup_old_logs, init_logger_with_file};

/// Load `.env` and start logging
pub fn setup_environment() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenv::dotenv();

    let log = core::LogConfig::from_env();
    init_logger_with_file(&log.level, log.json, log.dir.as_deref())?;

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  __          __
   / __ \/ /_  ____  / /_____
  / /_/ / __ \/ __ \/ __/ __ \
 / ____/ / / / /_/ / /_/ /_/ /
/_/   /_/ /_/\____/\__/\____/
    ____       _       __
   / __ \_____(_)___  / /_
  / /_/ / ___/ / __ \/ __/
 / ____/ /  / / / / / /_
/_/   /_/  /_/_/ /_/\__/   v{}
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
