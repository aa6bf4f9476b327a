use photo_printer::{DEFAULT_SUMATRA_PATH, PaperSize, PrinterSettings};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (`.env` is loaded at startup):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | . | working directory |
/// | HTTP_HOST | 0.0.0.0 | bind address |
/// | HTTP_PORT | 3000 | HTTP port |
/// | TEMP_DIR | {WORK_DIR}/temp | job spool directory |
/// | SUMATRA_PATH | {WORK_DIR}/public/SumatraPDF-3.5.2-64.exe | Windows print utility |
/// | PRINTER_NAME | - | named printer instead of the system default |
/// | PRINT_COMMAND | - | command replacing the platform default |
/// | PRINT_TIMEOUT_MS | 120000 | print command timeout |
/// | MAX_CONCURRENT_PRINTS | 4 | print commands running at once |
/// | MAX_BODY_BYTES | 33554432 | request body limit |
/// | JOB_RETENTION_SECS | 3600 | how long finished jobs stay queryable |
/// | SPOOL_MAX_AGE_SECS | 3600 | age after which leftover job dirs are swept |
/// | PAPER_WIDTH_IN / PAPER_HEIGHT_IN / PAPER_DPI | 4 / 6 / 300 | paper geometry |
/// | LOG_LEVEL | info | log filter (RUST_LOG wins) |
/// | LOG_JSON | false | JSON log lines |
/// | LOG_DIR | - | daily rolling log files |
/// | LOG_RETENTION_DAYS | 14 | rolling log retention |
/// | ENVIRONMENT | development | environment name |
///
/// # Example
///
/// ```ignore
/// HTTP_PORT=8080 PRINTER_NAME=Canon_SELPHY cargo run -p print-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory; relative paths below are resolved against it
    pub work_dir: PathBuf,
    pub http_host: String,
    pub http_port: u16,
    /// Spool root for per-job directories
    pub temp_dir: PathBuf,
    /// Paper the jobs are normalized for
    pub paper: PaperSize,
    /// Print command settings
    pub printer: PrinterSettings,
    pub max_concurrent_prints: usize,
    pub max_body_bytes: usize,
    pub job_retention: Duration,
    pub spool_max_age: Duration,
    pub log: LogConfig,
    /// development | staging | production
    pub environment: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
    pub dir: Option<PathBuf>,
    pub retention_days: u64,
}

impl LogConfig {
    /// Read logging settings from the environment
    ///
    /// Separate from [`Config::from_env`] because the logger starts first.
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            json: env_parse("LOG_JSON", false),
            dir: std::env::var("LOG_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            retention_days: env_parse("LOG_RETENTION_DAYS", 14),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let work_dir = PathBuf::from(std::env::var("WORK_DIR").unwrap_or_else(|_| ".".into()));

        let temp_dir = std::env::var("TEMP_DIR")
            .map(|p| resolve(&work_dir, p))
            .unwrap_or_else(|_| work_dir.join("temp"));

        let sumatra_path = std::env::var("SUMATRA_PATH")
            .map(|p| resolve(&work_dir, p))
            .unwrap_or_else(|_| work_dir.join(DEFAULT_SUMATRA_PATH));

        let default_paper = PaperSize::default();
        let paper = PaperSize::new(
            env_parse("PAPER_WIDTH_IN", default_paper.width_in),
            env_parse("PAPER_HEIGHT_IN", default_paper.height_in),
            env_parse("PAPER_DPI", default_paper.dpi),
        )
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid paper configuration, using 4x6in @ 300dpi");
            default_paper
        });

        Self {
            http_host: std::env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            temp_dir,
            paper,
            printer: PrinterSettings {
                sumatra_path,
                printer_name: std::env::var("PRINTER_NAME").ok().filter(|s| !s.is_empty()),
                command_override: std::env::var("PRINT_COMMAND")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                timeout: Duration::from_millis(env_parse("PRINT_TIMEOUT_MS", 120_000)),
            },
            max_concurrent_prints: env_parse::<usize>("MAX_CONCURRENT_PRINTS", 4).max(1),
            max_body_bytes: env_parse("MAX_BODY_BYTES", 32 * 1024 * 1024),
            job_retention: Duration::from_secs(env_parse("JOB_RETENTION_SECS", 3600)),
            spool_max_age: Duration::from_secs(env_parse("SPOOL_MAX_AGE_SECS", 3600)),
            log: LogConfig::from_env(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            work_dir,
        }
    }

    /// Override the work dir (and the paths derived from it) and port
    ///
    /// Mostly used by tests.
    pub fn with_overrides(work_dir: impl Into<PathBuf>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        let work_dir = work_dir.into();
        config.temp_dir = work_dir.join("temp");
        config.printer.sumatra_path = work_dir.join(DEFAULT_SUMATRA_PATH);
        config.work_dir = work_dir;
        config.http_port = http_port;
        config
    }

    /// Socket address string to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn resolve(work_dir: &Path, path: String) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        work_dir.join(path)
    }
}
