//! Printer adapters for sending PDFs to the OS print subsystem
//!
//! Supports:
//! - Windows: bundled SumatraPDF (`-print-to-default -silent`)
//! - macOS / Linux: CUPS `lp -s`
//! - Any command configured by the operator

use crate::error::{PrintError, PrintResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, instrument, warn};

/// Default location of the bundled Windows print utility, relative to the work dir
pub const DEFAULT_SUMATRA_PATH: &str = "public/SumatraPDF-3.5.2-64.exe";

/// Default print command timeout
pub const DEFAULT_PRINT_TIMEOUT: Duration = Duration::from_secs(120);

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send a PDF file to the printer
    async fn print(&self, pdf: &Path) -> PrintResult<PrintOutcome>;

    /// Check if the printer backend can be reached
    fn is_available(&self) -> bool;
}

/// Host platform, as far as printing is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    /// macOS and Linux (CUPS `lp`)
    Unix,
    Unsupported(String),
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name (`std::env::consts::OS` values) to a platform
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" | "linux" => Platform::Unix,
            other => Platform::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Unix => write!(f, "unix"),
            Platform::Unsupported(os) => write!(f, "unsupported({})", os),
        }
    }
}

/// Operator-controlled print settings
#[derive(Debug, Clone)]
pub struct PrinterSettings {
    /// SumatraPDF executable used on Windows
    pub sumatra_path: PathBuf,
    /// Named printer; the system default when unset
    pub printer_name: Option<String>,
    /// Full command replacing the platform default (PDF path appended)
    pub command_override: Option<String>,
    /// Kill the print command after this long
    pub timeout: Duration,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            sumatra_path: PathBuf::from(DEFAULT_SUMATRA_PATH),
            printer_name: None,
            command_override: None,
            timeout: DEFAULT_PRINT_TIMEOUT,
        }
    }
}

/// Program and arguments; the PDF path is appended when run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PrintCommand {
    /// Resolve the print command for a platform
    ///
    /// An unsupported platform is always an error, override or not. On
    /// Windows and Unix a configured override replaces the default command.
    pub fn for_platform(platform: &Platform, settings: &PrinterSettings) -> PrintResult<Self> {
        let override_line = match platform {
            Platform::Unsupported(os) => {
                return Err(PrintError::UnsupportedPlatform(os.clone()));
            }
            Platform::Windows | Platform::Unix => settings.command_override.as_deref(),
        };
        if let Some(line) = override_line {
            return Self::parse(line);
        }

        match platform {
            Platform::Windows => {
                let mut args = match &settings.printer_name {
                    Some(name) => vec!["-print-to".to_string(), name.clone()],
                    None => vec!["-print-to-default".to_string()],
                };
                args.push("-silent".to_string());
                Ok(Self {
                    program: settings.sumatra_path.clone(),
                    args,
                })
            }
            Platform::Unix => {
                let mut args = vec!["-s".to_string()];
                if let Some(name) = &settings.printer_name {
                    args.push("-d".to_string());
                    args.push(name.clone());
                }
                Ok(Self {
                    program: PathBuf::from("lp"),
                    args,
                })
            }
            Platform::Unsupported(os) => Err(PrintError::UnsupportedPlatform(os.clone())),
        }
    }

    /// Parse a whitespace separated command line (no quoting)
    pub fn parse(line: &str) -> PrintResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PrintError::command("print command override is empty"))?;
        Ok(Self {
            program: PathBuf::from(program),
            args: parts.collect(),
        })
    }

    /// Build the process invocation for a PDF
    pub fn to_command(&self, pdf: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(pdf);
        cmd
    }

    /// Program file name, for logs and job records
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Resolve the program to an existing file (absolute/relative path or `PATH` lookup)
    pub fn locate_program(&self) -> Option<PathBuf> {
        let program = &self.program;
        if program.components().count() > 1 || program.is_absolute() {
            return program.is_file().then(|| program.clone());
        }

        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).find_map(|dir| {
            let candidate = dir.join(program);
            if candidate.is_file() {
                return Some(candidate);
            }
            let exe = candidate.with_extension("exe");
            exe.is_file().then_some(exe)
        })
    }
}

impl fmt::Display for PrintCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of a print command that exited successfully
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOutcome {
    pub exit_code: Option<i32>,
    /// First line of stdout (e.g. `lp` prints the request id)
    pub output: Option<String>,
    pub elapsed_ms: u64,
}

/// Printer that shells out to a print command
#[derive(Debug, Clone)]
pub struct CommandPrinter {
    command: PrintCommand,
    timeout: Duration,
}

impl CommandPrinter {
    pub fn new(command: PrintCommand) -> Self {
        Self {
            command,
            timeout: DEFAULT_PRINT_TIMEOUT,
        }
    }

    /// Resolve the command for a platform and apply the configured timeout
    pub fn for_platform(platform: &Platform, settings: &PrinterSettings) -> PrintResult<Self> {
        Ok(Self::new(PrintCommand::for_platform(platform, settings)?).with_timeout(settings.timeout))
    }

    /// Set command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &PrintCommand {
        &self.command
    }
}

impl Printer for CommandPrinter {
    #[instrument(skip_all, fields(command = %self.command, pdf = %pdf.display()))]
    async fn print(&self, pdf: &Path) -> PrintResult<PrintOutcome> {
        let started = Instant::now();

        let mut cmd = self.command.to_command(pdf);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            PrintError::command(format!("failed to spawn {}: {}", self.command.program_name(), e))
        })?;

        info!("Print command spawned");

        // On timeout the child is dropped, and kill_on_drop terminates it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                PrintError::command(format!("timed out after {}s", self.timeout.as_secs_f32()))
            })?
            .map_err(|e| PrintError::command(format!("failed to wait for print command: {}", e)))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let exit_code = output.status.code();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(exit_code = ?exit_code, stderr = %stderr, "Print command failed");
            return Err(PrintError::PrintCommand {
                message: match exit_code {
                    Some(code) if stderr.is_empty() => format!("exited with code {}", code),
                    Some(code) => format!("exited with code {}: {}", code, stderr),
                    None => "terminated by signal".to_string(),
                },
                exit_code,
            });
        }

        let output_line = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);

        info!(elapsed_ms, "Print command finished");

        Ok(PrintOutcome {
            exit_code,
            output: output_line,
            elapsed_ms,
        })
    }

    fn is_available(&self) -> bool {
        self.command.locate_program().is_some()
    }
}
