//! Core: configuration, state, errors, server lifecycle

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, LogConfig};
pub use error::{PRINT_FAILED, Result, ServerError};
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
