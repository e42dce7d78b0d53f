pub mod args;
mod backup;
pub mod classify;
pub mod commands;
mod config;
mod error;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod signal;
pub mod similarity;
pub mod statement;
mod utils;


pub use backup::Backup;
pub use config::{Config, OnlineSettings};
pub use error::{Error, ErrorType, Result};
pub use signal::Mode;
