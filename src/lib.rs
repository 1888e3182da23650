pub mod access;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod store;
pub mod sweeper;
pub mod utils;

pub use config::Config;
pub use error::{Result, WardenError};
