//! Server module for Parley
//!
//! - `config`: configuration structures
//! - `loader`: layered configuration loading
//! - `init`: bot initialization and run loop

pub mod config;
mod init;
mod loader;

pub use init::run;
pub use loader::load_config;
