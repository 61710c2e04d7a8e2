//! I/O helpers: capability adapters, config, prompts and run artifacts.

pub mod config;
pub mod content;
pub mod http;
pub mod image;
pub mod image_cache;
pub mod input;
pub mod prompt;
pub mod publish;
pub mod run_log;
pub mod upload;
