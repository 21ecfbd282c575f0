//! Tools for managing .srt and .ass subtitle files next to their videos.

pub mod ass;
pub mod atomic;
pub mod batch;
pub mod cli;
pub mod encoding;
pub mod episode;
pub mod error;
pub mod files;
mod utils;

pub use error::{Error, Result};
