use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::files::MAX_FILE_BYTES_ENV;

const NON_UTF8_HINT: &str =
    "Please run `subs encoding reset` to convert subtitle files to UTF-8 first.";

/// An error that occurs while inspecting or rewriting subtitle files.
///
/// Structural oddities inside a file (a missing `Fontname` column, a short
/// `Style:` line, an unterminated override tag) are never errors.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more files are not UTF-8.
    ///
    /// Each entry is formatted as `name (ENCODING)`.
    #[error("{}. {}", .files.join(", "), NON_UTF8_HINT)]
    Encoding { files: Vec<String> },
    /// The file exceeds the configured size limit.
    #[error(
        "file {} is too large ({size} bytes): maximum allowed is {limit} bytes. Set {} to override",
        .path.display(),
        MAX_FILE_BYTES_ENV
    )]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    /// The path exists but is not a regular file.
    #[error("invalid input path {}: expected a file", .0.display())]
    NotAFile(PathBuf),
    /// No `.srt` or `.ass` files were found.
    #[error("no .srt or .ass subtitle files found in {}", .0.display())]
    NoSubtitleFiles(PathBuf),
    /// The detected encoding has no decoder.
    #[error("unsupported encoding for {}: {encoding}", .path.display())]
    UnsupportedEncoding { path: PathBuf, encoding: String },
    /// The content is malformed for the detected encoding.
    #[error("could not decode {} as {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: String },
    /// A filesystem operation failed.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns a closure that wraps an I/O error with the path it happened on.
    ///
    /// Meant for `map_err`.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
