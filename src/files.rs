//! Discovering subtitle files and guarding against unreasonable inputs.

use std::{fs, path::Path};

use crate::error::{Error, Result};

/// The environment variable that overrides [`Limits::DEFAULT_MAX_FILE_BYTES`].
pub const MAX_FILE_BYTES_ENV: &str = "SUBS_MAX_SUBTITLE_FILE_BYTES";

pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass"];

/// Limits applied to every file before it's read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    pub max_file_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_bytes: Self::DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl Limits {
    /// 50 MiB
    pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

    pub const fn new(max_file_bytes: u64) -> Self {
        Self { max_file_bytes }
    }

    /// Reads the limits from the environment.
    ///
    /// Values that aren't a positive integer are ignored and the default is used.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MAX_FILE_BYTES_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(limit) if limit > 0 => Self::new(limit),
                _ => {
                    log::warn!("ignoring invalid {MAX_FILE_BYTES_ENV} value {raw:?}");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Checks that `path` is a regular file within the size limit and returns its size.
    pub fn validate(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path).map_err(Error::io(path))?;
        if !metadata.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }

        let size = metadata.len();
        if size > self.max_file_bytes {
            return Err(Error::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_bytes,
            });
        }
        Ok(size)
    }

    /// Validates then reads the whole file.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.validate(path)?;
        fs::read(path).map_err(Error::io(path))
    }
}

/// Reads a subtitle file as UTF-8 text.
///
/// The text is returned exactly as stored, BOM and line endings included, since
/// it might be written back.
pub fn read_text(path: &Path, limits: &Limits) -> Result<String> {
    let bytes = limits.read(path)?;
    String::from_utf8(bytes).map_err(|_| Error::Encoding {
        files: vec![format!("{} (UNKNOWN)", display_name(path))],
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Lists the regular files directly inside `dir` with one of the given
/// extensions (compared case-insensitively), sorted by name.
///
/// Symlinks, directories and names that aren't valid UTF-8 are skipped.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(Error::io(dir))? {
        let entry = entry.map_err(Error::io(dir))?;
        let file_type = entry.file_type().map_err(Error::io(&entry.path()))?;
        if !file_type.is_file() {
            continue;
        }

        let Ok(name) = entry.file_name().into_string() else {
            log::debug!("skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if has_extension(&name, extensions) {
            files.push(name);
        }
    }

    files.sort();
    Ok(files)
}

/// Lists the `.ass` files in `dir`.
pub fn list_ass_files(dir: &Path) -> Result<Vec<String>> {
    list_files(dir, &["ass"])
}

/// Lists the `.srt` and `.ass` files in `dir`.
///
/// Finding none is an error.
pub fn list_subtitle_files(dir: &Path) -> Result<Vec<String>> {
    let files = list_files(dir, SUBTITLE_EXTENSIONS)?;
    if files.is_empty() {
        Err(Error::NoSubtitleFiles(dir.to_path_buf()))
    } else {
        Ok(files)
    }
}

/// Returns the file name without its extension, e.g. `b.S01E01.ass` -> `b.S01E01`.
pub(crate) fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_subtitle_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.ass", "a.srt", "C.ASS", "d.Srt", "video.mkv", "notes.txt", "ass"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("folder.ass")).unwrap();

        assert_eq!(
            list_subtitle_files(dir.path()).unwrap(),
            vec!["C.ASS", "a.srt", "b.ass", "d.Srt"]
        );
        assert_eq!(list_ass_files(dir.path()).unwrap(), vec!["C.ASS", "b.ass"]);
    }

    #[test]
    fn test_list_subtitle_files_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        assert!(matches!(
            list_subtitle_files(dir.path()),
            Err(Error::NoSubtitleFiles(_))
        ));
        assert!(list_ass_files(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_skips_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real.ass"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.ass"), dir.path().join("link.ass"))
            .unwrap();

        assert_eq!(list_ass_files(dir.path()).unwrap(), vec!["real.ass"]);
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ass");
        fs::write(&path, "0123456789").unwrap();

        assert_eq!(Limits::new(10).validate(&path).unwrap(), 10);
        assert!(matches!(
            Limits::new(9).validate(&path),
            Err(Error::TooLarge {
                size: 10,
                limit: 9,
                ..
            })
        ));
        assert!(matches!(
            Limits::default().validate(dir.path()),
            Err(Error::NotAFile(_))
        ));
        assert!(matches!(
            Limits::default().validate(&dir.path().join("missing.ass")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_limits_from_env_value() {
        assert_eq!(Limits::from_env_value(None), Limits::default());
        assert_eq!(Limits::from_env_value(Some(" 1024 ")), Limits::new(1024));
        assert_eq!(Limits::from_env_value(Some("")), Limits::default());
        assert_eq!(Limits::from_env_value(Some("0")), Limits::default());
        assert_eq!(Limits::from_env_value(Some("-5")), Limits::default());
        assert_eq!(Limits::from_env_value(Some("lots")), Limits::default());
    }

    #[test]
    fn test_read_text_keeps_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ass");
        fs::write(&path, "\u{feff}[Script Info]\r\n").unwrap();
        assert_eq!(
            read_text(&path, &Limits::default()).unwrap(),
            "\u{feff}[Script Info]\r\n"
        );

        fs::write(&path, [0xC4, 0xE3, 0xBA, 0xC3]).unwrap();
        assert!(matches!(
            read_text(&path, &Limits::default()),
            Err(Error::Encoding { .. })
        ));
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("Show.S01E01.ass"), "Show.S01E01");
        assert_eq!(stem("noext"), "noext");
        assert_eq!(stem(".hidden"), ".hidden");
    }
}
