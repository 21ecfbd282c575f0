//! Encoding detection and conversion.
//!
//! Everything that rewrites text works on UTF-8 only, so the files have to be
//! checked (and possibly converted) first.

use std::path::Path;

use encoding_rs::Encoding;

use crate::{
    atomic::atomic_write,
    error::{Error, Result},
    files::Limits,
};

/// The label used when an encoding could not be detected.
pub const UNKNOWN_ENCODING: &str = "UNKNOWN";

/// Something that can guess the character encoding of a byte buffer.
pub trait DetectEncoding {
    /// Returns the name of the detected encoding, if any.
    fn detect(&self, content: &[u8]) -> Option<String>;
}

/// Detects encodings through a byte order mark or, failing that, the
/// statistical detector in `chardetng`.
#[derive(Debug, Default, Copy, Clone)]
pub struct Chardet;

impl DetectEncoding for Chardet {
    fn detect(&self, content: &[u8]) -> Option<String> {
        if content.is_empty() {
            return None;
        }

        if let Some((encoding, _)) = Encoding::for_bom(content) {
            return Some(encoding.name().to_owned());
        }

        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(content, true);
        Some(detector.guess(None, true).name().to_owned())
    }
}

fn normalize(label: &str) -> String {
    let label = label.trim().to_ascii_uppercase().replace('_', "-");
    if label == "UTF8" {
        String::from("UTF-8")
    } else {
        label
    }
}

/// Checks that subtitle files are UTF-8 before they're scanned or rewritten.
#[derive(Debug, Clone)]
pub struct EncodingGuard<D> {
    detector: D,
    limits: Limits,
}

impl<D: DetectEncoding> EncodingGuard<D> {
    pub fn new(detector: D, limits: Limits) -> Self {
        Self { detector, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    fn detect(&self, content: &[u8]) -> String {
        self.detector
            .detect(content)
            .map(|label| normalize(&label))
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| UNKNOWN_ENCODING.to_owned())
    }

    /// Returns the detected encoding of a file.
    ///
    /// Files that can't be read or are too large are reported as `UNKNOWN`.
    pub fn file_encoding(&self, path: &Path) -> String {
        match self.limits.read(path) {
            Ok(content) => self.detect(&content),
            Err(e) => {
                log::debug!("could not detect the encoding of {}: {e}", path.display());
                UNKNOWN_ENCODING.to_owned()
            }
        }
    }

    /// Ensures every file in `files` (relative to `dir`) is valid UTF-8.
    ///
    /// Every offending file is reported in a single [`Error::Encoding`]. The
    /// size limit is checked here too, so a batch can rely on this to reject
    /// bad input before it touches anything.
    pub fn ensure_utf8(&self, dir: &Path, files: &[String]) -> Result<()> {
        let mut offending = Vec::new();
        for file in files {
            let content = self.limits.read(&dir.join(file))?;
            if std::str::from_utf8(&content).is_ok() {
                continue;
            }

            // A detector may claim UTF-8 for invalid data, trust the bytes instead
            let encoding = self.detect(&content);
            log::debug!("{file} is not UTF-8 (detected {encoding})");
            offending.push(format!("{file} ({encoding})"));
        }

        if offending.is_empty() {
            Ok(())
        } else {
            Err(Error::Encoding { files: offending })
        }
    }

    /// Converts a file to UTF-8 in place.
    ///
    /// Returns `false` if the file is already UTF-8. Nothing is written if the
    /// content isn't valid for the detected encoding.
    pub fn convert_to_utf8(&self, path: &Path) -> Result<bool> {
        let content = self.limits.read(path)?;
        if std::str::from_utf8(&content).is_ok() {
            return Ok(false);
        }

        // Labels are resolved as the detector reported them, `normalize` would
        // break names like `Shift_JIS`
        let label = self.detector.detect(&content);
        let encoding = label
            .as_deref()
            .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
            .filter(|e| *e != encoding_rs::UTF_8)
            .ok_or_else(|| Error::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: label.map_or_else(|| UNKNOWN_ENCODING.to_owned(), |l| normalize(&l)),
            })?;

        let (decoded, used, had_errors) = encoding.decode(&content);
        if had_errors {
            return Err(Error::Decode {
                path: path.to_path_buf(),
                encoding: used.name().to_owned(),
            });
        }

        atomic_write(path, decoded.as_bytes())?;
        log::info!("converted {} from {} to UTF-8", path.display(), used.name());
        Ok(true)
    }
}

impl Default for EncodingGuard<Chardet> {
    fn default() -> Self {
        Self::new(Chardet, Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Claims a fixed encoding for every input.
    struct Fixed(&'static str);

    impl DetectEncoding for Fixed {
        fn detect(&self, _content: &[u8]) -> Option<String> {
            Some(self.0.to_owned())
        }
    }

    struct Undetectable;

    impl DetectEncoding for Undetectable {
        fn detect(&self, _content: &[u8]) -> Option<String> {
            None
        }
    }

    // "你好" in GBK
    const GBK_HELLO: &[u8] = &[0xC4, 0xE3, 0xBA, 0xC3];

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" utf8 "), "UTF-8");
        assert_eq!(normalize("utf_16le"), "UTF-16LE");
        assert_eq!(normalize("gb18030"), "GB18030");
    }

    #[test]
    fn test_chardet_detects_bom() {
        assert_eq!(Chardet.detect(&[0xEF, 0xBB, 0xBF, b'a']).as_deref(), Some("UTF-8"));
        assert_eq!(Chardet.detect(&[0xFF, 0xFE, b'a', 0]).as_deref(), Some("UTF-16LE"));
        assert_eq!(Chardet.detect(b""), None);
    }

    #[test]
    fn test_chardet_detects_utf8() {
        let content = "Dialogue: 0,0:00:00.00,0:00:01.00,Default,,0,0,0,,你好，世界";
        assert_eq!(Chardet.detect(content.as_bytes()).as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_ensure_utf8_reports_every_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ass"), "hello").unwrap();
        fs::write(dir.path().join("b.ass"), GBK_HELLO).unwrap();
        fs::write(dir.path().join("c.ass"), GBK_HELLO).unwrap();

        let files = vec!["a.ass".to_owned(), "b.ass".to_owned(), "c.ass".to_owned()];
        let guard = EncodingGuard::new(Fixed("gb18030"), Limits::default());
        let err = guard.ensure_utf8(dir.path(), &files).unwrap_err();
        assert_eq!(
            err.to_string(),
            "b.ass (GB18030), c.ass (GB18030). Please run `subs encoding reset` to convert subtitle files to UTF-8 first."
        );

        let guard = EncodingGuard::new(Undetectable, Limits::default());
        let Err(Error::Encoding { files: offending }) = guard.ensure_utf8(dir.path(), &files)
        else {
            panic!("expected an encoding error");
        };
        assert_eq!(offending, vec!["b.ass (UNKNOWN)", "c.ass (UNKNOWN)"]);
    }

    #[test]
    fn test_ensure_utf8_trusts_valid_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ass"), "你好").unwrap();

        let guard = EncodingGuard::new(Fixed("windows-1252"), Limits::default());
        guard.ensure_utf8(dir.path(), &["a.ass".to_owned()]).unwrap();
        guard.ensure_utf8(dir.path(), &[]).unwrap();
    }

    #[test]
    fn test_ensure_utf8_checks_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ass"), "hello").unwrap();

        let guard = EncodingGuard::new(Chardet, Limits::new(4));
        assert!(matches!(
            guard.ensure_utf8(dir.path(), &["a.ass".to_owned()]),
            Err(Error::TooLarge { .. })
        ));
    }

    #[test]
    fn test_file_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        fs::write(&path, "content").unwrap();

        let guard = EncodingGuard::new(Fixed("utf-8"), Limits::default());
        assert_eq!(guard.file_encoding(&path), "UTF-8");

        let guard = EncodingGuard::new(Fixed("utf-8"), Limits::new(1));
        assert_eq!(guard.file_encoding(&path), UNKNOWN_ENCODING);
        assert_eq!(guard.file_encoding(dir.path()), UNKNOWN_ENCODING);
    }

    #[test]
    fn test_convert_to_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        fs::write(&path, GBK_HELLO).unwrap();

        let guard = EncodingGuard::new(Fixed("GBK"), Limits::default());
        assert!(guard.convert_to_utf8(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "你好");
        // Second time around it's already UTF-8
        assert!(!guard.convert_to_utf8(&path).unwrap());
    }

    #[test]
    fn test_convert_to_utf8_unknown_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        fs::write(&path, GBK_HELLO).unwrap();

        let guard = EncodingGuard::new(Undetectable, Limits::default());
        assert!(matches!(
            guard.convert_to_utf8(&path),
            Err(Error::UnsupportedEncoding { .. })
        ));

        // Claiming UTF-8 for invalid bytes doesn't help either
        let guard = EncodingGuard::new(Fixed("utf-8"), Limits::default());
        assert!(matches!(
            guard.convert_to_utf8(&path),
            Err(Error::UnsupportedEncoding { .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), GBK_HELLO);
    }

    #[test]
    fn test_convert_to_utf8_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        // A lone lead byte is invalid in both UTF-8 and Shift_JIS
        fs::write(&path, [b'a', 0x82]).unwrap();

        let guard = EncodingGuard::new(Fixed("Shift_JIS"), Limits::default());
        assert!(matches!(
            guard.convert_to_utf8(&path),
            Err(Error::Decode { .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), [b'a', 0x82]);
    }
}
