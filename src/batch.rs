//! Directory-wide operations.
//!
//! Every `.ass` operation first lists the files and runs them all through the
//! [`EncodingGuard`], so a bad file aborts the batch before anything has been
//! written. A failed write stops the batch too, files that were already
//! written stay written.

use std::path::{Path, PathBuf};

use crate::{
    ass::{self, Rewrite},
    atomic::atomic_write,
    encoding::{Chardet, DetectEncoding, EncodingGuard},
    error::Result,
    files::{list_ass_files, list_subtitle_files, read_text, Limits},
};

/// The fonts found in a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFonts {
    pub file_name: String,
    pub fonts: Vec<String>,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PruneSummary {
    pub total_files: usize,
    pub removed_tags: usize,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ResetSummary {
    pub total_files: usize,
    pub updated_files: usize,
    pub updated_fonts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEncoding {
    pub file_name: String,
    pub encoding: String,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EncodingSummary {
    pub total: usize,
    pub updated: usize,
}

/// Operations over the subtitle files directly inside a directory.
#[derive(Debug, Clone)]
pub struct Batch<D = Chardet> {
    dir: PathBuf,
    guard: EncodingGuard<D>,
}

impl Batch<Chardet> {
    pub fn new(dir: impl Into<PathBuf>, limits: Limits) -> Self {
        Self::with_detector(dir, limits, Chardet)
    }
}

impl<D: DetectEncoding> Batch<D> {
    pub fn with_detector(dir: impl Into<PathBuf>, limits: Limits, detector: D) -> Self {
        Self {
            dir: dir.into(),
            guard: EncodingGuard::new(detector, limits),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn read(&self, file_name: &str) -> Result<String> {
        read_text(&self.path(file_name), self.guard.limits())
    }

    /// Lists the `.ass` files after making sure all of them are UTF-8.
    fn checked_ass_files(&self) -> Result<Vec<String>> {
        let files = list_ass_files(&self.dir)?;
        self.guard.ensure_utf8(&self.dir, &files)?;
        Ok(files)
    }

    fn list_fonts(&self, scan: fn(&str) -> Vec<String>) -> Result<Vec<FileFonts>> {
        self.checked_ass_files()?
            .into_iter()
            .map(|file_name| -> Result<FileFonts> {
                let fonts = scan(&self.read(&file_name)?);
                Ok(FileFonts { file_name, fonts })
            })
            .collect()
    }

    /// Writes a rewrite back, returning the number of changes.
    fn apply(&self, file_name: &str, rewrite: Rewrite) -> Result<usize> {
        let count = rewrite.count();
        match rewrite.into_text() {
            Some(text) => {
                atomic_write(&self.path(file_name), text.as_bytes())?;
                log::info!("rewrote {file_name} ({count} change(s))");
            }
            None => log::debug!("{file_name} is unchanged"),
        }
        Ok(count)
    }

    /// Lists the fonts used by `\fn` tags in every `.ass` file.
    pub fn list_dialogue_fonts(&self) -> Result<Vec<FileFonts>> {
        self.list_fonts(ass::list_dialogue_fonts)
    }

    /// Removes every `\fn` tag from every `.ass` file.
    pub fn prune_dialogue_fonts(&self) -> Result<PruneSummary> {
        let mut summary = PruneSummary::default();
        for file_name in self.checked_ass_files()? {
            summary.total_files += 1;
            let rewrite = ass::prune_dialogue_font_tags(&self.read(&file_name)?);
            summary.removed_tags += self.apply(&file_name, rewrite)?;
        }
        Ok(summary)
    }

    /// Lists the fonts declared in the `[V4+ Styles]` section of every `.ass` file.
    pub fn list_style_fonts(&self) -> Result<Vec<FileFonts>> {
        self.list_fonts(ass::list_style_fonts)
    }

    /// Sets the font of every style in every `.ass` file to `font`.
    pub fn reset_style_fonts(&self, font: &str) -> Result<ResetSummary> {
        let files = self.checked_ass_files()?;
        let mut summary = ResetSummary {
            total_files: files.len(),
            ..Default::default()
        };
        for file_name in files {
            let rewrite = ass::reset_style_fonts(&self.read(&file_name)?, font);
            let updated = self.apply(&file_name, rewrite)?;
            if updated > 0 {
                summary.updated_files += 1;
                summary.updated_fonts += updated;
            }
        }
        Ok(summary)
    }

    /// Detects the encoding of every subtitle file.
    pub fn list_encodings(&self) -> Result<Vec<FileEncoding>> {
        Ok(list_subtitle_files(&self.dir)?
            .into_iter()
            .map(|file_name| FileEncoding {
                encoding: self.guard.file_encoding(&self.path(&file_name)),
                file_name,
            })
            .collect())
    }

    /// Converts every subtitle file to UTF-8.
    pub fn reset_encodings(&self) -> Result<EncodingSummary> {
        let files = list_subtitle_files(&self.dir)?;
        let mut summary = EncodingSummary {
            total: files.len(),
            updated: 0,
        };
        for file_name in files {
            if self.guard.convert_to_utf8(&self.path(&file_name))? {
                summary.updated += 1;
            }
        }
        Ok(summary)
    }
}
