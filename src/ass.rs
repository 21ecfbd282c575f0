//! Font scanning and rewriting for SubStation Alpha v4+ (.ass subtitles)
//!
//! None of this builds a structured representation of the file. Every
//! operation is a single pass over the raw text, which has two properties
//! that matter for the callers:
//!
//! 1. Anything the pass doesn't understand is left alone.
//! 2. A rewrite only touches the exact bytes it has to.
//!
//! There are two places a font can be referenced in a script. Dialogue text
//! can use the `\fn` override tag inside a `{...}` block and the
//! `[V4+ Styles]` section has a `Fontname` column.

use std::collections::{BTreeSet, HashSet};

use crate::utils::{fields, scan_until, strip_key};

const FONT_TAG: &str = "\\fn";

/// The tag value ends at the next override command, the end of the override
/// block or the end of the line, whichever comes first.
const FONT_TAG_TERMINATORS: &[u8] = b"\\}\r\n";

const STYLES_HEADER: &str = "[V4+ Styles]";

/// The outcome of a pass that may rewrite a document.
///
/// An empty document is a legitimate rewrite result, so "nothing to do" is
/// its own variant rather than an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Nothing matched, the document should not be written back.
    Unchanged,
    /// The document was rewritten.
    ///
    /// `count` is the number of tags removed or lines changed.
    Changed { text: String, count: usize },
}

impl Rewrite {
    /// Returns the number of changes, 0 for [`Unchanged`].
    ///
    /// [`Unchanged`]: Rewrite::Unchanged
    pub fn count(&self) -> usize {
        match self {
            Rewrite::Unchanged => 0,
            Rewrite::Changed { count, .. } => *count,
        }
    }

    /// Returns `true` if the rewrite is [`Changed`].
    ///
    /// [`Changed`]: Rewrite::Changed
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Returns the rewritten text if there is one.
    pub fn into_text(self) -> Option<String> {
        match self {
            Rewrite::Unchanged => None,
            Rewrite::Changed { text, .. } => Some(text),
        }
    }
}

/// An iterator over every `\fn` tag span in a document.
///
/// Each item is the byte range `start..end` where `start` points at the
/// backslash and `end` at the terminator (or the end of the text). The
/// terminator itself is never part of the span.
struct FontTags<'a> {
    text: &'a str,
    cursor: usize,
}

impl Iterator for FontTags<'_> {
    type Item = std::ops::Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.cursor + self.text.get(self.cursor..)?.find(FONT_TAG)?;
        let end = scan_until(self.text, start + FONT_TAG.len(), FONT_TAG_TERMINATORS);
        // Jump past the consumed span instead of re-scanning inside it
        self.cursor = end;
        Some(start..end)
    }
}

fn font_tags(text: &str) -> FontTags<'_> {
    FontTags { text, cursor: 0 }
}

/// Returns every font referenced by a `\fn` tag in the document.
///
/// Names are trimmed, empty names are dropped, and the result is sorted and
/// deduplicated. Comparison is case-sensitive.
pub fn list_dialogue_fonts(text: &str) -> Vec<String> {
    font_tags(text)
        .map(|span| text[span.start + FONT_TAG.len()..span.end].trim())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Removes every `\fn` tag from the document.
///
/// Only the tag is removed, the rest of the override block is kept, e.g.
/// `{\fnArial\fs18}` becomes `{\fs18}`.
pub fn prune_dialogue_font_tags(text: &str) -> Rewrite {
    let mut pruned = String::new();
    let mut last = 0;
    let mut count = 0;
    for span in font_tags(text) {
        pruned.push_str(&text[last..span.start]);
        last = span.end;
        count += 1;
    }

    if count == 0 {
        return Rewrite::Unchanged;
    }

    pruned.push_str(&text[last..]);
    Rewrite::Changed {
        text: pruned,
        count,
    }
}

/// The interesting lines in a `[V4+ Styles]` section.
enum StyleLine<'a> {
    /// `[V4+ Styles]`
    Header,
    /// Any other `[...]` line
    OtherSection,
    /// A `Format:` line, with its value
    Format(&'a str),
    /// A `Style:` line, with its value
    Style(&'a str),
    /// Anything else, including blank lines
    Other,
}

impl<'a> StyleLine<'a> {
    fn classify(line: &'a str) -> Self {
        let line = line.trim_start_matches('\u{feff}').trim();
        if line == STYLES_HEADER {
            Self::Header
        } else if line.starts_with('[') {
            Self::OtherSection
        } else if let Some(value) = strip_key(line, "format") {
            Self::Format(value)
        } else if let Some(value) = strip_key(line, "style") {
            Self::Style(value)
        } else {
            Self::Other
        }
    }
}

/// Tracks where the `Fontname` column is while walking a document line by line.
///
/// The column is only known after the section's `Format:` line and is
/// forgotten whenever a new styles section starts.
#[derive(Debug, Default)]
struct StyleCursor {
    in_styles: bool,
    font_column: Option<usize>,
}

impl StyleCursor {
    /// Feeds a line and returns the value of the `Style:` line if it's one
    /// that has a resolvable font column.
    fn feed<'a>(&mut self, line: &'a str) -> Option<(&'a str, usize)> {
        match StyleLine::classify(line) {
            StyleLine::Header => {
                self.in_styles = true;
                self.font_column = None;
                None
            }
            StyleLine::OtherSection => {
                self.in_styles = false;
                None
            }
            StyleLine::Format(value) if self.in_styles => {
                self.font_column =
                    fields(value).position(|f| f.trim().eq_ignore_ascii_case("Fontname"));
                None
            }
            StyleLine::Style(value) if self.in_styles => Some((value, self.font_column?)),
            _ => None,
        }
    }
}

/// Returns the fonts declared in the `Fontname` column of every
/// `[V4+ Styles]` section.
///
/// The result is deduplicated and in the order the styles are declared.
pub fn list_style_fonts(text: &str) -> Vec<String> {
    let mut cursor = StyleCursor::default();
    let mut seen = HashSet::new();
    let mut fonts = Vec::new();
    for line in text.lines() {
        let Some((value, column)) = cursor.feed(line) else {
            continue;
        };
        let Some(font) = fields(value).nth(column).map(str::trim) else {
            continue;
        };
        if !font.is_empty() && seen.insert(font) {
            fonts.push(font.to_owned());
        }
    }
    fonts
}

/// Sets the `Fontname` column of every style to `font`.
///
/// Lines are split on `\n` and a trailing `\r` is kept, so line endings are
/// preserved. A changed `Style:` line is re-emitted as `Style: ` followed by
/// its fields joined with `,`. Every other line is left byte-for-byte as-is,
/// including styles that already use `font`.
pub fn reset_style_fonts(text: &str, font: &str) -> Rewrite {
    let mut cursor = StyleCursor::default();
    let mut count = 0;
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let (line, cr) = match raw.strip_suffix('\r') {
            Some(line) => (line, "\r"),
            None => (raw, ""),
        };

        let Some((value, column)) = cursor.feed(line) else {
            lines.push(raw.to_owned());
            continue;
        };

        let mut columns = fields(value).collect::<Vec<_>>();
        match columns.get_mut(column) {
            Some(current) if current.trim() != font => {
                *current = font;
                lines.push(format!("Style: {}{cr}", columns.join(",")));
                count += 1;
            }
            _ => lines.push(raw.to_owned()),
        }
    }

    if count == 0 {
        Rewrite::Unchanged
    } else {
        Rewrite::Changed {
            text: lines.join("\n"),
            count,
        }
    }
}
