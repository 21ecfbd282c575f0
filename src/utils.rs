/// Returns the index of the first byte at or after `start` that is one of
/// `terminators`, or `text.len()` if none is found.
///
/// The terminators must be ASCII so the returned index is always a char boundary.
pub(crate) fn scan_until(text: &str, start: usize, terminators: &[u8]) -> usize {
    debug_assert!(terminators.is_ascii());
    text.as_bytes()
        .get(start..)
        .and_then(|rest| rest.iter().position(|b| terminators.contains(b)))
        .map_or(text.len(), |offset| start + offset)
}

/// An iterator over the comma separated fields of a `Format:` or `Style:` value.
///
/// Fields are returned raw, surrounding whitespace included.
pub(crate) struct Fields<'a> {
    text: &'a str,
    start: Option<usize>,
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.start?;
        let end = scan_until(self.text, start, b",");
        self.start = (end < self.text.len()).then_some(end + 1);
        Some(&self.text[start..end])
    }
}

pub(crate) fn fields(text: &str) -> Fields<'_> {
    Fields {
        text,
        start: Some(0),
    }
}

/// Splits a `Key: value` line, comparing the key case-insensitively.
///
/// Whitespace around the key is tolerated, so `Format : Name` matches `format`.
/// The returned value has its surrounding whitespace trimmed.
pub(crate) fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (name, value) = line.split_once(':')?;
    name.trim()
        .eq_ignore_ascii_case(key)
        .then(|| value.trim())
}
