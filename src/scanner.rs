//! Balanced-delimiter scanning.
//!
//! Every directive argument list and both brace-delimited configuration
//! blocks are located through [`scan_balanced`]. Quote state is tracked for
//! `'`, `"` and `` ` ``; a backslash always consumes the following byte, so
//! escaped quotes and escaped delimiters never change depth.

/// A matched delimiter pair, as byte offsets into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balanced {
    pub open: usize,
    pub close: usize,
}

impl Balanced {
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.open + 1..self.close]
    }

    /// Offset just past the closing delimiter.
    pub fn end(&self) -> usize {
        self.close + 1
    }
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        _ => None,
    }
}

fn is_quote(b: u8) -> bool {
    b == b'\'' || b == b'"' || b == b'`'
}

/// Finds the delimiter matching the one at `open`.
///
/// Returns `None` if `open` is not `(`, `{` or `[`, or if input ends before
/// depth returns to zero.
pub fn scan_balanced(text: &str, open: usize) -> Option<Balanced> {
    let bytes = text.as_bytes();
    let open_ch = *bytes.get(open)?;
    let close_ch = closer_for(open_ch)?;

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => {
                if is_quote(b) {
                    quote = Some(b);
                } else if b == open_ch {
                    depth += 1;
                } else if b == close_ch {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Balanced { open, close: i });
                    }
                }
            }
        }
        i += 1;
    }
    None
}

/// Skips spaces and tabs (not newlines) and scans a `(`-delimited argument
/// list starting there.
pub fn scan_args(text: &str, from: usize) -> Option<Balanced> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    scan_balanced(text, i)
}

/// Walks `text` yielding `(byte_index, byte)` for every byte at nesting depth
/// zero and outside quotes.
fn for_each_top_level<F>(text: &str, mut visit: F)
where
    F: FnMut(usize, u8) -> bool,
{
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ => {
                if depth == 0 && !visit(i, b) {
                    return;
                }
            }
        }
        i += 1;
    }
}

/// Splits on `sep` wherever it occurs outside quotes and brackets.
/// Parts are trimmed; a trailing empty part (from a trailing separator) is
/// dropped.
pub fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for_each_top_level(text, |i, b| {
        if b == sep {
            parts.push(text[start..i].trim());
            start = i + 1;
        }
        true
    });
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// First top-level occurrence of `needle`.
pub fn find_top_level(text: &str, needle: &str) -> Option<usize> {
    let nb = needle.as_bytes();
    let first = *nb.first()?;
    let mut found = None;
    for_each_top_level(text, |i, b| {
        if b == first && text.as_bytes()[i..].starts_with(nb) {
            found = Some(i);
            return false;
        }
        true
    });
    found
}

/// First top-level `=` that is a plain assignment (not `==`, `=>`, `<=`,
/// `>=`, `!=`).
pub fn find_assignment(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut found = None;
    for_each_top_level(text, |i, b| {
        if b != b'=' {
            return true;
        }
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        if next == b'=' || next == b'>' || matches!(prev, b'=' | b'!' | b'<' | b'>') {
            return true;
        }
        found = Some(i);
        false
    });
    found
}

/// Strips one matching pair of surrounding quotes.
pub fn unquote(text: &str) -> Option<&str> {
    let t = text.trim();
    let bytes = t.as_bytes();
    if bytes.len() >= 2 && is_quote(bytes[0]) && bytes[bytes.len() - 1] == bytes[0] {
        Some(&t[1..t.len() - 1])
    } else {
        None
    }
}

/// Unquotes a literal or strips a `$` sigil, whichever applies.
pub fn bare_name(text: &str) -> String {
    let t = text.trim();
    match unquote(t) {
        Some(inner) => inner.to_string(),
        None => t.trim_start_matches('$').to_string(),
    }
}

pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Reads an identifier (letters, digits, `_`) starting at `from`.
pub fn read_word(text: &str, from: usize) -> &str {
    let bytes = text.as_bytes();
    let mut end = from;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    &text[from..end]
}
