//! Chunk splitting, joining and naming.
//!
//! An encoded value longer than the store's property limit is persisted as a
//! run of raw properties:
//!
//! ```text
//! key_0  = chars [0, max)
//! key_1  = chars [max, 2*max)
//! ...
//! key_N-1 = remainder
//! ```
//!
//! Sizes are measured in a `SizeUnit` matching the host's limit: characters,
//! UTF-8 bytes or UTF-16 code units. Cuts always fall on character
//! boundaries, so every chunk is a valid string. Everything here is pure; the
//! document layer does the I/O.

/// Separator between a logical key and its chunk index.
pub const CHUNK_SEPARATOR: char = '_';

/// Unit a property size limit is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeUnit {
    /// Unicode scalar values.
    #[default]
    Chars,
    Utf8Bytes,
    Utf16Units,
}

impl SizeUnit {
    /// Size of one character in this unit.
    pub fn char_len(self, c: char) -> usize {
        match self {
            SizeUnit::Chars => 1,
            SizeUnit::Utf8Bytes => c.len_utf8(),
            SizeUnit::Utf16Units => c.len_utf16(),
        }
    }

    /// Size of a whole string in this unit.
    pub fn measure(self, value: &str) -> usize {
        match self {
            SizeUnit::Chars => value.chars().count(),
            SizeUnit::Utf8Bytes => value.len(),
            SizeUnit::Utf16Units => value.encode_utf16().count(),
        }
    }
}

/// Splits `value` into consecutive slices of at most `max_chunk_size` chars.
///
/// The empty string yields no chunks. A `max_chunk_size` of zero is treated
/// as one so the split always makes progress.
pub fn split(value: &str, max_chunk_size: usize) -> Vec<&str> {
    split_by(value, max_chunk_size, SizeUnit::Chars)
}

/// Splits `value` into slices of at most `max_chunk_size` units of `unit`.
///
/// A single character wider than the limit (a 4-byte char with a 3-byte
/// limit) gets a chunk of its own and is the only case a chunk exceeds it.
pub fn split_by(value: &str, max_chunk_size: usize, unit: SizeUnit) -> Vec<&str> {
    let max = max_chunk_size.max(1);
    let mut chunks = Vec::with_capacity(chunk_count(value.len(), max));
    let mut start = 0;
    let mut taken = 0;

    for (offset, c) in value.char_indices() {
        let width = unit.char_len(c);
        if taken > 0 && taken + width > max {
            chunks.push(&value[start..offset]);
            start = offset;
            taken = 0;
        }
        taken += width;
    }
    if start < value.len() {
        chunks.push(&value[start..]);
    }
    chunks
}

/// Concatenates chunks in the given order.
pub fn join<S: AsRef<str>>(chunks: &[S]) -> String {
    let len = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut out = String::with_capacity(len);
    for chunk in chunks {
        out.push_str(chunk.as_ref());
    }
    out
}

/// Number of chunks a value of `len` units occupies with the given limit.
pub fn chunk_count(len: usize, max_chunk_size: usize) -> usize {
    len.div_ceil(max_chunk_size.max(1))
}

/// Raw property name for chunk `index` of `key`.
pub fn chunk_name(key: &str, index: usize) -> String {
    format!("{}{}{}", key, CHUNK_SEPARATOR, index)
}

/// Parses a raw property name into `(key, index)`.
///
/// The index is the run of ASCII digits after the last separator. Returns
/// `None` for names that are not chunk properties.
pub fn parse_chunk_name(name: &str) -> Option<(&str, usize)> {
    let (key, suffix) = name.rsplit_once(CHUNK_SEPARATOR)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = suffix.parse().ok()?;
    Some((key, index))
}

/// Logical key a raw property name belongs to.
///
/// Names without a chunk suffix are returned unchanged.
pub fn logical_key(name: &str) -> &str {
    parse_chunk_name(name).map_or(name, |(key, _)| key)
}
