//! In-memory BibTeX database that survives a read, mutate, write cycle.
//!
//! The file text is kept as loaded and is the only thing written back. Field
//! updates are spliced into it at the spans reported by the raw `biblatex`
//! parser, so preambles, comments, `@string` macros and crossref'd entries are
//! saved exactly as they were read. Lookups go through a resolved
//! [`Bibliography`] kept in step with every update.

use biblatex::{Bibliography, Chunk, Entry, RawBibliography, RawChunk, Spanned};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::utils::codec::to_user_string;

/// Name of the field that records the local PDF path of a paper
pub const FILE_FIELD: &str = "file";

/// Macros every BibTeX style predefines
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Errors raised while reading or writing a BibTeX file
#[derive(Error, Debug)]
pub enum BibError {
    #[error("BibTeX file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("It was not possible to parse the BibTeX file {path}: {reason}. Maybe the file is invalid")]
    Parse { path: String, reason: String },

    #[error("Could not access BibTeX file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No entry with citation key '{0}'")]
    MissingEntry(String),
}

/// Ordered collection of BibTeX entries keyed by citation key
#[derive(Debug, Clone)]
pub struct BibDatabase {
    name: String,
    source: String,
    bibliography: Bibliography,
}

impl BibDatabase {
    /// Parse BibTeX source text
    pub fn parse(src: &str) -> Result<Self, BibError> {
        Self::parse_named(src, "<input>")
    }

    fn parse_named(src: &str, name: &str) -> Result<Self, BibError> {
        let raw = RawBibliography::parse(src).map_err(|e| parse_error(name, e))?;

        // Undefined macros expand to nothing instead of failing the whole file
        let unresolved = unresolved_abbreviations(&raw);
        let mut resolvable = String::new();
        for abbreviation in &unresolved {
            warn!(file = name, "Unresolved string {}", abbreviation);
            resolvable.push_str(&format!("@string{{{} = {{}}}}\n", abbreviation));
        }
        resolvable.push_str(src);

        let bibliography = Bibliography::parse(&resolvable).map_err(|e| parse_error(name, e))?;
        for (key, parent) in unresolved_crossrefs(&bibliography) {
            warn!(file = name, entry = %key, "Unresolved cross-reference {}", parent);
        }

        Ok(Self {
            name: name.to_string(),
            source: src.to_string(),
            bibliography,
        })
    }

    /// Read and parse a BibTeX file
    pub fn load(path: &Path) -> Result<Self, BibError> {
        let src = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                BibError::NotFound(path.to_path_buf())
            } else {
                BibError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::parse_named(&src, &path.display().to_string())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.bibliography.len()
    }

    /// Check if the database has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in file order, with crossref'd fields resolved
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.bibliography.iter()
    }

    /// Citation keys in file order
    pub fn keys(&self) -> Vec<String> {
        self.entries().map(|entry| entry.key.clone()).collect()
    }

    /// Get an entry by citation key
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.bibliography.get(key)
    }

    #[cfg(test)]
    pub(crate) fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.bibliography.get_mut(key)
    }

    /// Raw value of a field of an entry
    pub fn field(&self, key: &str, field: &str) -> Option<&[Spanned<Chunk>]> {
        self.entry(key).and_then(|entry| field_of(entry, field))
    }

    /// Overwrite a field of an entry.
    ///
    /// Any existing value is removed before the new one is inserted, whatever
    /// the capitalization of its name, so the entry ends up with exactly one
    /// field of that name. Nothing else in the file text changes.
    pub fn set_field(&mut self, key: &str, field: &str, value: &str) -> Result<(), BibError> {
        let source = splice_field(&self.source, key, field, value)
            .map_err(|e| e.with_path(&self.name))?;

        let entry = self
            .bibliography
            .get_mut(key)
            .ok_or_else(|| BibError::MissingEntry(key.to_string()))?;
        entry.fields.retain(|name, _| !name.eq_ignore_ascii_case(field));
        entry.fields.insert(
            field.to_ascii_lowercase(),
            vec![Spanned::detached(Chunk::Verbatim(value.to_string()))],
        );

        self.source = source;
        Ok(())
    }

    /// The BibTeX text, including every update made so far
    pub fn to_bibtex_string(&self) -> String {
        self.source.clone()
    }

    /// Write the database to `path`, replacing its contents
    pub fn save(&self, path: &Path) -> Result<(), BibError> {
        std::fs::write(path, &self.source).map_err(|source| BibError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl BibError {
    fn with_path(self, path: &str) -> Self {
        match self {
            BibError::Parse { reason, .. } => BibError::Parse {
                path: path.to_string(),
                reason,
            },
            other => other,
        }
    }
}

fn parse_error(path: &str, error: impl fmt::Display) -> BibError {
    BibError::Parse {
        path: path.to_string(),
        reason: error.to_string(),
    }
}

/// Raw value of a field, looked up without regard to capitalization
pub fn field_of<'a>(entry: &'a Entry, field: &str) -> Option<&'a [Spanned<Chunk>]> {
    entry
        .fields
        .get(field)
        .or_else(|| {
            entry
                .fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field))
                .map(|(_, value)| value)
        })
        .map(|value| value.as_slice())
}

/// Macros used in field or `@string` values that no `@string` defines
fn unresolved_abbreviations<'s>(raw: &RawBibliography<'s>) -> Vec<&'s str> {
    let defined: HashSet<&str> = raw.abbreviations.iter().map(|pair| pair.key.v).collect();
    let values = raw.abbreviations.iter().map(|pair| &pair.value.v).chain(
        raw.entries
            .iter()
            .flat_map(|entry| entry.v.fields.iter().map(|pair| &pair.value.v)),
    );

    let mut unresolved = Vec::new();
    for chunk in values.flatten() {
        if let RawChunk::Abbreviation(name) = &chunk.v {
            let name: &'s str = *name;
            let is_month = MONTH_ABBREVIATIONS.contains(&name.to_ascii_lowercase().as_str());
            if !defined.contains(name) && !is_month && !unresolved.contains(&name) {
                unresolved.push(name);
            }
        }
    }
    unresolved
}

/// `(entry, parent)` pairs whose `crossref` names no entry of the database
fn unresolved_crossrefs(bibliography: &Bibliography) -> Vec<(String, String)> {
    bibliography
        .iter()
        .filter_map(|entry| {
            let parent = to_user_string(field_of(entry, "crossref")?);
            bibliography
                .get(&parent)
                .is_none()
                .then(|| (entry.key.clone(), parent))
        })
        .collect()
}

/// Rewrite `src` so the entry `key` has exactly one `field` holding `value`.
///
/// Existing fields of that name are cut out and the new one goes right after
/// the citation key.
fn splice_field(src: &str, key: &str, field: &str, value: &str) -> Result<String, BibError> {
    let raw = RawBibliography::parse(src).map_err(|e| parse_error("<input>", e))?;
    let entry = raw
        .entries
        .iter()
        .find(|entry| entry.v.key.v == key)
        .ok_or_else(|| BibError::MissingEntry(key.to_string()))?;

    let removals: Vec<Range<usize>> = entry
        .v
        .fields
        .iter()
        .filter(|pair| pair.key.v.eq_ignore_ascii_case(field))
        .map(|pair| field_extent(src, pair.key.span.start))
        .collect();

    let key_end = entry.v.key.span.end;
    let after_key = &src[key_end..];
    let padding = after_key.len() - after_key.trim_start().len();
    let name = field.to_ascii_lowercase();
    let (insert_at, inserted) = if after_key[padding..].starts_with(',') {
        (key_end + padding + 1, format!("\n  {} = {{{}}},", name, value))
    } else {
        (key_end, format!(",\n  {} = {{{}}}", name, value))
    };

    let mut out = String::with_capacity(src.len() + inserted.len());
    out.push_str(&src[..insert_at]);
    out.push_str(&inserted);
    let mut cursor = insert_at;
    for range in removals {
        out.push_str(&src[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&src[cursor..]);
    Ok(out)
}

/// Byte range of the field starting at `start`: name, `=`, the value with its
/// `#` concatenations, a trailing comma and the whitespace up to the next field.
fn field_extent(src: &str, start: usize) -> Range<usize> {
    let bytes = src.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i] != b'=' {
        i += 1;
    }
    i += 1;

    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            Some(b'{') => i = skip_braced(bytes, i),
            Some(b'"') => i = skip_quoted(bytes, i),
            Some(_) => {
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b',' | b'#' | b'}' | b')')
                {
                    i += 1;
                }
            }
            None => break,
        }
        i = skip_whitespace(bytes, i);
        if bytes.get(i) == Some(&b'#') {
            i += 1;
        } else {
            break;
        }
    }

    if bytes.get(i) == Some(&b',') {
        i = skip_whitespace(bytes, i + 1);
    }
    start..i.min(bytes.len())
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index right after the brace group opening at `open`
fn skip_braced(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Index right after the quoted string opening at `open`
fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'"' if depth == 0 => return i + 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}
