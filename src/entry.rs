//! Directory entry model shared by LIST, MLST and MLSD decoding

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// What a directory entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory (including MLSx `cdir`/`pdir`)
    Dir,
    /// Symbolic link
    Link,
    /// Listing line that no parser claimed
    #[default]
    Unknown,
}

/// A single directory entry produced by a listing operation
///
/// Entries are plain data: the client never mutates them after parsing.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    /// Entry name, possibly containing spaces
    pub name: String,
    /// File, directory, link, or unknown
    pub kind: EntryKind,
    /// Size in bytes (0 when the listing does not carry one)
    pub size: u64,
    /// Symlink target; empty unless `kind == Link`
    pub target: String,
    /// Modification time when the listing carries one
    pub modified: Option<DateTime<Utc>>,
    /// Permission string (`rwxr-xr-x` style or the MLSx `perm` fact)
    pub perm: Option<String>,
    /// MLSx facts by lower-cased key, including ones the decoder does
    /// not interpret (`unique`, `unix.mode`, ...); empty for LIST lines
    pub facts: HashMap<String, String>,
    /// The listing line this entry was decoded from
    pub raw: String,
}

impl Entry {
    /// Entry of the given kind with only name and raw line populated
    pub(crate) fn named(name: impl Into<String>, kind: EntryKind, raw: &str) -> Self {
        Entry {
            name: name.into(),
            kind,
            raw: raw.to_string(),
            ..Entry::default()
        }
    }

    /// True for directories, including the MLSx current/parent entries
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// True for regular files
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// True for symbolic links
    pub fn is_link(&self) -> bool {
        self.kind == EntryKind::Link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_constructor() {
        let e = Entry::named("docs", EntryKind::Dir, "drwxr-xr-x ... docs");
        assert_eq!(e.name, "docs");
        assert!(e.is_dir());
        assert!(!e.is_file());
        assert_eq!(e.size, 0);
        assert_eq!(e.target, "");
        assert_eq!(e.raw, "drwxr-xr-x ... docs");
    }

    #[test]
    fn test_default_is_unknown() {
        let e = Entry::default();
        assert_eq!(e.kind, EntryKind::Unknown);
        assert!(!e.is_dir() && !e.is_file() && !e.is_link());
    }
}
