//! LIST line decoding and MLSx fact parsing
//!
//! LIST output has no standard grammar; servers emit Unix `ls -l`
//! (8- or 9-field), DOS `dir`, or EPLF lines. Decoding is a composite
//! of strategies: each registered parser is tried in order and the
//! first to claim a line wins. User-supplied parsers run before the
//! built-ins; a line nobody claims becomes an `Unknown` entry carrying
//! the raw text. All parsers are total over arbitrary input.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::entry::{Entry, EntryKind};

/// A single LIST line decoding strategy
///
/// Implementations return `Some` only for lines they positively
/// recognize; returning `None` passes the line to the next strategy.
pub trait ListParser: Send + Sync {
    /// Try to decode one listing line
    fn parse(&self, line: &str) -> Option<Entry>;
}

/// Decode one LIST line with the built-in strategies
///
/// Whitespace-only lines yield `None` (skipped, not unknown); any other
/// line yields an entry, falling back to [`EntryKind::Unknown`].
pub fn parse_line(line: &str) -> Option<Entry> {
    parse_line_with(line, &[])
}

/// Decode one LIST line, trying `custom` parsers before the built-ins
pub fn parse_line_with(line: &str, custom: &[Arc<dyn ListParser>]) -> Option<Entry> {
    if line.trim().is_empty() {
        return None;
    }
    for parser in custom {
        if let Some(entry) = parser.parse(line) {
            return Some(entry);
        }
    }
    EplfParser
        .parse(line)
        .or_else(|| DosParser.parse(line))
        .or_else(|| UnixParser.parse(line))
        .or_else(|| Some(Entry::named(line.trim_end(), EntryKind::Unknown, line)))
}

/// EPLF listing lines (`+facts\tname`), as emitted by publicfile
///
/// Facts are comma-separated up to the first whitespace: `/` marks a
/// directory, `s<n>` carries the size; other facts (`i`, `m`, `r`, ...)
/// are positional noise and ignored.
pub struct EplfParser;

impl ListParser for EplfParser {
    fn parse(&self, line: &str) -> Option<Entry> {
        let rest = line.strip_prefix('+')?;
        let sep = rest.bytes().position(|b| b.is_ascii_whitespace())?;
        let name = rest[sep + 1..].trim_end();
        if name.is_empty() {
            return None;
        }

        let mut kind = EntryKind::File;
        let mut size = 0u64;
        for fact in rest[..sep].split(',') {
            if fact == "/" {
                kind = EntryKind::Dir;
            } else if let Some(digits) = fact.strip_prefix('s') {
                if let Ok(n) = digits.parse() {
                    size = n;
                }
            }
        }

        let mut entry = Entry::named(name, kind, line);
        entry.size = size;
        Some(entry)
    }
}

/// DOS/Windows `dir` listing lines
///
/// `MM-DD-YY  HH:MMAM  <DIR>|size  name`; the date and time tokens are
/// matched by shape, and the name is the remaining fields joined by
/// single spaces.
pub struct DosParser;

impl ListParser for DosParser {
    fn parse(&self, line: &str) -> Option<Entry> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || !is_dos_date(fields[0]) || !is_dos_time(fields[1]) {
            return None;
        }

        let (kind, size) = if fields[2] == "<DIR>" {
            (EntryKind::Dir, 0)
        } else {
            (EntryKind::File, fields[2].parse().ok()?)
        };

        let mut entry = Entry::named(fields[3..].join(" "), kind, line);
        entry.size = size;
        entry.modified = parse_dos_mtime(fields[0], fields[1]);
        Some(entry)
    }
}

/// Unix `ls -l` listing lines, both the 9-field layout
/// (`perms links owner group size month day time name`) and the 8-field
/// variant without a group column
///
/// The layouts are distinguished by which candidate size field parses
/// as a decimal integer. Symlink names are split on the literal
/// `" -> "` separator.
pub struct UnixParser;

impl ListParser for UnixParser {
    fn parse(&self, line: &str) -> Option<Entry> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return None;
        }
        let kind = mode_kind(fields[0])?;

        if fields.len() >= 9 {
            if let Ok(size) = fields[4].parse::<u64>() {
                let name = remainder_after_fields(line, 8)?;
                return Some(unix_entry(
                    line, kind, fields[0], size, fields[5], fields[6], fields[7], name,
                ));
            }
        }
        let size = fields[3].parse::<u64>().ok()?;
        let name = remainder_after_fields(line, 7)?;
        Some(unix_entry(
            line, kind, fields[0], size, fields[4], fields[5], fields[6], name,
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn unix_entry(
    line: &str,
    kind: EntryKind,
    mode: &str,
    size: u64,
    month: &str,
    day: &str,
    time_or_year: &str,
    name_field: &str,
) -> Entry {
    let (name, target) = if kind == EntryKind::Link {
        match name_field.split_once(" -> ") {
            Some((name, target)) => (name, target),
            None => (name_field, ""),
        }
    } else {
        (name_field, "")
    };

    let mut entry = Entry::named(name, kind, line);
    entry.size = size;
    entry.target = target.to_string();
    entry.perm = Some(mode.to_string());
    entry.modified = parse_unix_mtime(month, day, time_or_year);
    entry
}

/// Classify the first LIST field: symbolic permissions
/// (`-rw-r--r--`, `drwxr-xr-x`, ...) or 3-4 octal digits
fn mode_kind(field: &str) -> Option<EntryKind> {
    let bytes = field.as_bytes();
    if (3..=4).contains(&bytes.len()) && bytes.iter().all(|b| (b'0'..=b'7').contains(b)) {
        return Some(EntryKind::File);
    }
    if bytes.len() < 10 {
        return None;
    }
    match bytes[0] {
        b'd' => Some(EntryKind::Dir),
        b'l' => Some(EntryKind::Link),
        b'-' | b'b' | b'c' | b'p' | b's' => Some(EntryKind::File),
        _ => None,
    }
}

/// The tail of `line` after skipping `n` whitespace-delimited fields,
/// with internal spacing of the remainder preserved
fn remainder_after_fields(line: &str, n: usize) -> Option<&str> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    for _ in 0..n {
        if i >= bytes.len() {
            return None;
        }
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
    }
    let rest = line[i..].trim_end();
    if rest.is_empty() { None } else { Some(rest) }
}

fn is_dos_date(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 8 && b.len() != 10 {
        return false;
    }
    b[0].is_ascii_digit()
        && b[1].is_ascii_digit()
        && (b[2] == b'-' || b[2] == b'/')
        && b[3].is_ascii_digit()
        && b[4].is_ascii_digit()
        && (b[5] == b'-' || b[5] == b'/')
        && b[6..].iter().all(u8::is_ascii_digit)
}

fn is_dos_time(s: &str) -> bool {
    s.contains(':') && s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

fn parse_dos_mtime(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let combined = format!("{} {}", date.replace('/', "-"), time);
    for format in [
        "%m-%d-%y %I:%M%p",
        "%m-%d-%Y %I:%M%p",
        "%m-%d-%y %H:%M",
        "%m-%d-%Y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&combined, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// `ls -l` dates come as `Mon DD HH:MM` for recent entries (year
/// implied, never in the future) or `Mon DD YYYY` for older ones
fn parse_unix_mtime(month: &str, day: &str, time_or_year: &str) -> Option<DateTime<Utc>> {
    let month = match month.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let day: u32 = day.parse().ok()?;

    if let Some((hour, minute)) = time_or_year.split_once(':') {
        let hour: u32 = hour.parse().ok()?;
        let minute: u32 = minute.parse().ok()?;
        let now = Utc::now();
        let dt = NaiveDate::from_ymd_opt(now.year(), month, day)?.and_hms_opt(hour, minute, 0)?;
        let mut when = Utc.from_utc_datetime(&dt);
        if when > now {
            if let Some(prev) = NaiveDate::from_ymd_opt(now.year() - 1, month, day)
                .and_then(|d| d.and_hms_opt(hour, minute, 0))
            {
                when = Utc.from_utc_datetime(&prev);
            }
        }
        Some(when)
    } else {
        let year: i32 = time_or_year.parse().ok()?;
        let dt = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
        Some(Utc.from_utc_datetime(&dt))
    }
}

/// Decode one MLST/MLSD fact line: `key=value;` pairs up to the first
/// space, then the name to end of line
///
/// Fact keys are case-insensitive (stored lower-cased); values keep
/// their case. Interpreted facts: `type`, `size`, `modify`, `perm`;
/// everything else is preserved in the entry's fact map.
pub fn parse_mlsx_line(line: &str) -> Option<Entry> {
    let trimmed = line.trim_end();
    let (facts, name) = trimmed.split_once(' ')?;
    if name.is_empty() {
        return None;
    }

    let mut entry = Entry::named(name, EntryKind::Unknown, line);
    for fact in facts.split(';') {
        let Some((key, value)) = fact.split_once('=') else {
            continue;
        };
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            "type" => {
                let (kind, target) = mlsx_kind(value);
                entry.kind = kind;
                entry.target = target.to_string();
            }
            "size" => entry.size = value.parse().unwrap_or(0),
            "modify" => entry.modified = parse_mlsx_timestamp(value),
            "perm" => entry.perm = Some(value.to_string()),
            _ => {}
        }
        entry.facts.insert(key, value.to_string());
    }
    Some(entry)
}

fn mlsx_kind(value: &str) -> (EntryKind, &str) {
    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
        "file" => (EntryKind::File, ""),
        "dir" | "cdir" | "pdir" => (EntryKind::Dir, ""),
        "os.unix=symlink" | "os.unix=link" | "os.unix=slink" => (EntryKind::Link, ""),
        // ProFTPD renders the target into the fact: "OS.unix=slink:<target>"
        _ if lower.starts_with("os.unix=slink:") => {
            (EntryKind::Link, value.splitn(2, ':').nth(1).unwrap_or(""))
        }
        _ => (EntryKind::Unknown, ""),
    }
}

/// Parse a 14-digit `YYYYMMDDHHMMSS` UTC timestamp as used by MDTM,
/// MFMT and the MLSx `modify` fact; fractional seconds are ignored
pub(crate) fn parse_mlsx_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let base = value.get(..14).unwrap_or(value);
    NaiveDateTime::parse_from_str(base, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}
