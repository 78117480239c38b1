//! Tests for the MLST/MLSD fact-line grammar (RFC 3659 §7)

use chrono::{Datelike, Timelike};
use ftp_rs::EntryKind;
use ftp_rs::listing::parse_mlsx_line;

#[test]
fn test_file_entry_with_standard_facts() {
    let entry =
        parse_mlsx_line("type=file;size=8192;modify=20240615120000;perm=adfrw; report.pdf")
            .unwrap();
    assert_eq!(entry.name, "report.pdf");
    assert_eq!(entry.kind, EntryKind::File);
    assert_eq!(entry.size, 8192);
    assert_eq!(entry.perm.as_deref(), Some("adfrw"));

    let modified = entry.modified.unwrap();
    assert_eq!(
        (modified.year(), modified.month(), modified.day()),
        (2024, 6, 15)
    );
    assert_eq!((modified.hour(), modified.minute()), (12, 0));
}

#[test]
fn test_dir_cdir_pdir_all_map_to_dir() {
    for value in ["dir", "cdir", "pdir", "DIR", "Cdir"] {
        let entry = parse_mlsx_line(&format!("type={}; x", value)).unwrap();
        assert_eq!(entry.kind, EntryKind::Dir, "type={}", value);
    }
}

#[test]
fn test_unknown_type_preserved_in_facts() {
    let entry = parse_mlsx_line("type=OS.vms=special; weird").unwrap();
    assert_eq!(entry.kind, EntryKind::Unknown);
    assert_eq!(
        entry.facts.get("type").map(String::as_str),
        Some("OS.vms=special")
    );
}

#[test]
fn test_fact_keys_case_insensitive_values_not() {
    let entry = parse_mlsx_line("TYPE=file;Size=77;UNIQUE=AbC123; f").unwrap();
    assert_eq!(entry.kind, EntryKind::File);
    assert_eq!(entry.size, 77);
    // Keys are folded, values keep their case
    assert_eq!(entry.facts.get("unique").map(String::as_str), Some("AbC123"));
    assert!(entry.facts.get("UNIQUE").is_none());
}

#[test]
fn test_name_runs_to_end_of_line() {
    let entry = parse_mlsx_line("type=file;size=1; name with  spaces.txt").unwrap();
    assert_eq!(entry.name, "name with  spaces.txt");
}

#[test]
fn test_missing_name_rejected() {
    assert!(parse_mlsx_line("type=file;size=1;").is_none());
    assert!(parse_mlsx_line("type=file;size=1; ").is_none());
}

#[test]
fn test_malformed_facts_skipped_not_fatal() {
    let entry = parse_mlsx_line("type=file;garbage;=nokey;size=3; ok.txt").unwrap();
    assert_eq!(entry.name, "ok.txt");
    assert_eq!(entry.size, 3);
}

#[test]
fn test_modify_fraction_and_short_values() {
    let entry = parse_mlsx_line("type=file;modify=20231220143000.999; f").unwrap();
    let modified = entry.modified.unwrap();
    assert_eq!((modified.hour(), modified.minute(), modified.second()), (14, 30, 0));

    let entry = parse_mlsx_line("type=file;modify=banana; f").unwrap();
    assert!(entry.modified.is_none());
}

#[test]
fn test_parse_total_over_garbage() {
    fn xorshift(state: &mut u64) -> u64 {
        let mut x = *state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        *state = x;
        x
    }

    let mut state = 0xFEED_FACE_0BAD_F00Du64;
    for _ in 0..3000 {
        let len = (xorshift(&mut state) % 150) as usize;
        let bytes: Vec<u8> = (0..len).map(|_| (xorshift(&mut state) & 0xFF) as u8).collect();
        let line = String::from_utf8_lossy(&bytes);
        let _ = parse_mlsx_line(&line);
    }
}
