//! Tests for LIST line decoding across server dialects

use chrono::Datelike;
use ftp_rs::listing::parse_line;
use ftp_rs::EntryKind;

#[test]
fn test_unix_round_trip_fields() {
    let line = "-rw-r--r--   1 owner group    12345 Jun 15 10:00 archive.tar.gz";
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.name, "archive.tar.gz");
    assert_eq!(entry.size, 12345);
    assert_eq!(entry.kind, EntryKind::File);
    assert_eq!(entry.raw, line);
}

#[test]
fn test_unix_leading_indicator_determines_kind() {
    let cases = [
        ("drwxr-xr-x 2 u g 4096 Jan  1 00:00 d", EntryKind::Dir),
        ("lrwxrwxrwx 1 u g 9 Jan  1 00:00 l -> t", EntryKind::Link),
        ("-rw-r--r-- 1 u g 1 Jan  1 00:00 f", EntryKind::File),
        ("brw-rw---- 1 u g 0 Jan  1 00:00 sda", EntryKind::File),
        ("crw-rw-rw- 1 u g 0 Jan  1 00:00 null", EntryKind::File),
        ("prw-r--r-- 1 u g 0 Jan  1 00:00 pipe", EntryKind::File),
        ("srwxrwxrwx 1 u g 0 Jan  1 00:00 sock", EntryKind::File),
    ];
    for (line, kind) in cases {
        let entry = parse_line(line).unwrap();
        assert_eq!(entry.kind, kind, "kind for {:?}", line);
    }
}

#[test]
fn test_unix_symlink_target_split() {
    let entry =
        parse_line("lrwxrwxrwx 1 u g 11 Dec 20 10:30 link -> target.txt").unwrap();
    assert_eq!(entry.name, "link");
    assert_eq!(entry.kind, EntryKind::Link);
    assert_eq!(entry.size, 11);
    assert_eq!(entry.target, "target.txt");
}

#[test]
fn test_unix_year_variant_sets_mtime() {
    let entry = parse_line("-rw-r--r-- 1 u g 5 Jul  4 1999 old.txt").unwrap();
    let modified = entry.modified.expect("year-form dates parse");
    assert_eq!(modified.year(), 1999);
    assert_eq!(modified.month(), 7);
    assert_eq!(modified.day(), 4);
}

#[test]
fn test_dos_round_trip_fields() {
    let entry = parse_line("06-15-24  03:45PM            54321 setup.exe").unwrap();
    assert_eq!(entry.name, "setup.exe");
    assert_eq!(entry.size, 54321);
    assert_eq!(entry.kind, EntryKind::File);

    let entry = parse_line("06/15/2024  03:45PM       <DIR>     backups").unwrap();
    assert_eq!(entry.name, "backups");
    assert_eq!(entry.size, 0);
    assert_eq!(entry.kind, EntryKind::Dir);
}

#[test]
fn test_eplf_round_trip_fields() {
    let entry = parse_line("+i9872342.32142,m1065184004,r,s10376,\tfile.tar.gz").unwrap();
    assert_eq!(entry.name, "file.tar.gz");
    assert_eq!(entry.size, 10376);
    assert_eq!(entry.kind, EntryKind::File);

    let entry = parse_line("+m1065184004,/,\tsubdir").unwrap();
    assert_eq!(entry.name, "subdir");
    assert_eq!(entry.kind, EntryKind::Dir);
}

#[test]
fn test_blank_lines_skipped_others_unknown() {
    assert!(parse_line("").is_none());
    assert!(parse_line(" \t ").is_none());

    let entry = parse_line("total 128").unwrap();
    assert_eq!(entry.kind, EntryKind::Unknown);
    assert_eq!(entry.raw, "total 128");
}

/// Small deterministic PRNG so the fuzz corpus is reproducible without
/// a rand dependency
fn xorshift(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

#[test]
fn test_parse_line_total_over_random_bytes() {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for _ in 0..5000 {
        let len = (xorshift(&mut state) % 200) as usize;
        let bytes: Vec<u8> = (0..len).map(|_| (xorshift(&mut state) & 0xFF) as u8).collect();
        let line = String::from_utf8_lossy(&bytes);
        // Must not panic on any input
        let _ = parse_line(&line);
    }
}

#[test]
fn test_parse_line_total_over_mutated_listings() {
    let seeds = [
        "-rw-r--r--   1 owner group 1234 Jan  1 00:00 file.txt",
        "lrwxrwxrwx 1 u g 11 Dec 20 10:30 link -> target.txt",
        "01-01-26  12:00AM       1234 file.txt",
        "+i8388621.48594,m825718503,r,s280,\tdjb.html",
    ];
    let mut state = 0xDEAD_BEEF_CAFE_F00Du64;
    for seed in seeds {
        for _ in 0..500 {
            let mut bytes = seed.as_bytes().to_vec();
            let flips = (xorshift(&mut state) % 4) + 1;
            for _ in 0..flips {
                let at = (xorshift(&mut state) as usize) % bytes.len();
                bytes[at] = (xorshift(&mut state) & 0xFF) as u8;
            }
            let line = String::from_utf8_lossy(&bytes);
            let _ = parse_line(&line);
        }
    }
}
