//! Directory listing bodies to `Entry` rows.
//!
//! MLSD fact lines (RFC 3659) are preferred when the server offers them;
//! otherwise `LIST` output is read as `ls -l` style or as the IIS/DOS
//! style. Lines matching neither (`total 12` headers and similar noise)
//! are dropped.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use filedeck_core::normalize::{
    kind_from_type_char, permissions_from_octal, permissions_from_symbolic,
};
use filedeck_core::{Entry, EntryKind};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref UNIX_RE: Regex = Regex::new(
        r"(?x)
        ^([dlcbps-][rwxsStT-]{9})[.+@]?\s+   # permissions (+ ACL marker)
        (\d+)\s+                             # link count
        (\S+)\s+                             # owner
        (?:(\S+)\s+)?                        # group
        (\d+)\s+                             # size
        (\w{3}\s+\d{1,2}\s+[\d:]+)\s+        # date
        (.+)$                                # filename (possibly with -> target)
        ",
    )
    .expect("valid unix listing pattern");
    static ref WINDOWS_RE: Regex = Regex::new(
        r"(?x)
        ^(\d{2}-\d{2}-\d{2,4})\s+            # date
        (\d{1,2}:\d{2}\s*(?:AM|PM)?)\s+      # time
        (<DIR>|\d+)\s+                       # size or <DIR>
        (.+)$                                # filename
        ",
    )
    .expect("valid windows listing pattern");
}

/// Every recognisable row of a listing body, self/parent links excluded.
pub fn parse_listing(raw: &str) -> Vec<Entry> {
    raw.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_line)
        .filter(|e| e.name != "." && e.name != "..")
        .collect()
}

/// One row, trying MLSD facts first.
pub fn parse_line(line: &str) -> Option<Entry> {
    if line.contains(';') && line.contains('=') {
        if let Some(e) = parse_mlsd(line.trim_start()) {
            return Some(e);
        }
    }
    let line = line.trim();
    parse_unix(line).or_else(|| parse_windows(line))
}

// ─── MLSD parser ─────────────────────────────────────────────────────

/// Parse an MLSD fact line: `fact1=val1;fact2=val2; filename`.
fn parse_mlsd(line: &str) -> Option<Entry> {
    // The name follows the first space; it may itself contain spaces.
    let (facts_str, name) = line.split_once(' ')?;
    if name.is_empty() {
        return None;
    }

    let facts: HashMap<String, String> = facts_str
        .split(';')
        .filter_map(|seg| seg.split_once('='))
        .map(|(k, v)| (k.trim().to_lowercase(), v.to_string()))
        .collect();
    if facts.is_empty() {
        return None;
    }

    let ty = facts.get("type").map(|s| s.to_lowercase());
    let kind = match ty.as_deref() {
        // the listed directory itself and its parent
        Some("cdir") | Some("pdir") => return None,
        Some("dir") => EntryKind::Directory,
        Some("file") => EntryKind::File,
        Some("os.unix=symlink") | Some("os.unix=slink") | Some("os.unix=link") => {
            EntryKind::SymbolicLink
        }
        _ => EntryKind::Unknown,
    };

    let size = facts
        .get("size")
        .or_else(|| facts.get("sizd"))
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let modified = facts.get("modify").and_then(|v| parse_mlsd_time(v));
    let permissions = facts
        .get("unix.mode")
        .and_then(|m| permissions_from_octal(m));

    Some(Entry::new(name, kind, size, modified, permissions))
}

/// MLSD timestamp: `YYYYMMDDHHmmSS[.fraction]`, always UTC.
pub(crate) fn parse_mlsd_time(s: &str) -> Option<DateTime<Utc>> {
    let base = s.get(..14)?;
    NaiveDateTime::parse_from_str(base, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

// ─── Unix-style parser ───────────────────────────────────────────────

/// ```text
/// drwxr-x---   3 ftp  ftp     4096 Mar 14 09:30 releases
/// -rw-r-----   1 ftp  ftp   201938 Nov  2  2023 notes.md
/// ```
fn parse_unix(line: &str) -> Option<Entry> {
    let caps = UNIX_RE.captures(line)?;

    let perms = caps.get(1)?.as_str();
    let size = caps.get(5)?.as_str().parse::<u64>().unwrap_or(0);
    let date_str = caps.get(6)?.as_str();
    let name_raw = caps.get(7)?.as_str();

    let kind = perms
        .chars()
        .next()
        .map(kind_from_type_char)
        .unwrap_or(EntryKind::Unknown);

    let name = if kind == EntryKind::SymbolicLink {
        name_raw
            .split_once(" -> ")
            .map(|(n, _)| n)
            .unwrap_or(name_raw)
    } else {
        name_raw
    };

    Some(Entry::new(
        name,
        kind,
        size,
        parse_unix_date(date_str, Utc::now()),
        permissions_from_symbolic(perms),
    ))
}

/// Parse "Jan  1 12:00" (year implied) or "Jan  1  2025". `ls` prints a
/// time instead of a year for dates within the last six months, so an
/// implied-year date in the future belongs to the previous year.
fn parse_unix_date(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normalised = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Ok(dt) = NaiveDateTime::parse_from_str(
        &format!("{} {}", now.year(), normalised),
        "%Y %b %d %H:%M",
    ) {
        let dt = Utc.from_utc_datetime(&dt);
        if dt > now + chrono::Duration::days(1) {
            return dt.with_year(now.year() - 1);
        }
        return Some(dt);
    }

    let date = NaiveDate::parse_from_str(&normalised, "%b %d %Y").ok()?;
    let dt = date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?);
    Some(Utc.from_utc_datetime(&dt))
}

// ─── Windows-style parser ────────────────────────────────────────────

/// ```text
/// 03-14-24  09:30AM       <DIR> releases
/// 11-02-23  04:15PM       201938 notes.md
/// ```
fn parse_windows(line: &str) -> Option<Entry> {
    let caps = WINDOWS_RE.captures(line)?;

    let date_str = caps.get(1)?.as_str();
    let time_str = caps.get(2)?.as_str();
    let size_or_dir = caps.get(3)?.as_str();
    let name = caps.get(4)?.as_str();

    let (kind, size) = if size_or_dir == "<DIR>" {
        (EntryKind::Directory, 0)
    } else {
        (EntryKind::File, size_or_dir.parse::<u64>().unwrap_or(0))
    };

    Some(Entry::new(
        name,
        kind,
        size,
        parse_windows_date(date_str, time_str),
        None,
    ))
}

fn parse_windows_date(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let combined = format!("{} {}", date, time.replace(' ', ""));
    ["%m-%d-%y %I:%M%p", "%m-%d-%Y %I:%M%p", "%m-%d-%y %H:%M", "%m-%d-%Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
        .map(|dt| Utc.from_utc_datetime(&dt))
}
