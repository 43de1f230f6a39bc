//! Entry normalization: permission strings, kind mapping, listing order.
//!
//! Both protocols reduce permissions to owner/group/other triples; each
//! triple is rendered as `rwx`/`-` and the three are concatenated. The
//! special bits (setuid, setgid, sticky) are not part of the canonical
//! shape: an `s`/`t` in a symbolic listing still means "executable".

use crate::entry::{Entry, EntryKind};
use std::cmp::Ordering;

const TYPE_MASK: u32 = 0o170000;

// ─── Permissions ─────────────────────────────────────────────────────

/// Render the low nine mode bits as `rwxrwxrwx`.
pub fn permissions_from_mode(mode: u32) -> String {
    let mut s = String::with_capacity(9);
    for shift in [6u32, 3, 0] {
        let triple = (mode >> shift) & 0o7;
        s.push(if triple & 0o4 != 0 { 'r' } else { '-' });
        s.push(if triple & 0o2 != 0 { 'w' } else { '-' });
        s.push(if triple & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

/// Normalize an `ls -l` permission column (`-rw-r--r--`, with or without
/// the leading type character).
pub fn permissions_from_symbolic(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.chars().collect();
    let bits = match chars.len() {
        10 => &chars[1..],
        9 => &chars[..],
        _ => return None,
    };

    let mut s = String::with_capacity(9);
    for (i, c) in bits.iter().enumerate() {
        let slot = match i % 3 {
            0 => 'r',
            1 => 'w',
            _ => 'x',
        };
        let set = match (slot, c) {
            ('r', 'r') | ('w', 'w') => true,
            ('x', 'x') | ('x', 's') | ('x', 't') => true,
            (_, '-') | ('x', 'S') | ('x', 'T') => false,
            _ => return None,
        };
        s.push(if set { slot } else { '-' });
    }
    Some(s)
}

/// Normalize an octal mode string such as MLSD's `unix.mode=0644`.
pub fn permissions_from_octal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    u32::from_str_radix(trimmed, 8)
        .ok()
        .map(permissions_from_mode)
}

// ─── Kind mapping ────────────────────────────────────────────────────

/// Map the file-type bits of a POSIX mode.
pub fn kind_from_mode(mode: u32) -> EntryKind {
    match mode & TYPE_MASK {
        0o040000 => EntryKind::Directory,
        0o120000 => EntryKind::SymbolicLink,
        0o100000 => EntryKind::File,
        _ => EntryKind::Unknown,
    }
}

/// Map the first column character of an `ls -l` line.
pub fn kind_from_type_char(c: char) -> EntryKind {
    match c {
        'd' => EntryKind::Directory,
        'l' => EntryKind::SymbolicLink,
        '-' => EntryKind::File,
        _ => EntryKind::Unknown,
    }
}

// ─── Ordering ────────────────────────────────────────────────────────

/// Case-insensitive primary comparison; on a tie lower case sorts first,
/// which matches the default collation of a browser-side `localeCompare`.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Directories first, then names.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        b.is_directory()
            .cmp(&a.is_directory())
            .then_with(|| compare_names(&a.name, &b.name))
    });
}

/// Drop self/parent links, strip any path prefix a server left in a
/// name, and apply the listing order.
pub fn normalize_listing(entries: Vec<Entry>) -> Vec<Entry> {
    let mut out: Vec<Entry> = entries
        .into_iter()
        .filter_map(|mut e| {
            if let Some(pos) = e.name.rfind('/') {
                e.name = e.name[pos + 1..].to_string();
            }
            if e.name.is_empty() || e.name == "." || e.name == ".." {
                None
            } else {
                Some(e)
            }
        })
        .collect();
    sort_entries(&mut out);
    out
}
