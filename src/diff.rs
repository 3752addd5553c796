//! Unified diff rendering for change previews.
//!
//! The edit script is Myers' O(ND) shortest edit script over lines,
//! computed in linear space. Output
//! follows the usual `diff -u` layout with three lines of context. The
//! result is for humans only and is never parsed back.

use std::fmt::Write;
use std::ops::{Index, IndexMut, Range};

/// Lines of unchanged context around each change
pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Render `original` → `modified` as a unified diff with `a/<label>` and
/// `b/<label>` headers. Returns an empty string for identical input.
pub fn unified_diff(label: &str, original: &str, modified: &str) -> String {
    if original == modified {
        return String::new();
    }

    let old: Vec<&str> = original.split_inclusive('\n').collect();
    let new: Vec<&str> = modified.split_inclusive('\n').collect();
    let edits = shortest_edit(&old, &new);

    let mut out = String::new();
    let _ = writeln!(out, "--- a/{}", label);
    let _ = writeln!(out, "+++ b/{}", label);

    // Lines consumed on each side before edit `i`
    let mut positions = Vec::with_capacity(edits.len() + 1);
    let (mut o, mut n) = (0usize, 0usize);
    for edit in &edits {
        positions.push((o, n));
        match edit {
            Edit::Equal(..) => {
                o += 1;
                n += 1;
            }
            Edit::Delete(_) => o += 1,
            Edit::Insert(_) => n += 1,
        }
    }
    positions.push((o, n));

    for (start, end) in hunk_ranges(&edits, CONTEXT_LINES) {
        let slice = &edits[start..end];
        let old_count = slice
            .iter()
            .filter(|e| !matches!(e, Edit::Insert(_)))
            .count();
        let new_count = slice
            .iter()
            .filter(|e| !matches!(e, Edit::Delete(_)))
            .count();
        let (old_pos, new_pos) = positions[start];

        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            range_spec(old_pos, old_count),
            range_spec(new_pos, new_count)
        );

        for edit in slice {
            let (marker, line) = match *edit {
                Edit::Equal(i, _) => (' ', old[i]),
                Edit::Delete(i) => ('-', old[i]),
                Edit::Insert(j) => ('+', new[j]),
            };
            out.push(marker);
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push_str("\n\\ No newline at end of file\n");
            }
        }
    }

    out
}

fn range_spec(lines_before: usize, count: usize) -> String {
    match count {
        0 => format!("{},0", lines_before),
        1 => format!("{}", lines_before + 1),
        _ => format!("{},{}", lines_before + 1, count),
    }
}

/// Group edits into hunks, merging changes separated by at most
/// `2 * context` unchanged lines
fn hunk_ranges(edits: &[Edit], context: usize) -> Vec<(usize, usize)> {
    let is_equal = |i: usize| matches!(edits[i], Edit::Equal(..));
    let len = edits.len();
    let mut hunks = Vec::new();
    let mut i = 0;

    while i < len {
        if is_equal(i) {
            i += 1;
            continue;
        }

        let start = i.saturating_sub(context);
        let mut end = i;
        loop {
            while end < len && !is_equal(end) {
                end += 1;
            }
            let mut run = 0;
            while end + run < len && is_equal(end + run) {
                run += 1;
            }
            if end + run < len && run <= 2 * context {
                end += run;
                continue;
            }
            end += run.min(context);
            break;
        }

        hunks.push((start, end));
        i = end;
    }

    hunks
}

/// Signed-index view over the furthest-reaching x per diagonal `k`
struct Diagonals {
    offset: isize,
    v: Vec<usize>,
}

impl Diagonals {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize + 1,
            v: vec![0; 2 * max_d + 3],
        }
    }
}

impl Index<isize> for Diagonals {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for Diagonals {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn max_d(n: usize, m: usize) -> usize {
    (n + m + 1) / 2 + 1
}

/// Minimal edit script using the linear-space variant: split on the
/// middle snake and recurse, keeping only two diagonal vectors alive.
fn shortest_edit(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let d = max_d(a.len(), b.len());
    let mut forward = Diagonals::new(d);
    let mut backward = Diagonals::new(d);
    let mut edits = Vec::with_capacity(a.len().max(b.len()));
    conquer(
        a,
        0..a.len(),
        b,
        0..b.len(),
        &mut forward,
        &mut backward,
        &mut edits,
    );
    edits
}

fn conquer(
    a: &[&str],
    mut old: Range<usize>,
    b: &[&str],
    mut new: Range<usize>,
    forward: &mut Diagonals,
    backward: &mut Diagonals,
    edits: &mut Vec<Edit>,
) {
    let prefix = common_prefix(&a[old.clone()], &b[new.clone()]);
    edits.extend((0..prefix).map(|i| Edit::Equal(old.start + i, new.start + i)));
    old.start += prefix;
    new.start += prefix;

    let suffix = common_suffix(&a[old.clone()], &b[new.clone()]);
    old.end -= suffix;
    new.end -= suffix;
    let tail = (old.end, new.end);

    if old.is_empty() {
        edits.extend(new.clone().map(Edit::Insert));
    } else if new.is_empty() {
        edits.extend(old.clone().map(Edit::Delete));
    } else if let Some((x, y)) = middle_snake(a, old.clone(), b, new.clone(), forward, backward) {
        conquer(a, old.start..x, b, new.start..y, forward, backward, edits);
        conquer(a, x..old.end, b, y..new.end, forward, backward, edits);
    } else {
        edits.extend(old.clone().map(Edit::Delete));
        edits.extend(new.clone().map(Edit::Insert));
    }

    edits.extend((0..suffix).map(|i| Edit::Equal(tail.0 + i, tail.1 + i)));
}

/// A point on some shortest path through `a[old] -> b[new]`, found where
/// the forward and backward searches first overlap
fn middle_snake(
    a: &[&str],
    old: Range<usize>,
    b: &[&str],
    new: Range<usize>,
    forward: &mut Diagonals,
    backward: &mut Diagonals,
) -> Option<(usize, usize)> {
    let n = old.len();
    let m = new.len();
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    forward[1] = 0;
    backward[1] = 0;

    for d in 0..max_d(n, m) as isize {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && forward[k - 1] < forward[k + 1]) {
                forward[k + 1]
            } else {
                forward[k - 1] + 1
            };
            let y = (x as isize - k) as usize;
            let start = (x, y);
            if x < n && y < m {
                x += common_prefix(&a[old.start + x..old.end], &b[new.start + y..new.end]);
            }
            forward[k] = x;
            if odd && (k - delta).abs() < d && forward[k] + backward[-(k - delta)] >= n {
                return Some((old.start + start.0, new.start + start.1));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && backward[k - 1] < backward[k + 1]) {
                backward[k + 1]
            } else {
                backward[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let run = common_suffix(
                    &a[old.start..old.start + n - x],
                    &b[new.start..new.start + m - y],
                );
                x += run;
                y += run;
            }
            backward[k] = x;
            if !odd && (k - delta).abs() <= d && backward[k] + forward[-(k - delta)] >= n {
                return Some((old.start + n - x, new.start + m - y));
            }
        }
    }

    None
}

fn common_prefix(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[&str], b: &[&str]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}
