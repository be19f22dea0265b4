//! crates/learnlingo_core/src/catalog.rs
//!
//! Key ordering, page trimming and merge rules shared by every catalog adapter
//! and by the listing controller.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::{CatalogPage, Tutor, TutorId};

/// Orders keys the way the hosted database does under `orderByKey`:
/// integer keys first (numerically), then every other key lexicographically.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// A key counts as an integer when it is an optional `-`, any leading zeros,
/// at most ten more digits, and fits in 32 bits. `+5` or `1e3` do not.
fn integer_key(key: &str) -> Option<i32> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.trim_start_matches('0').len() > 10 {
        return None;
    }
    key.parse::<i64>().ok().and_then(|n| i32::try_from(n).ok())
}

/// Sorts tutors in place by their key.
pub fn sort_by_key(tutors: &mut [Tutor]) {
    tutors.sort_by(|a, b| compare_keys(&a.id, &b.id));
}

/// Key assigned to the `index`-th (zero based) tutor of a seed file.
pub fn seed_key(index: usize) -> TutorId {
    format!("teacher_{}", index + 1)
}

/// Builds a page from an over-fetched range read.
///
/// `fetched` must be the result of asking for `page_size + 1` entries in key
/// order. The extra entry, if present, only proves that more data exists and
/// is dropped.
pub fn page_from_overfetch(mut fetched: Vec<Tutor>, page_size: usize) -> CatalogPage {
    let has_more = fetched.len() > page_size;
    fetched.truncate(page_size);
    let next_cursor = fetched.last().map(|t| t.id.clone());
    CatalogPage {
        entries: fetched,
        next_cursor,
        has_more,
    }
}

/// Entries strictly after `cursor` in key order, at most `limit` of them.
///
/// `sorted` must already be in key order.
pub fn range_after<'a>(
    sorted: &'a [Tutor],
    cursor: Option<&str>,
    limit: usize,
) -> impl Iterator<Item = &'a Tutor> + 'a {
    let start = match cursor {
        Some(key) => sorted.partition_point(|t| compare_keys(&t.id, key) != Ordering::Greater),
        None => 0,
    };
    sorted[start..].iter().take(limit)
}

/// Appends `incoming` to `existing`, skipping ids already present.
///
/// Returns how many entries were actually added. Merging the same page twice
/// is a no-op, and the resulting id set does not depend on arrival order.
pub fn merge_by_id(existing: &mut Vec<Tutor>, incoming: impl IntoIterator<Item = Tutor>) -> usize {
    let mut seen: HashSet<TutorId> = existing.iter().map(|t| t.id.clone()).collect();
    let before = existing.len();
    for tutor in incoming {
        if seen.insert(tutor.id.clone()) {
            existing.push(tutor);
        }
    }
    existing.len() - before
}
