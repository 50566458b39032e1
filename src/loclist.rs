//! Operations over lists of locations.

use std::collections::{HashMap, VecDeque};

use crate::base::{merge, Loc};
use crate::error::{Error, Result};

/// Merge intersecting locations that share an offset, and also meeting
/// ones when `merge_contiguous` is set. The result is sorted.
pub fn merge_list(locs: &[Loc], merge_contiguous: bool) -> Result<Vec<Loc>> {
    let mut sorted = locs.to_vec();
    sorted.sort();
    let mut iter = sorted.into_iter();
    let mut current = match iter.next() {
        Some(loc) => loc,
        None => return Ok(vec![]),
    };

    let mut merged = vec![];
    for loc in iter {
        if current.intersects(&loc) && current.offset() == loc.offset() {
            current = merge(&current, &loc)?;
        } else if merge_contiguous && current.meets(&loc) {
            current = merge(&current, &loc)?;
        } else {
            merged.push(current);
            current = loc;
        }
    }
    merged.push(current);
    Ok(merged)
}

fn distinct_starts(sorted: Vec<Loc>) -> Vec<Loc> {
    let mut distinct: Vec<Loc> = Vec::with_capacity(sorted.len());
    for loc in sorted {
        if distinct.last().map_or(true, |last| last.start() != loc.start()) {
            distinct.push(loc);
        }
    }
    distinct
}

/// Drop locations that are supersets of other locations.
pub fn shortest(locs: &[Loc]) -> Vec<Loc> {
    let mut sorted = locs.to_vec();
    sorted.sort();
    let candidates = distinct_starts(sorted);
    candidates
        .iter()
        .enumerate()
        .filter(|(i, loc)| !candidates[i + 1..].iter().any(|other| other.subinterval(loc)))
        .map(|(_, loc)| *loc)
        .collect()
}

/// Drop locations that are subsets of other locations.
pub fn longest(locs: &[Loc]) -> Vec<Loc> {
    let mut sorted = locs.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    let candidates = distinct_starts(sorted);
    let mut result: Vec<Loc> = candidates
        .iter()
        .enumerate()
        .filter(|(i, loc)| !candidates[i + 1..].iter().any(|other| loc.subinterval(other)))
        .map(|(_, loc)| *loc)
        .collect();
    result.sort();
    result
}

/// Search a list sorted by `Loc::order`.
///
/// `Ok(i)` when `locs[i]` equals `target`, otherwise `Err(i)` with `i` the
/// position where `target` would be inserted to keep the list sorted.
pub fn binary_search(locs: &[Loc], target: &Loc) -> std::result::Result<usize, usize> {
    let mut lo = 0;
    let mut hi = locs.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match target.cmp(&locs[mid]) {
            std::cmp::Ordering::Equal => return Ok(mid),
            std::cmp::Ordering::Less => hi = mid,
            std::cmp::Ordering::Greater => lo = mid + 1,
        }
    }
    Err(lo)
}

/// Locations of `locs` that are not in `discard`, compared exactly.
pub fn minus(locs: &[Loc], discard: &[Loc]) -> Vec<Loc> {
    if locs.is_empty() || discard.is_empty() {
        return locs.to_vec();
    }
    let mut sorted = discard.to_vec();
    sorted.sort();
    locs.iter()
        .filter(|loc| binary_search(&sorted, loc).is_err())
        .copied()
        .collect()
}

/// Remove from the locations of `locs` every part covered by `discard`.
///
/// Unlike `minus` this works on the character level: a location may lose a
/// prefix, a suffix, be split in two or vanish.
pub fn rm_intervals(locs: &[Loc], discard: &[Loc]) -> Result<Vec<Loc>> {
    let mut pending: VecDeque<Loc> = merge_list(locs, false)?.into();
    let discard = merge_list(discard, false)?;

    let mut first = 0;
    let mut result = vec![];
    while let Some(mut current) = pending.pop_front() {
        match discard[first..].iter().position(|d| current.intersects(d)) {
            Some(i) => first += i,
            None => {
                result.push(current);
                continue;
            }
        }

        let mut include = true;
        for cut in discard[first..].iter() {
            if !current.intersects(cut) {
                break;
            }
            if current.offset() != cut.offset() {
                return Err(Error::OffsetMismatch {
                    code: 110901,
                    operation: "rm_intervals",
                });
            }
            let (start, end, offset) = current.order();
            if cut.overlaps(&current) || cut.starts(&current) {
                current = Loc::raw(cut.end(), end, offset);
            } else if cut.during(&current) {
                current = Loc::raw(start, cut.start(), offset);
                pending.push_front(Loc::raw(cut.end(), end, offset));
            } else if current.overlaps(cut) || cut.finishes(&current) {
                current = Loc::raw(start, cut.start(), offset);
            } else {
                // equal, during, starts or finishes: fully covered
                include = false;
                break;
            }
        }
        if include {
            result.push(current);
        }
    }
    Ok(result)
}

/// Group a start sorted list into clusters of intersecting locations.
/// Offsets are ignored.
pub fn cluster(locs: &[Loc]) -> Vec<Vec<Loc>> {
    let mut clusters = vec![];
    let mut iter = locs.iter();
    let first = match iter.next() {
        Some(loc) => *loc,
        None => return clusters,
    };

    let (mut lo, mut hi) = (first.start(), first.end());
    let mut current = vec![first];
    for loc in iter {
        if Loc::raw(lo, hi, 0).intersects(loc) {
            lo = lo.min(loc.start());
            hi = hi.max(loc.end());
            current.push(*loc);
        } else {
            clusters.push(std::mem::replace(&mut current, vec![*loc]));
            lo = loc.start();
            hi = loc.end();
        }
    }
    clusters.push(current);
    clusters
}

/// Span of all locations, offsets ignored.
pub fn list_span(locs: &[Loc]) -> Option<Loc> {
    let start = locs.iter().map(Loc::start).min()?;
    let end = locs.iter().map(Loc::end).max()?;
    Some(Loc::raw(start, end, 0))
}

/// For each category, the members of every cluster that also belong to the
/// category. Clusters and categories are sorted by `txt_order`.
pub fn categorize(clusters: &[Vec<Loc>], categories: &[Vec<Loc>]) -> Vec<Vec<Vec<Loc>>> {
    categories
        .iter()
        .map(|category| {
            clusters
                .iter()
                .map(|cluster| {
                    let (mut cat, mut clu) = (0, 0);
                    let mut members = vec![];
                    while cat < category.len() && clu < cluster.len() {
                        let (a, b) = (cluster[clu].txt_order(), category[cat].txt_order());
                        if a == b {
                            members.push(cluster[clu]);
                            clu += 1;
                            cat += 1;
                        } else if a < b {
                            clu += 1;
                        } else {
                            cat += 1;
                        }
                    }
                    members
                })
                .collect()
        })
        .collect()
}

/// Group column `out_index` of `tuples` by the span of column `group_index`,
/// in order of first appearance.
pub fn group_by(tuples: &[Vec<Loc>], group_index: usize, out_index: usize) -> Result<Vec<Vec<Loc>>> {
    let arity = match tuples.first() {
        Some(tuple) => tuple.len(),
        None => return Ok(vec![]),
    };
    if group_index >= arity || out_index >= arity {
        return Err(Error::GroupIndex {
            group: group_index,
            out: out_index,
            max: arity.saturating_sub(1),
        });
    }

    let mut slots: HashMap<(usize, usize), usize> = HashMap::new();
    let mut groups: Vec<Vec<Loc>> = vec![];
    for tuple in tuples {
        let (key, value) = match (tuple.get(group_index), tuple.get(out_index)) {
            (Some(key), Some(value)) => ((key.start(), key.end()), *value),
            _ => continue,
        };
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(vec![]);
            groups.len() - 1
        });
        groups[slot].push(value);
    }
    Ok(groups)
}
