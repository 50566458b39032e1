//! Relations and functions over location tuples.
//!
//! Pairwise relations take exactly two locations and compare them by
//! `start`/`end` only. Sequence relations fold a pairwise relation over
//! consecutive locations. Span combinators build new locations out of a
//! tuple and require every location to share the same offset.

use crate::base::Loc;
use crate::error::{Error, Result};

fn pair<'a>(relation: &'static str, locs: &'a [Loc]) -> Result<(&'a Loc, &'a Loc)> {
    match locs {
        [first, second] => Ok((first, second)),
        _ => Err(Error::Arity {
            relation,
            expected: "2",
            got: locs.len(),
        }),
    }
}

pub fn before(locs: &[Loc]) -> Result<bool> {
    pair("before", locs).map(|(a, b)| a.before(b))
}

pub fn meets(locs: &[Loc]) -> Result<bool> {
    pair("meets", locs).map(|(a, b)| a.meets(b))
}

pub fn overlaps(locs: &[Loc]) -> Result<bool> {
    pair("overlaps", locs).map(|(a, b)| a.overlaps(b))
}

pub fn starts(locs: &[Loc]) -> Result<bool> {
    pair("starts", locs).map(|(a, b)| a.starts(b))
}

pub fn during(locs: &[Loc]) -> Result<bool> {
    pair("during", locs).map(|(a, b)| a.during(b))
}

pub fn finishes(locs: &[Loc]) -> Result<bool> {
    pair("finishes", locs).map(|(a, b)| a.finishes(b))
}

pub fn equal(locs: &[Loc]) -> Result<bool> {
    pair("equal", locs).map(|(a, b)| a.equals(b))
}

/// First location is a subset of, or equal to, the second.
pub fn subinterval(locs: &[Loc]) -> Result<bool> {
    pair("subinterval", locs).map(|(a, b)| a.subinterval(b))
}

pub fn intersects(locs: &[Loc]) -> Result<bool> {
    pair("intersects", locs).map(|(a, b)| a.intersects(b))
}

pub fn disjoint(locs: &[Loc]) -> Result<bool> {
    pair("disjoint", locs).map(|(a, b)| a.disjoint(b))
}

pub fn begins(locs: &[Loc]) -> Result<bool> {
    pair("begins", locs).map(|(a, b)| a.begins(b))
}

pub fn intersect_len(locs: &[Loc]) -> Result<usize> {
    pair("intersect_len", locs).map(|(a, b)| a.intersect_len(b))
}

pub fn seq_meets(locs: &[Loc]) -> bool {
    locs.windows(2).all(|w| w[0].meets(&w[1]))
}

pub fn seq_before(locs: &[Loc]) -> bool {
    locs.windows(2).all(|w| w[0].before(&w[1]))
}

/// `seq_before` where each gap between consecutive locations is at most
/// `max_gap` characters.
pub fn seq_before_within(locs: &[Loc], max_gap: usize) -> bool {
    locs.windows(2)
        .all(|w| w[0].before(&w[1]) && w[1].start() - w[0].end() <= max_gap)
}

pub fn seq_before_meets(locs: &[Loc]) -> bool {
    locs.windows(2)
        .all(|w| w[0].before(&w[1]) || w[0].meets(&w[1]))
}

pub fn first(locs: &[Loc]) -> Option<Loc> {
    locs.first().copied()
}

pub fn last(locs: &[Loc]) -> Option<Loc> {
    locs.last().copied()
}

fn same_offset(code: u32, operation: &'static str, locs: &[Loc]) -> Result<usize> {
    let offset = locs.first().map_or(0, Loc::offset);
    if locs.iter().any(|loc| loc.offset() != offset) {
        return Err(Error::OffsetMismatch { code, operation });
    }
    Ok(offset)
}

fn ends<'a>(operation: &'static str, locs: &'a [Loc]) -> Result<(&'a Loc, &'a Loc)> {
    match locs {
        [first, .., last] => Ok((first, last)),
        _ => Err(Error::Arity {
            relation: operation,
            expected: "2..n",
            got: locs.len(),
        }),
    }
}

fn span(start: usize, end: usize, offset: usize) -> Result<Loc> {
    Loc::new(start, end, offset)
}

/// From the start of the first location to the end of the last.
pub fn closed_span(locs: &[Loc]) -> Result<Loc> {
    let (first, last) = ends("closed_span", locs)?;
    let offset = same_offset(110301, "closed_span", locs)?;
    span(first.start(), last.end(), offset)
}

/// From the start of the first location to the start of the last.
pub fn open_right_span(locs: &[Loc]) -> Result<Loc> {
    let (first, last) = ends("open_right_span", locs)?;
    let offset = same_offset(110302, "open_right_span", locs)?;
    span(first.start(), last.start(), offset)
}

/// From the end of the first location to the end of the last.
pub fn open_left_span(locs: &[Loc]) -> Result<Loc> {
    let (first, last) = ends("open_left_span", locs)?;
    let offset = same_offset(110303, "open_left_span", locs)?;
    span(first.end(), last.end(), offset)
}

/// From the end of the first location to the start of the last.
pub fn open_span(locs: &[Loc]) -> Result<Loc> {
    let (first, last) = ends("open_span", locs)?;
    let offset = same_offset(110304, "open_span", locs)?;
    span(first.end(), last.start(), offset)
}

/// The n-1 gaps between consecutive locations of an n-tuple.
pub fn in_between(locs: &[Loc]) -> Result<Vec<Loc>> {
    let offset = same_offset(110305, "in_between", locs)?;
    locs.windows(2)
        .map(|w| span(w[0].end(), w[1].start(), offset))
        .collect()
}

/// Relations the query language knows without registration.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BuiltinRelation {
    Before,
    Meets,
    Overlaps,
    Starts,
    During,
    Finishes,
    Equal,
    Subinterval,
    Intersects,
    Disjoint,
    SeqBefore,
    SeqMeets,
    SeqBeforeMeets,
}

impl BuiltinRelation {
    pub const ALL: [BuiltinRelation; 13] = [
        BuiltinRelation::Before,
        BuiltinRelation::Meets,
        BuiltinRelation::Overlaps,
        BuiltinRelation::Starts,
        BuiltinRelation::During,
        BuiltinRelation::Finishes,
        BuiltinRelation::Equal,
        BuiltinRelation::Subinterval,
        BuiltinRelation::Intersects,
        BuiltinRelation::Disjoint,
        BuiltinRelation::SeqBefore,
        BuiltinRelation::SeqMeets,
        BuiltinRelation::SeqBeforeMeets,
    ];

    pub fn from_name(name: &str) -> Option<BuiltinRelation> {
        BuiltinRelation::ALL
            .iter()
            .copied()
            .find(|relation| relation.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinRelation::Before => "before",
            BuiltinRelation::Meets => "meets",
            BuiltinRelation::Overlaps => "overlaps",
            BuiltinRelation::Starts => "starts",
            BuiltinRelation::During => "during",
            BuiltinRelation::Finishes => "finishes",
            BuiltinRelation::Equal => "equal",
            BuiltinRelation::Subinterval => "subinterval",
            BuiltinRelation::Intersects => "intersects",
            BuiltinRelation::Disjoint => "disjoint",
            BuiltinRelation::SeqBefore => "seq_before",
            BuiltinRelation::SeqMeets => "seq_meets",
            BuiltinRelation::SeqBeforeMeets => "seq_before_meets",
        }
    }

    /// `None` for the sequence relations, which take any number of locations.
    pub fn arity(self) -> Option<usize> {
        match self {
            BuiltinRelation::SeqBefore
            | BuiltinRelation::SeqMeets
            | BuiltinRelation::SeqBeforeMeets => None,
            _ => Some(2),
        }
    }

    pub fn check_arity(self, got: usize) -> Result<()> {
        match self.arity() {
            Some(n) if n != got => Err(Error::Arity {
                relation: self.name(),
                expected: "2",
                got,
            }),
            None if got == 0 => Err(Error::Arity {
                relation: self.name(),
                expected: "1..n",
                got,
            }),
            _ => Ok(()),
        }
    }

    /// Pairwise relations answer false for anything but a pair.
    pub fn holds(self, locs: &[Loc]) -> bool {
        let (a, b) = match (self.arity(), locs) {
            (None, _) => {
                return match self {
                    BuiltinRelation::SeqBefore => seq_before(locs),
                    BuiltinRelation::SeqMeets => seq_meets(locs),
                    _ => seq_before_meets(locs),
                }
            }
            (Some(_), [a, b]) => (a, b),
            (Some(_), _) => return false,
        };
        match self {
            BuiltinRelation::Before => a.before(b),
            BuiltinRelation::Meets => a.meets(b),
            BuiltinRelation::Overlaps => a.overlaps(b),
            BuiltinRelation::Starts => a.starts(b),
            BuiltinRelation::During => a.during(b),
            BuiltinRelation::Finishes => a.finishes(b),
            BuiltinRelation::Equal => a.equals(b),
            BuiltinRelation::Subinterval => a.subinterval(b),
            BuiltinRelation::Intersects => a.intersects(b),
            BuiltinRelation::Disjoint => a.disjoint(b),
            BuiltinRelation::SeqBefore
            | BuiltinRelation::SeqMeets
            | BuiltinRelation::SeqBeforeMeets => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(start: usize, end: usize) -> Loc {
        Loc::new(start, end, 0).unwrap()
    }

    #[test]
    fn pairwise_relations_require_two_locations() {
        assert!(before(&[loc(0, 1), loc(2, 3)]).unwrap());
        let err = before(&[loc(0, 1)]).unwrap_err();
        assert_eq!(err.code(), 110306);
        assert!(subinterval(&[loc(0, 1), loc(0, 1), loc(0, 1)]).is_err());
    }

    #[test]
    fn sequence_relations() {
        assert!(seq_before(&[loc(0, 1), loc(2, 3), loc(4, 5)]));
        assert!(!seq_before(&[loc(0, 1), loc(2, 3), loc(1, 5)]));
        assert!(seq_meets(&[loc(0, 1), loc(1, 3), loc(3, 5)]));
        assert!(seq_before_meets(&[loc(0, 1), loc(1, 3), loc(4, 5)]));
        assert!(!seq_before_meets(&[loc(0, 2), loc(1, 3)]));
    }

    #[test]
    fn bounded_gaps() {
        let locs = [loc(0, 1), loc(3, 4), loc(9, 10)];
        assert!(seq_before_within(&locs, 5));
        assert!(!seq_before_within(&locs, 4));
    }

    #[test]
    fn spans() {
        let locs = [loc(2, 4), loc(7, 9)];
        assert_eq!(closed_span(&locs).unwrap(), loc(2, 9));
        assert_eq!(open_right_span(&locs).unwrap(), loc(2, 7));
        assert_eq!(open_left_span(&locs).unwrap(), loc(4, 9));
        assert_eq!(open_span(&locs).unwrap(), loc(4, 7));
        assert_eq!(
            in_between(&[loc(0, 1), loc(3, 4), loc(6, 8)]).unwrap(),
            vec![loc(1, 3), loc(4, 6)]
        );
        assert!(closed_span(&[loc(2, 4)]).is_err());
    }

    #[test]
    fn spans_reject_mixed_offsets() {
        let locs = [loc(2, 4), Loc::new(7, 9, 1).unwrap()];
        assert_eq!(closed_span(&locs).unwrap_err().code(), 110301);
        assert_eq!(open_right_span(&locs).unwrap_err().code(), 110302);
        assert_eq!(open_left_span(&locs).unwrap_err().code(), 110303);
        assert_eq!(open_span(&locs).unwrap_err().code(), 110304);
        assert_eq!(in_between(&locs).unwrap_err().code(), 110305);
    }

    #[test]
    fn open_span_of_overlapping_pair_is_malformed() {
        assert_eq!(open_span(&[loc(0, 5), loc(3, 9)]).unwrap_err().code(), 110203);
    }

    #[test]
    fn builtin_names_round_trip() {
        for relation in BuiltinRelation::ALL.iter() {
            assert_eq!(BuiltinRelation::from_name(relation.name()), Some(*relation));
        }
        assert_eq!(BuiltinRelation::from_name("dist"), None);
    }

    #[test]
    fn builtin_arity() {
        assert!(BuiltinRelation::Before.check_arity(2).is_ok());
        assert!(BuiltinRelation::Before.check_arity(3).is_err());
        assert!(BuiltinRelation::SeqBefore.check_arity(4).is_ok());
        assert!(BuiltinRelation::SeqBefore.check_arity(0).is_err());
        assert!(BuiltinRelation::During.holds(&[loc(2, 3), loc(1, 5)]));
        assert!(!BuiltinRelation::During.holds(&[loc(2, 3)]));
        assert!(BuiltinRelation::SeqMeets.holds(&[loc(0, 2), loc(2, 3)]));
    }
}
