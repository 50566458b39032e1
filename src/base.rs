use std::fmt;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Comparator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

impl Comparator {
    pub fn from_symbol(symbol: &str) -> Option<Comparator> {
        match symbol {
            "=" => Some(Comparator::Equal),
            "!=" => Some(Comparator::NotEqual),
            ">" => Some(Comparator::GreaterThan),
            ">=" => Some(Comparator::GreaterThanEqual),
            "<" => Some(Comparator::LessThan),
            "<=" => Some(Comparator::LessThanEqual),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::NotEqual => "!=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanEqual => ">=",
            Comparator::LessThan => "<",
            Comparator::LessThanEqual => "<=",
        }
    }

    pub fn compare(self, left: usize, right: usize) -> bool {
        match self {
            Comparator::Equal => left == right,
            Comparator::NotEqual => left != right,
            Comparator::GreaterThan => left > right,
            Comparator::GreaterThanEqual => left >= right,
            Comparator::LessThan => left < right,
            Comparator::LessThanEqual => left <= right,
        }
    }
}

/// A Closed-Open Interval `[start, end)` relative to `offset`.
///
/// Field order matters: the derived `Ord` is the `(start, end, offset)`
/// order every sorted location list in the crate relies on.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Loc {
    start: usize,
    end: usize,
    offset: usize,
}

impl Loc {
    pub fn new(start: usize, end: usize, offset: usize) -> Result<Loc> {
        if start > end {
            return Err(Error::MalformedInterval { start, end, offset });
        }
        Ok(Loc { start, end, offset })
    }

    /// Callers guarantee `start <= end`.
    pub(crate) fn raw(start: usize, end: usize, offset: usize) -> Loc {
        debug_assert!(start <= end, "invalid interval {} ({}, {})", offset, start, end);
        Loc { start, end, offset }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.start, self.end, self.offset)
    }

    /// Position with respect to the beginning of the text.
    pub fn txt_order(&self) -> (usize, usize) {
        (self.offset + self.start, self.offset + self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    // Allen's relations. Offsets are ignored.

    pub fn before(&self, other: &Loc) -> bool {
        self.end < other.start
    }

    pub fn meets(&self, other: &Loc) -> bool {
        self.end == other.start
    }

    pub fn overlaps(&self, other: &Loc) -> bool {
        self.start < other.start && other.start < self.end && self.end < other.end
    }

    pub fn starts(&self, other: &Loc) -> bool {
        self.start == other.start && self.end < other.end
    }

    pub fn during(&self, other: &Loc) -> bool {
        other.start < self.start && self.end < other.end
    }

    pub fn finishes(&self, other: &Loc) -> bool {
        other.start < self.start && self.end == other.end
    }

    pub fn equals(&self, other: &Loc) -> bool {
        self.start == other.start && self.end == other.end
    }

    pub fn subinterval(&self, other: &Loc) -> bool {
        self.starts(other) || self.during(other) || self.finishes(other) || self.equals(other)
    }

    pub fn begins(&self, other: &Loc) -> bool {
        self.starts(other) || self.equals(other)
    }

    pub fn intersects(&self, other: &Loc) -> bool {
        self.overlaps(other)
            || self.starts(other)
            || self.during(other)
            || self.finishes(other)
            || other.overlaps(self)
            || other.starts(self)
            || other.during(self)
            || other.finishes(self)
            || self.equals(other)
    }

    pub fn disjoint(&self, other: &Loc) -> bool {
        !self.intersects(other)
    }

    /// Length of the common part of both spans, 0 if they do not overlap.
    pub fn intersect_len(&self, other: &Loc) -> usize {
        let (s1, e1) = (self.start, self.end);
        let (s2, e2) = (other.start, other.end);
        if s1 < s2 && s2 < e1 {
            e1.min(e2) - s2
        } else if s2 < s1 && s1 < e2 {
            e1.min(e2) - s1
        } else if s1 == s2 {
            (e2 - s2).min(e1 - s1)
        } else {
            0
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}+[{}, {})", self.offset, self.start, self.end)
    }
}

/// Merge two locations into the smallest location covering both.
///
/// The locations must intersect or meet and must share the same offset.
pub fn merge(first: &Loc, second: &Loc) -> Result<Loc> {
    if first.end < second.start || second.end < first.start {
        return Err(Error::Unmergeable(*first, *second));
    }
    if first.offset != second.offset {
        return Err(Error::OffsetMismatch {
            code: 110201,
            operation: "merge",
        });
    }
    Ok(Loc::raw(
        first.start.min(second.start),
        first.end.max(second.end),
        first.offset,
    ))
}

/// The same span expressed in absolute text coordinates (offset 0).
pub fn expand(loc: &Loc) -> Loc {
    let (start, end) = loc.txt_order();
    Loc::raw(start, end, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(start: usize, end: usize) -> Loc {
        Loc::new(start, end, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_interval() {
        let err = Loc::new(5, 2, 0).unwrap_err();
        assert_eq!(err.code(), 110203);
        assert!(Loc::new(3, 3, 0).unwrap().is_empty());
    }

    #[test]
    fn orders_by_start_end_offset() {
        let mut locs = vec![
            Loc::new(2, 4, 1).unwrap(),
            Loc::new(2, 4, 0).unwrap(),
            Loc::new(1, 9, 7).unwrap(),
            Loc::new(2, 3, 9).unwrap(),
        ];
        locs.sort();
        let orders: Vec<_> = locs.iter().map(Loc::order).collect();
        assert_eq!(orders, vec![(1, 9, 7), (2, 3, 9), (2, 4, 0), (2, 4, 1)]);
        assert_eq!(Loc::new(2, 4, 10).unwrap().txt_order(), (12, 14));
    }

    #[test]
    fn allen_relations() {
        assert!(loc(0, 3).before(&loc(4, 7)));
        assert!(!loc(0, 3).before(&loc(3, 7)));
        assert!(loc(0, 3).meets(&loc(3, 7)));
        assert!(loc(0, 4).overlaps(&loc(3, 7)));
        assert!(loc(3, 5).starts(&loc(3, 7)));
        assert!(loc(4, 5).during(&loc(3, 7)));
        assert!(loc(4, 7).finishes(&loc(3, 7)));
        assert!(loc(3, 7).equals(&loc(3, 7)));
        assert!(loc(3, 7).subinterval(&loc(3, 7)));
        assert!(!loc(2, 7).subinterval(&loc(3, 7)));
        assert!(loc(3, 5).begins(&loc(3, 7)));
    }

    #[test]
    fn meeting_spans_do_not_intersect() {
        assert!(!loc(0, 3).intersects(&loc(3, 5)));
        assert!(loc(0, 3).disjoint(&loc(3, 5)));
        assert!(loc(4, 6).intersects(&loc(0, 10)));
    }

    #[test]
    fn intersection_length() {
        assert_eq!(loc(0, 5).intersect_len(&loc(3, 9)), 2);
        assert_eq!(loc(3, 9).intersect_len(&loc(0, 5)), 2);
        assert_eq!(loc(3, 9).intersect_len(&loc(3, 4)), 1);
        assert_eq!(loc(0, 3).intersect_len(&loc(3, 9)), 0);
    }

    #[test]
    fn merge_requires_contact_and_offset() {
        assert_eq!(merge(&loc(0, 3), &loc(3, 5)).unwrap(), loc(0, 5));
        assert_eq!(merge(&loc(0, 4), &loc(1, 2)).unwrap(), loc(0, 4));
        assert_eq!(merge(&loc(0, 3), &loc(4, 5)).unwrap_err().code(), 110202);
        let shifted = Loc::new(1, 2, 3).unwrap();
        assert_eq!(merge(&loc(0, 3), &shifted).unwrap_err().code(), 110201);
    }

    #[test]
    fn expand_to_absolute() {
        assert_eq!(expand(&Loc::new(1, 4, 10).unwrap()), loc(11, 14));
    }

    #[test]
    fn comparator_symbols() {
        for symbol in &["=", "!=", ">", ">=", "<", "<="] {
            assert_eq!(Comparator::from_symbol(symbol).unwrap().symbol(), *symbol);
        }
        assert!(Comparator::LessThanEqual.compare(2, 2));
        assert!(!Comparator::NotEqual.compare(2, 2));
        assert!(Comparator::from_symbol("=>").is_none());
    }
}
