//! Regular expressions for common pieces of printed documents, and lookup
//! of text columns.
//!
//! Form feed (`\x0c`) separates pages. Fields are runs of words separated by
//! single spaces; two or more spaces separate fields.

use crate::base::{expand, Loc};
use crate::error::{Error, Result};
use crate::loclist::cluster;
use crate::tagger::{lit, Tagger};

/// Page contents in group 1.
pub const PAGE: &str = r"([^\x0c]*)($|^|\x0c)";
/// Line contents in group 1.
pub const LINE: &str = r"([^\n\x0c]*)(\n|$|^|\x0c)";
pub const WORD: &str = r"[^\n\x0c ]+";
/// Field in group 2. Tag it overlapped so adjacent fields share delimiters.
pub const FIELD: &str = r"(\n|^|$|\x0c| )(([^\n\x0c ]+ )*[^\n\x0c ]+)";
/// Single word field in group 2.
pub const ALT_FIELD: &str = r"(\n|^|$|\x0c| )([^\n\x0c ]+)";
pub const INT: &str = r"[0-9,]+";
/// Decimal number with thousands separators.
pub const DECIMAL: &str = r"[0-9,]+(\.[0-9]*)?";

/// `mm/dd/yy`, `dd-mm-yyyy` or `tuesday, march 3, 2020` (lower case).
pub const DATE: &str = concat!(
    r"(((0|1)?\d[/\-][0-3]?\d[/\-]((19)|(20))?\d{2})",
    r"|([0-3]?\d[/\-](0|1)?\d[/\-]((19)|(20))?\d{2})",
    r"|((sunday|monday|tuesday|wednesday|thursday|friday|saturday",
    r"|sun|mon|tue|wed|thu|fri|sat),? +",
    r"(january|february|march|april|may|june|july|august|september|october|november|december",
    r"|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec) +",
    r"[0-3]?\d,? +((19)|(20))?\d{2}))",
);

/// `hh:mm[:ss] [am|pm] [(gmt+hh:mm)]` (lower case).
pub const TIME: &str =
    r"[0-2]?\d:[0-5]?\d(:[0-5]?\d)? *((am)|(pm))? *(\(?gmt[-+][0-2]?\d:[0-5]?\d\)?)?";

pub const EMAIL: &str = r"([A-Za-z0-9._%+=-]+@[A-Za-z0-9.-]+(\.[A-Za-z]{2,4}){1,2})";

/// Absolute locations of the fields in the one column of `text` that
/// contains `needle`.
///
/// Fields are projected onto their lines and clustered by horizontal
/// position, so a column is a set of fields that overlap once every line is
/// aligned at its start.
pub fn column_containing(text: &str, needle: &str) -> Result<Vec<Loc>> {
    let mut tagger = Tagger::new(text, false);
    tagger.tag_re("field", FIELD, 2, true)?;
    tagger.tag_re("line", LINE, 1, false)?;
    let projected = tagger.project("field", "line")?;
    let refs = tagger.get_locs(&lit(needle), false);

    let columns: Vec<Vec<Loc>> = cluster(&projected)
        .iter()
        .map(|column| {
            let mut column: Vec<Loc> = column.iter().map(expand).collect();
            column.sort();
            column
        })
        .collect();

    let mut found = columns
        .into_iter()
        .filter(|column| refs.iter().any(|r| column.iter().any(|c| r.subinterval(c))))
        .collect::<Vec<_>>();
    if found.len() != 1 {
        return Err(Error::AmbiguousColumn {
            needle: needle.to_string(),
            found: found.len(),
        });
    }
    Ok(found.remove(0))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use regex::Regex;

    use super::*;

    const TABLE: &str = indoc! {"
        item  count
        apple  3
        peach  13
    "};

    fn loc(start: usize, end: usize) -> Loc {
        Loc::new(start, end, 0).unwrap()
    }

    #[test]
    fn patterns_compile() {
        for pattern in &[PAGE, LINE, WORD, FIELD, ALT_FIELD, INT, DECIMAL, DATE, TIME, EMAIL] {
            assert!(Regex::new(pattern).is_ok(), "{}", pattern);
        }
    }

    #[test]
    fn recognizes_values() {
        let is = |pattern: &str, text: &str| {
            Regex::new(pattern)
                .unwrap()
                .find(text)
                .map(|m| m.as_str().to_string())
        };
        assert_eq!(is(DECIMAL, "total 1,234.50 usd").as_deref(), Some("1,234.50"));
        assert_eq!(is(DATE, "due 12/31/2020").as_deref(), Some("12/31/2020"));
        assert_eq!(
            is(DATE, "on tuesday, march 3, 2020.").as_deref(),
            Some("tuesday, march 3, 2020")
        );
        assert_eq!(is(TIME, "at 10:30 pm").as_deref(), Some("10:30 pm"));
        assert_eq!(is(EMAIL, "mail ann@example.org now").as_deref(), Some("ann@example.org"));
    }

    #[test]
    fn finds_column_of_needle() {
        let column = column_containing(TABLE, "13").unwrap();
        assert_eq!(column, vec![loc(6, 11), loc(19, 20), loc(28, 30)]);
        let column = column_containing(TABLE, "apple").unwrap();
        assert_eq!(column, vec![loc(0, 4), loc(12, 17), loc(21, 26)]);
    }

    #[test]
    fn needle_must_be_in_one_column() {
        let err = column_containing(TABLE, "c").unwrap_err();
        assert!(matches!(err, Error::AmbiguousColumn { found: 2, .. }));
        assert_eq!(err.code(), 110501);
        let err = column_containing(TABLE, "pear").unwrap_err();
        assert!(matches!(err, Error::AmbiguousColumn { found: 0, .. }));
    }
}
