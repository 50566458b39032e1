//! Tagged text: a document plus a mapping from tag names to sorted
//! location lists.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::debug;

use crate::base::{expand, Loc};
use crate::error::{Error, Result, Warning};
use crate::loclist::{binary_search, merge_list};

/// A tag name, or a literal string matched against the text on demand.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TagRef {
    Name(String),
    Literal(String),
}

pub fn lit<S: Into<String>>(text: S) -> TagRef {
    TagRef::Literal(text.into())
}

impl From<&str> for TagRef {
    fn from(name: &str) -> TagRef {
        TagRef::Name(name.to_string())
    }
}

impl From<String> for TagRef {
    fn from(name: String) -> TagRef {
        TagRef::Name(name)
    }
}

impl std::fmt::Display for TagRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TagRef::Name(name) => write!(f, "{}", name),
            TagRef::Literal(text) => write!(f, "{:?}", text),
        }
    }
}

/// Column numbers of a selection that extends existing tuples with tags.
///
/// `pred` are the predicate arguments, `tuples` the columns of the existing
/// tuples and `tags` the columns contributed by tags, which must be exactly
/// `pred` minus `tuples`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectSchema {
    pub pred: Vec<usize>,
    pub tuples: Vec<usize>,
    pub tags: Vec<usize>,
}

/// Mixed radix counter over one index per factor. The last factor varies
/// fastest.
struct Odometer {
    radices: Vec<usize>,
    indices: Vec<usize>,
    exhausted: bool,
}

impl Odometer {
    fn new(radices: Vec<usize>) -> Odometer {
        let exhausted = radices.is_empty() || radices.iter().any(|&r| r == 0);
        Odometer {
            indices: vec![0; radices.len()],
            radices,
            exhausted,
        }
    }

    fn current(&self) -> Option<&[usize]> {
        if self.exhausted {
            None
        } else {
            Some(&self.indices)
        }
    }

    fn advance(&mut self) {
        for digit in (0..self.indices.len()).rev() {
            self.indices[digit] += 1;
            if self.indices[digit] < self.radices[digit] {
                return;
            }
            self.indices[digit] = 0;
        }
        self.exhausted = true;
    }
}

/// Rows of the cartesian product of `factors` that satisfy `relation`.
pub fn select_from<F, T, A>(mut relation: F, factors: &[&[Loc]], mut aggregate: A) -> Vec<T>
where
    F: FnMut(&[Loc]) -> bool,
    A: FnMut(&[Loc]) -> T,
{
    let mut odometer = Odometer::new(factors.iter().map(|f| f.len()).collect());
    let mut row = Vec::with_capacity(factors.len());
    let mut result = vec![];
    while let Some(indices) = odometer.current() {
        row.clear();
        row.extend(indices.iter().zip(factors).map(|(&i, factor)| factor[i]));
        if relation(&row) {
            result.push(aggregate(&row));
        }
        odometer.advance();
    }
    result
}

fn check_schema(schema: &SelectSchema) -> Result<Vec<usize>> {
    let distinct = |cols: &[usize]| cols.iter().collect::<BTreeSet<_>>().len() == cols.len();
    if !distinct(&schema.pred) || !distinct(&schema.tuples) || !distinct(&schema.tags) {
        return Err(Error::schema(
            110801,
            format!(
                "column numbers in schemas must not have duplicates: {:?}, {:?}, {:?}",
                schema.tuples, schema.tags, schema.pred
            ),
        ));
    }
    let derived: BTreeSet<usize> = schema
        .pred
        .iter()
        .filter(|col| !schema.tuples.contains(col))
        .copied()
        .collect();
    if derived != schema.tags.iter().copied().collect() {
        return Err(Error::schema(
            110802,
            format!("invalid column numbers for tags: {:?}", schema.tags),
        ));
    }
    let mut output: Vec<usize> = schema.tuples.iter().chain(&schema.tags).copied().collect();
    output.sort_unstable();
    Ok(output)
}

enum Source {
    Tuple(usize),
    Tag(usize),
}

fn locate(col: usize, schema: &SelectSchema) -> Source {
    match schema.tuples.iter().position(|&c| c == col) {
        Some(i) => Source::Tuple(i),
        None => Source::Tag(schema.tags.iter().position(|&c| c == col).unwrap_or(0)),
    }
}

/// Extend `tuples` with one location per tag column, keeping the rows whose
/// predicate arguments satisfy `pred`.
///
/// Returns the output columns, sorted, and the matching rows laid out in
/// that order.
pub fn select_extending_from<F>(
    mut pred: F,
    tuples: &[Vec<Loc>],
    tags: &[&[Loc]],
    schema: &SelectSchema,
) -> Result<(Vec<usize>, Vec<Vec<Loc>>)>
where
    F: FnMut(&[Loc]) -> bool,
{
    let output = check_schema(schema)?;
    if tags.len() != schema.tags.len() {
        return Err(Error::schema(
            110802,
            format!(
                "{} tag columns given for schema {:?}",
                tags.len(),
                schema.tags
            ),
        ));
    }
    let pred_sources: Vec<Source> = schema.pred.iter().map(|&c| locate(c, schema)).collect();
    let out_sources: Vec<Source> = output.iter().map(|&c| locate(c, schema)).collect();

    let mut radices = vec![tuples.len()];
    radices.extend(tags.iter().map(|t| t.len()));
    let mut odometer = Odometer::new(radices);

    let pick = |source: &Source, indices: &[usize]| match *source {
        Source::Tuple(i) => tuples[indices[0]][i],
        Source::Tag(i) => tags[i][indices[i + 1]],
    };

    let mut args = Vec::with_capacity(pred_sources.len());
    let mut rows = vec![];
    while let Some(indices) = odometer.current() {
        args.clear();
        args.extend(pred_sources.iter().map(|s| pick(s, indices)));
        if pred(&args) {
            rows.push(out_sources.iter().map(|s| pick(s, indices)).collect());
        }
        odometer.advance();
    }
    Ok((output, rows))
}

pub struct Tagger {
    text: String,
    spans: BTreeMap<String, Vec<Loc>>,
}

impl Tagger {
    pub fn new<S: Into<String>>(text: S, lower_case: bool) -> Tagger {
        let mut text = text.into();
        if lower_case {
            text.make_ascii_lowercase();
        }
        Tagger {
            text,
            spans: BTreeMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.spans.keys().map(String::as_str)
    }

    /// Tag the spans of `group` in every match of `pattern`.
    pub fn tag_re(&mut self, tag: &str, pattern: &str, group: usize, overlapped: bool) -> Result<usize> {
        if self.spans.contains_key(tag) {
            return Err(Error::DuplicateTag(tag.to_string()));
        }
        let regex = Regex::new(pattern)?;
        let mut locs = find_pattern(&regex, &self.text, group, overlapped);
        locs.sort();
        let count = locs.len();
        debug!(tag = tag, pattern = pattern, count = count, "tagged");
        self.spans.insert(tag.to_string(), locs);
        Ok(count)
    }

    /// Returns false, with a warning, when `loc` is already tagged with `tag`.
    pub fn tag_loc(&mut self, tag: &str, loc: Loc) -> bool {
        let locs = self.spans.entry(tag.to_string()).or_insert_with(Vec::new);
        match binary_search(locs, &loc) {
            Ok(_) => {
                Warning::AlreadyTagged {
                    tag: tag.to_string(),
                    at: loc.txt_order(),
                }
                .emit();
                false
            }
            Err(index) => {
                locs.insert(index, loc);
                true
            }
        }
    }

    /// Number of locations actually added.
    pub fn tag_list<'a, I>(&mut self, tag: &str, locs: I) -> usize
    where
        I: IntoIterator<Item = &'a Loc>,
    {
        let added = locs.into_iter().filter(|loc| self.tag_loc(tag, **loc)).count();
        // an empty list still defines the tag
        self.spans.entry(tag.to_string()).or_insert_with(Vec::new);
        added
    }

    /// Tag list `i` with `{prefix}_{i}`.
    pub fn tag_lists(&mut self, prefix: &str, lists: &[Vec<Loc>]) {
        for (i, list) in lists.iter().enumerate() {
            self.tag_list(&format!("{}_{}", prefix, i), list);
        }
    }

    pub fn del_tag(&mut self, tag: &str) -> Option<Vec<Loc>> {
        let removed = self.spans.remove(tag);
        if removed.is_none() {
            Warning::UnknownTagDeleted(tag.to_string()).emit();
        }
        removed
    }

    /// Locations of a tag, empty for an undefined tag, or the matches of a
    /// literal.
    pub fn get_locs(&self, tag: &TagRef, overlapped: bool) -> Cow<'_, [Loc]> {
        match tag {
            TagRef::Name(name) => match self.spans.get(name) {
                Some(locs) => Cow::Borrowed(locs.as_slice()),
                None => Cow::Owned(vec![]),
            },
            TagRef::Literal(text) => {
                // an escaped literal is always a valid pattern
                let locs = Regex::new(&regex::escape(text))
                    .map(|regex| find_pattern(&regex, &self.text, 0, overlapped))
                    .unwrap_or_default();
                Cow::Owned(locs)
            }
        }
    }

    fn defined(&self, tag: &str) -> Result<&[Loc]> {
        self.spans
            .get(tag)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingTag(tag.to_string()))
    }

    /// Re-express each location of `tag` relative to the start of the first
    /// `ref_tag` location containing it. Locations outside every `ref_tag`
    /// location are dropped.
    pub fn project(&self, tag: &str, ref_tag: &str) -> Result<Vec<Loc>> {
        let locs = self.defined(tag)?;
        let refs = self.defined(ref_tag)?;
        let mut result: Vec<Loc> = locs
            .iter()
            .filter_map(|loc| {
                refs.iter().find(|r| loc.subinterval(r)).map(|r| {
                    let offset = r.start();
                    Loc::raw(loc.start() - offset, loc.end() - offset, offset)
                })
            })
            .collect();
        result.sort();
        Ok(result)
    }

    /// Gaps from the end of a `start_tag` location to the start of an
    /// `end_tag` location that are at most `distance` long and not empty.
    pub fn between(&self, start_tag: &str, end_tag: &str, distance: usize) -> Vec<Loc> {
        let lower = self.get_locs(&start_tag.into(), false);
        let upper = self.get_locs(&end_tag.into(), false);
        let mut result = vec![];
        for loc in lower.iter() {
            let from = upper.partition_point(|u| u.start() <= loc.end());
            for u in upper[from..].iter() {
                if u.start() - loc.end() > distance {
                    break;
                }
                result.push(Loc::raw(loc.end(), u.start(), 0));
            }
        }
        result
    }

    /// Rows of the product of `tags` that satisfy `relation`.
    pub fn select<F>(&self, relation: F, tags: &[TagRef]) -> Vec<Vec<Loc>>
    where
        F: FnMut(&[Loc]) -> bool,
    {
        self.select_with(relation, tags, |row| row.to_vec())
    }

    /// `select` applying `aggregate` to every selected row.
    pub fn select_with<F, T, A>(&self, relation: F, tags: &[TagRef], aggregate: A) -> Vec<T>
    where
        F: FnMut(&[Loc]) -> bool,
        A: FnMut(&[Loc]) -> T,
    {
        let columns: Vec<Cow<'_, [Loc]>> = tags.iter().map(|t| self.get_locs(t, false)).collect();
        let factors: Vec<&[Loc]> = columns.iter().map(|c| c.as_ref()).collect();
        select_from(relation, &factors, aggregate)
    }

    /// Extend `tuples` with locations of `tags` as described by `schema`.
    pub fn select_extending<F>(
        &self,
        pred: F,
        tuples: &[Vec<Loc>],
        tags: &[TagRef],
        schema: &SelectSchema,
    ) -> Result<(Vec<usize>, Vec<Vec<Loc>>)>
    where
        F: FnMut(&[Loc]) -> bool,
    {
        let columns: Vec<Cow<'_, [Loc]>> = tags.iter().map(|t| self.get_locs(t, false)).collect();
        let factors: Vec<&[Loc]> = columns.iter().map(|c| c.as_ref()).collect();
        select_extending_from(pred, tuples, &factors, schema)
    }

    /// Rows whose first location, from `ref_tag`, contains the locations
    /// taken from `tags`.
    pub fn contains_tags(&self, ref_tag: &str, tags: &[TagRef]) -> Vec<Vec<Loc>> {
        let mut all = vec![TagRef::from(ref_tag)];
        all.extend(tags.iter().cloned());
        self.select(
            |row| row[1..].iter().all(|loc| loc.subinterval(&row[0])),
            &all,
        )
    }

    /// Text locations inside `bounds` (the whole text by default) not covered
    /// by any location of `tags`. Results have offset 0.
    pub fn not_in(&self, tags: &[TagRef], bounds: Option<(usize, usize)>) -> Result<Vec<Loc>> {
        let (lo, hi) = bounds.unwrap_or((0, self.text.len()));
        let discard: Vec<Loc> = tags
            .iter()
            .flat_map(|t| self.get_locs(t, false).iter().map(expand).collect::<Vec<_>>())
            .collect();
        let covered = merge_list(&discard, false)?;

        let mut result = vec![];
        let mut point = lo;
        for loc in covered {
            if loc.end() <= point {
                continue;
            }
            if loc.start() >= hi {
                break;
            }
            if loc.start() > point {
                result.push(Loc::raw(point, loc.start(), 0));
            }
            point = loc.end();
        }
        if point < hi {
            result.push(Loc::raw(point, hi, 0));
        }
        Ok(result)
    }

    /// First tag, in the given order, that has exactly `loc`.
    pub fn in_tag<'a>(&self, loc: &Loc, tags: &[&'a str]) -> Option<&'a str> {
        tags.iter().copied().find(|tag| {
            self.spans
                .get(*tag)
                .map_or(false, |locs| binary_search(locs, loc).is_ok())
        })
    }

    pub fn get_text_loc(&self, loc: &Loc) -> &str {
        let (start, end) = loc.txt_order();
        self.text.get(start..end).unwrap_or("")
    }

    /// Texts of `locs` in text order.
    pub fn get_text_list(&self, locs: &[Loc]) -> Vec<&str> {
        let mut absolute: Vec<Loc> = locs.iter().map(expand).collect();
        absolute.sort();
        absolute.iter().map(|loc| self.get_text_loc(loc)).collect()
    }

    pub fn get_text_tuple(&self, tuple: &[Loc]) -> Vec<&str> {
        tuple.iter().map(|loc| self.get_text_loc(loc)).collect()
    }

    pub fn get_text_tag(&self, tag: &str) -> Result<Vec<&str>> {
        Ok(self.get_text_list(self.defined(tag)?))
    }

    /// The text with every location of `tag` replaced by `replacement`.
    /// Locations past the end of the text or splitting a character are left
    /// alone.
    pub fn replace_tag(&self, tag: &str, replacement: &str) -> Result<String> {
        let absolute: Vec<Loc> = self.defined(tag)?.iter().map(expand).collect();
        let mut result = self.text.clone();
        // from the back so earlier positions stay valid
        for loc in merge_list(&absolute, false)?.iter().rev() {
            let range = loc.start()..loc.end();
            if result.get(range.clone()).is_none() {
                debug!(tag, %loc, "location outside the text, not replaced");
                continue;
            }
            result.replace_range(range, replacement);
        }
        Ok(result)
    }

    /// The text with each location of `tags` overwritten by its tag name,
    /// centered in `~` fill and cut to the location's length.
    pub fn apply_tags(&self, tags: &[&str]) -> String {
        let mut result = self.text.clone();
        for (tag, locs) in self.spans.iter().filter(|(tag, _)| tags.contains(&tag.as_str())) {
            for loc in locs {
                let (start, end) = loc.txt_order();
                if !result.is_char_boundary(start) || !result.is_char_boundary(end) {
                    continue;
                }
                let width = end - start;
                let label: String = tag.chars().take(width).collect();
                let fill = width.saturating_sub(label.len());
                let before = fill / 2;
                let painted = format!("{}{}{}", "~".repeat(before), label, "~".repeat(fill - before));
                if painted.len() == width {
                    result.replace_range(start..end, &painted);
                }
            }
        }
        result
    }
}

fn find_pattern(regex: &Regex, text: &str, group: usize, overlapped: bool) -> Vec<Loc> {
    let span = |caps: &regex::Captures| caps.get(group).map(|m| Loc::raw(m.start(), m.end(), 0));
    if !overlapped {
        return regex.captures_iter(text).filter_map(|caps| span(&caps)).collect();
    }

    // restart one character after the start of every match
    let mut locs = vec![];
    let mut at = 0;
    while at <= text.len() {
        let caps = match regex.captures_at(text, at) {
            Some(caps) => caps,
            None => break,
        };
        locs.extend(span(&caps));
        let start = caps.get(0).map_or(at, |m| m.start());
        at = match text[start..].chars().next() {
            Some(c) => start + c.len_utf8(),
            None => break,
        };
    }
    locs
}
