use std::collections::HashSet;

use crate::base::Loc;
use crate::error::{Error, Result};

/// Rows of locations; `rows[r][i]` belongs to column `schema[i]`.
///
/// Schemas built by the query engine are sorted and free of duplicates.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tuples {
    pub schema: Vec<usize>,
    pub rows: Vec<Vec<Loc>>,
}

enum Side {
    Left(usize),
    Right(usize),
}

fn has_duplicates(schema: &[usize]) -> bool {
    schema.iter().collect::<HashSet<_>>().len() != schema.len()
}

fn position(schema: &[usize], col: usize) -> Option<usize> {
    schema.iter().position(|&c| c == col)
}

/// Drop repeated rows, keeping the first of each.
pub fn dedup_rows(rows: Vec<Vec<Loc>>) -> Vec<Vec<Loc>> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}

impl Tuples {
    pub fn new(schema: Vec<usize>, rows: Vec<Vec<Loc>>) -> Tuples {
        Tuples { schema, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dedup(self) -> Tuples {
        Tuples {
            schema: self.schema,
            rows: dedup_rows(self.rows),
        }
    }

    /// Keep the columns that are also in `cols`, in schema order.
    pub fn project(&self, cols: &[usize]) -> Tuples {
        let keep: Vec<usize> = (0..self.schema.len())
            .filter(|&i| cols.contains(&self.schema[i]))
            .collect();
        if keep.len() == self.schema.len() {
            return self.clone();
        }
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i]).collect())
            .collect();
        Tuples {
            schema: keep.iter().map(|&i| self.schema[i]).collect(),
            rows: dedup_rows(rows),
        }
    }
}

/// Output schema, sorted, and where each output column comes from.
fn combined_layout(left: &[usize], right: &[usize]) -> (Vec<usize>, Vec<Side>) {
    let mut schema: Vec<usize> = left.to_vec();
    schema.extend(right.iter().filter(|c| !left.contains(c)));
    schema.sort_unstable();
    let sides = schema
        .iter()
        .map(|&col| match position(left, col) {
            Some(i) => Side::Left(i),
            None => Side::Right(position(right, col).unwrap_or(0)),
        })
        .collect();
    (schema, sides)
}

fn key(row: &[Loc], index: &[usize]) -> Vec<Loc> {
    index.iter().map(|&i| row[i]).collect()
}

fn combine(sides: &[Side], left: &[Loc], right: &[Loc]) -> Vec<Loc> {
    sides
        .iter()
        .map(|side| match *side {
            Side::Left(i) => left[i],
            Side::Right(i) => right[i],
        })
        .collect()
}

/// Sort-merge join of two tuple sets on their shared columns.
pub fn natural_join(left: &Tuples, right: &Tuples) -> Result<Tuples> {
    let shared: Vec<usize> = left
        .schema
        .iter()
        .filter(|c| right.schema.contains(c))
        .copied()
        .collect();
    if shared.is_empty() {
        return Err(Error::schema(
            110601,
            format!(
                "schemas in natural join must intersect: {:?} {:?}",
                left.schema, right.schema
            ),
        ));
    }
    if has_duplicates(&left.schema) || has_duplicates(&right.schema) {
        return Err(Error::schema(
            110602,
            format!(
                "schema has duplicate column number: {:?} {:?}",
                left.schema, right.schema
            ),
        ));
    }

    let left_key: Vec<usize> = shared.iter().filter_map(|&c| position(&left.schema, c)).collect();
    let right_key: Vec<usize> = shared.iter().filter_map(|&c| position(&right.schema, c)).collect();

    let mut lefts: Vec<(Vec<Loc>, &Vec<Loc>)> =
        left.rows.iter().map(|row| (key(row, &left_key), row)).collect();
    let mut rights: Vec<(Vec<Loc>, &Vec<Loc>)> =
        right.rows.iter().map(|row| (key(row, &right_key), row)).collect();
    lefts.sort_by(|a, b| a.0.cmp(&b.0));
    rights.sort_by(|a, b| a.0.cmp(&b.0));

    let (schema, sides) = combined_layout(&left.schema, &right.schema);
    let mut rows = vec![];
    let (mut i, mut j) = (0, 0);
    while i < lefts.len() && j < rights.len() {
        match lefts[i].0.cmp(&rights[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let block = &lefts[i].0;
                let i_end = i + lefts[i..].iter().take_while(|(k, _)| k == block).count();
                let j_end = j + rights[j..].iter().take_while(|(k, _)| k == block).count();
                for (_, l) in &lefts[i..i_end] {
                    for (_, r) in &rights[j..j_end] {
                        rows.push(combine(&sides, l, r));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
    Ok(Tuples { schema, rows })
}

/// Every pairing of a left row with a right row. Schemas must be disjoint.
pub fn cartesian(left: &Tuples, right: &Tuples) -> Result<Tuples> {
    if left.schema.iter().any(|c| right.schema.contains(c)) {
        return Err(Error::schema(
            110603,
            format!(
                "schemas of cartesian product operands must be disjoint: {:?} {:?}",
                left.schema, right.schema
            ),
        ));
    }
    let (schema, sides) = combined_layout(&left.schema, &right.schema);
    let mut rows = Vec::with_capacity(left.rows.len() * right.rows.len());
    for l in &left.rows {
        for r in &right.rows {
            rows.push(combine(&sides, l, r));
        }
    }
    Ok(Tuples { schema, rows })
}

/// Union `new` into `prev` schema by schema, without repeated rows.
pub fn merge_results(prev: &mut Vec<Tuples>, new: Vec<Tuples>) {
    for tuples in new {
        match prev.iter_mut().find(|p| p.schema == tuples.schema) {
            Some(existing) => {
                let mut rows = std::mem::take(&mut existing.rows);
                rows.extend(tuples.rows);
                existing.rows = dedup_rows(rows);
            }
            None => prev.push(tuples),
        }
    }
}

/// Conjunction of two partial results: every pair of schemas is joined
/// naturally when they share columns, crossed otherwise.
pub fn join_results(prev: &[Tuples], new: &[Tuples]) -> Result<Vec<Tuples>> {
    let mut result = vec![];
    for left in prev {
        for right in new {
            let joined = if left.schema.iter().any(|c| right.schema.contains(c)) {
                natural_join(left, right)?
            } else {
                cartesian(left, right)?
            };
            merge_results(&mut result, vec![joined.dedup()]);
        }
    }
    Ok(result)
}
