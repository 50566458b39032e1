//! Boolean queries over tagged locations.
//!
//! A query names columns by their position in the list of tags it is built
//! with, e.g. `before(0, 1) and dist(1, 2) <= 3`. Executing it returns every
//! combination of locations, one per column, that satisfies the query.
//!
//! A column named more than once by the same predicate stands for distinct
//! picks from its tag: over one tag `A`, `before(0,0)` answers every pair of
//! `A` locations in text order. Each repeat adds a column to the answer,
//! after the tag columns.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::base::Loc;
use crate::error::{Error, Result, Warning};
use crate::tagger::{select_from, TagRef, Tagger};

pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod scheduler;
pub mod tree;
pub mod tuples;

use self::parser::Expr;
use self::predicate::Predicates;
use self::scheduler::Scheduler;
use self::tree::Tree;
use self::tuples::{cartesian, dedup_rows, Tuples};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Unparsed,
    Tokenized,
    Parsed,
    Flattened,
    Scheduled,
    Done,
}

pub struct Query {
    tags: Vec<TagRef>,
    text: String,
    columns: Vec<Vec<Loc>>,
    output: Vec<usize>,
    trace: bool,
    predicates: Predicates,
    state: State,
    answer: Option<Vec<Vec<Loc>>>,
}

impl Query {
    /// Locations of `tags` are read from `tagger` once, here.
    pub fn new(tags: &[TagRef], query: &str, tagger: &Tagger) -> Query {
        let columns: Vec<Vec<Loc>> = tags
            .iter()
            .map(|tag| tagger.get_locs(tag, false).into_owned())
            .collect();
        let empty: Vec<String> = tags
            .iter()
            .zip(&columns)
            .filter(|(_, locs)| locs.is_empty())
            .map(|(tag, _)| tag.to_string())
            .collect();
        if !empty.is_empty() {
            Warning::EmptyQueryTags(empty).emit();
        }
        Query {
            tags: tags.to_vec(),
            text: query.to_string(),
            columns,
            output: vec![],
            trace: false,
            predicates: Predicates::default(),
            state: State::Unparsed,
            answer: None,
        }
    }

    /// Columns of the answer, in this order. Empty means every column,
    /// repeats included.
    pub fn project(mut self, cols: &[usize]) -> Result<Query> {
        let distinct = cols.iter().collect::<HashSet<_>>().len() == cols.len();
        if !distinct || cols.iter().any(|&col| col >= self.tags.len()) {
            return Err(Error::InvalidProjection(cols.to_vec()));
        }
        if !cols.is_empty() {
            self.output = cols.to_vec();
        }
        Ok(self)
    }

    /// Log the annotated query tree after every evaluation step.
    pub fn trace(mut self, on: bool) -> Query {
        self.trace = on;
        self
    }

    /// Register a user defined predicate. It shadows a built-in relation of
    /// the same name.
    pub fn udp<F>(mut self, name: &str, function: F) -> Query
    where
        F: Fn(&[Loc]) -> bool + 'static,
    {
        self.predicates.register(name, Rc::new(function));
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn tags(&self) -> &[TagRef] {
        &self.tags
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Run the query. A query runs once; later calls return the same
    /// answer.
    pub fn execute(&mut self) -> Result<Vec<Vec<Loc>>> {
        if let Some(answer) = &self.answer {
            Warning::AlreadyExecuted(self.text.clone()).emit();
            return Ok(answer.clone());
        }

        let tokens = lexer::tokenize(&self.text)?;
        self.state = State::Tokenized;
        debug!(tokens = tokens.len(), "query tokenized");

        let expr = parser::parse(&self.text, &tokens, &self.predicates, self.tags.len())?;
        self.state = State::Parsed;

        let mut columns = self.columns.clone();
        let expr = split_repeated(expr, &mut columns);
        let tree = Tree::flatten(expr);
        self.state = State::Flattened;
        debug!(nodes = tree.len(), columns = columns.len(), "query tree flattened");

        let mut scheduler = Scheduler::new(&tree, &columns);
        scheduler.update()?;
        self.state = State::Scheduled;
        if self.trace {
            debug!("query tree\n{}", scheduler.render());
        }
        while !scheduler.is_done() {
            scheduler.step()?;
            scheduler.update()?;
            if self.trace {
                debug!("query tree\n{}", scheduler.render());
            }
        }

        let output: Vec<usize> = if self.output.is_empty() {
            (0..columns.len()).collect()
        } else {
            self.output.clone()
        };
        let answer = complete(scheduler.result(), &columns, &output)?;
        debug!(rows = answer.len(), "query done");
        self.state = State::Done;
        self.answer = Some(answer.clone());
        Ok(answer)
    }
}

/// Give every repeat of a column inside one predicate a column of its own,
/// holding the same locations.
fn split_repeated(expr: Expr, columns: &mut Vec<Vec<Loc>>) -> Expr {
    match expr {
        Expr::Leaf { predicate, params } => {
            let mut seen = HashSet::new();
            let params = params
                .into_iter()
                .map(|col| {
                    if seen.insert(col) {
                        return col;
                    }
                    let repeat = columns[col].clone();
                    columns.push(repeat);
                    columns.len() - 1
                })
                .collect();
            Expr::Leaf { predicate, params }
        }
        Expr::And(left, right) => Expr::And(
            Box::new(split_repeated(*left, columns)),
            Box::new(split_repeated(*right, columns)),
        ),
        Expr::Or(left, right) => Expr::Or(
            Box::new(split_repeated(*left, columns)),
            Box::new(split_repeated(*right, columns)),
        ),
    }
}

/// Project the final rows onto the output columns. Output columns the query
/// never constrained take every location of their tag.
fn complete(result: &[Tuples], columns: &[Vec<Loc>], output: &[usize]) -> Result<Vec<Vec<Loc>>> {
    let mut wanted = output.to_vec();
    wanted.sort_unstable();

    let mut rows = vec![];
    for tuples in result {
        let kept = tuples.project(&wanted);
        let free: Vec<usize> = wanted
            .iter()
            .filter(|col| !kept.schema.contains(col))
            .copied()
            .collect();
        let filled = if free.is_empty() {
            kept
        } else {
            let factors: Vec<&[Loc]> = free.iter().map(|&c| columns[c].as_slice()).collect();
            let any = Tuples::new(free, select_from(|_| true, &factors, |row| row.to_vec()));
            cartesian(&kept, &any)?
        };
        let order: Vec<usize> = output
            .iter()
            .filter_map(|col| filled.schema.iter().position(|c| c == col))
            .collect();
        rows.extend(
            filled
                .rows
                .iter()
                .map(|row| order.iter().map(|&i| row[i]).collect::<Vec<_>>()),
        );
    }
    Ok(dedup_rows(rows))
}
