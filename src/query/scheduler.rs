use std::collections::BTreeSet;

use bit_set::BitSet;
use tracing::trace;

use crate::base::Loc;
use crate::error::{Error, Result};
use crate::query::tree::{Leaf, NodeKind, Tree};
use crate::query::tuples::{cartesian, join_results, merge_results, Tuples};
use crate::tagger::{select_extending_from, select_from, SelectSchema};

/// Execution state of a query tree.
///
/// Leaves are evaluated cheapest first. A leaf below a conjunction that
/// already holds rows is evaluated against those rows only, so every
/// evaluation narrows the work left for its siblings.
pub struct Scheduler<'q> {
    tree: &'q Tree,
    columns: &'q [Vec<Loc>],
    results: Vec<Vec<Tuples>>,
    estimates: Vec<Option<usize>>,
    done: BitSet,
    /// `(estimate, leaf)` of leaves still to compute. Ties go to the leaf
    /// found first in depth first order.
    pending: BTreeSet<(usize, usize)>,
}

impl<'q> Scheduler<'q> {
    pub fn new(tree: &'q Tree, columns: &'q [Vec<Loc>]) -> Scheduler<'q> {
        Scheduler {
            tree,
            columns,
            results: vec![vec![]; tree.len()],
            estimates: vec![None; tree.len()],
            done: BitSet::with_capacity(tree.len()),
            pending: BTreeSet::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.contains(self.tree.root())
    }

    pub fn result(&self) -> &[Tuples] {
        &self.results[self.tree.root()]
    }

    fn factors(&self, cols: &[usize]) -> Vec<&'q [Loc]> {
        let columns = self.columns;
        cols.iter().map(|&c| columns[c].as_slice()).collect()
    }

    /// Nearest conjunction above `id` that already holds rows.
    fn bound_ancestor(&self, id: usize) -> Option<usize> {
        let mut at = self.tree.node(id).parent;
        while let Some(parent) = at {
            if self.tree.node(parent).is_and() && !self.results[parent].is_empty() {
                return Some(parent);
            }
            at = self.tree.node(parent).parent;
        }
        None
    }

    /// Rows a leaf has to look at: the product of its column sizes, or, for
    /// each bound schema, the bound rows times the sizes of the columns the
    /// leaf adds.
    fn estimate(&self, leaf: &Leaf, bound: Option<usize>) -> usize {
        match bound {
            None => self.size(leaf.columns.iter()),
            Some(node) => self.results[node].iter().fold(0usize, |total, prior| {
                let extra = leaf.columns.iter().filter(|c| !prior.schema.contains(c));
                let base = if leaf.columns.iter().all(|c| !prior.schema.contains(c)) {
                    1
                } else {
                    prior.len()
                };
                total.saturating_add(base.saturating_mul(self.size(extra)))
            }),
        }
    }

    fn size<'a>(&self, cols: impl Iterator<Item = &'a usize>) -> usize {
        cols.fold(1usize, |acc, &c| acc.saturating_mul(self.columns[c].len()))
    }

    /// Re-estimate pending leaves and fold finished children into their
    /// parents, bottom up.
    pub fn update(&mut self) -> Result<()> {
        self.visit(self.tree.root(), None)
    }

    fn visit(&mut self, id: usize, bound: Option<usize>) -> Result<()> {
        if self.done.contains(id) {
            return Ok(());
        }
        let tree = self.tree;
        let node = tree.node(id);
        if let NodeKind::Leaf(leaf) = &node.kind {
            let estimate = self.estimate(leaf, bound);
            if let Some(previous) = self.estimates[id].replace(estimate) {
                self.pending.remove(&(previous, id));
            }
            self.pending.insert((estimate, id));
            return Ok(());
        }

        let bound = if node.is_and() && !self.results[id].is_empty() {
            Some(id)
        } else {
            bound
        };
        for &child in &node.children {
            self.visit(child, bound)?;
        }
        if node.children.iter().all(|&c| self.done.contains(c)) {
            self.done.insert(id);
            trace!(node = id, "inner node done");
            if let Some(parent) = node.parent {
                let result = self.results[id].clone();
                self.absorb(parent, result)?;
            }
        }
        Ok(())
    }

    /// Fold the result of a finished inner node into its parent.
    fn absorb(&mut self, parent: usize, result: Vec<Tuples>) -> Result<()> {
        if !self.tree.node(parent).is_and() {
            merge_results(&mut self.results[parent], result);
        } else if self.results[parent].is_empty() {
            self.results[parent] = result;
        } else if result.is_empty() {
            return Err(Error::EmptyConjunction);
        } else {
            self.results[parent] = join_results(&self.results[parent], &result)?;
        }
        Ok(())
    }

    /// Compute the pending leaf with the lowest estimate.
    pub fn step(&mut self) -> Result<()> {
        let (estimate, id) = match self.pending.iter().next() {
            Some(&first) => first,
            None => return Err(Error::Scheduler("no pending leaf to compute".to_string())),
        };
        self.pending.remove(&(estimate, id));
        let tree = self.tree;
        let leaf = tree
            .node(id)
            .leaf()
            .ok_or_else(|| Error::Scheduler(format!("node {} is not a leaf", id)))?;
        let bound = self.bound_ancestor(id);
        trace!(leaf = id, estimate, bound = ?bound, "computing leaf");

        let (delivered, own) = self.evaluate(leaf, bound)?;
        self.done.insert(id);
        self.estimates[id] = Some(own.len());
        self.results[id] = vec![own];
        match tree.node(id).parent {
            // rows bound by the conjunction were the input, so they are replaced
            Some(parent) if tree.node(parent).is_and() => self.results[parent] = delivered,
            Some(parent) => merge_results(&mut self.results[parent], delivered),
            None => {}
        }
        Ok(())
    }

    /// Rows to hand to the parent, and the leaf's own rows.
    fn evaluate(&self, leaf: &Leaf, bound: Option<usize>) -> Result<(Vec<Tuples>, Tuples)> {
        let holds = |row: &[Loc]| leaf.holds(row);
        let select_own = || {
            let rows = select_from(holds, &self.factors(&leaf.columns), |row| row.to_vec());
            Tuples::new(leaf.columns.clone(), rows)
        };
        let bound = match bound {
            None => {
                let own = select_own();
                return Ok((vec![own.clone()], own));
            }
            Some(node) => node,
        };

        let mut own_rows: Option<Tuples> = None;
        let mut delivered = vec![];
        for prior in &self.results[bound] {
            let tags: Vec<usize> = leaf
                .columns
                .iter()
                .filter(|c| !prior.schema.contains(c))
                .copied()
                .collect();
            let extended = if tags.len() == leaf.columns.len() {
                let own = own_rows.get_or_insert_with(select_own);
                cartesian(prior, own)?
            } else {
                let schema = SelectSchema {
                    pred: leaf.columns.clone(),
                    tuples: prior.schema.clone(),
                    tags: tags.clone(),
                };
                let (schema, rows) =
                    select_extending_from(holds, &prior.rows, &self.factors(&tags), &schema)?;
                Tuples::new(schema, rows)
            };
            merge_results(&mut delivered, vec![extended.dedup()]);
        }

        let mut own = Tuples::new(leaf.columns.clone(), vec![]);
        for tuples in &delivered {
            own.rows.extend(tuples.project(&leaf.columns).rows);
        }
        Ok((delivered, own.dedup()))
    }

    /// The tree with per node results, estimates and completion.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for id in 0..self.tree.len() {
            let node = self.tree.node(id);
            let prefix = "---".repeat(self.tree.depth(id));
            let label = match &node.kind {
                NodeKind::Leaf(leaf) => format!("{}{:?}", leaf.predicate, leaf.params),
                NodeKind::And => "and".to_string(),
                NodeKind::Or => "or".to_string(),
            };
            out.push_str(&format!("{}{}\n", prefix, label));
            for tuples in &self.results[id] {
                out.push_str(&format!(
                    "{}schema: {:?}, {} tuples\n",
                    prefix,
                    tuples.schema,
                    tuples.len()
                ));
            }
            if self.done.contains(id) {
                out.push_str(&format!("{}done\n", prefix));
            } else if let Some(estimate) = self.estimates[id] {
                out.push_str(&format!("{}estimate {} tuples\n", prefix, estimate));
            }
        }
        out
    }
}
