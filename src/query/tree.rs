use crate::base::Loc;
use crate::query::parser::Expr;
use crate::query::predicate::Predicate;

/// A predicate applied to query columns.
#[derive(Debug)]
pub struct Leaf {
    pub predicate: Predicate,
    /// Columns in argument order, as written in the query.
    pub params: Vec<usize>,
    /// Distinct columns, sorted. Rows computed by the leaf follow this schema.
    pub columns: Vec<usize>,
    arguments: Vec<usize>,
}

impl Leaf {
    pub fn new(predicate: Predicate, params: Vec<usize>) -> Leaf {
        let mut columns = params.clone();
        columns.sort_unstable();
        columns.dedup();
        let arguments = params
            .iter()
            .map(|p| columns.binary_search(p).unwrap_or(0))
            .collect();
        Leaf {
            predicate,
            params,
            columns,
            arguments,
        }
    }

    /// Evaluate on a row laid out as `columns`. A column repeated in the
    /// parameters passes the same location twice; `Query` gives repeats
    /// columns of their own before building leaves.
    pub fn holds(&self, row: &[Loc]) -> bool {
        let args: Vec<Loc> = self.arguments.iter().map(|&i| row[i]).collect();
        self.predicate.holds(&args)
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Leaf(Leaf),
    And,
    Or,
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Node {
    pub fn is_and(&self) -> bool {
        matches!(self.kind, NodeKind::And)
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// Query tree with chains of the same operator collapsed into one n-ary
/// node. Nodes are numbered in depth first order; the root is node 0.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Clone, Copy, PartialEq)]
enum Op {
    And,
    Or,
}

fn operands(expr: Expr, op: Op, out: &mut Vec<Expr>) {
    match expr {
        Expr::And(left, right) if op == Op::And => {
            operands(*left, op, out);
            operands(*right, op, out);
        }
        Expr::Or(left, right) if op == Op::Or => {
            operands(*left, op, out);
            operands(*right, op, out);
        }
        other => out.push(other),
    }
}

impl Tree {
    pub fn flatten(expr: Expr) -> Tree {
        let mut tree = Tree { nodes: vec![] };
        tree.add(expr, None);
        tree
    }

    fn add(&mut self, expr: Expr, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        let (kind, chain) = match expr {
            Expr::Leaf { predicate, params } => (NodeKind::Leaf(Leaf::new(predicate, params)), vec![]),
            and @ Expr::And(_, _) => {
                let mut chain = vec![];
                operands(and, Op::And, &mut chain);
                (NodeKind::And, chain)
            }
            or @ Expr::Or(_, _) => {
                let mut chain = vec![];
                operands(or, Op::Or, &mut chain);
                (NodeKind::Or, chain)
            }
        };
        self.nodes.push(Node {
            kind,
            parent,
            children: vec![],
        });
        for operand in chain {
            let child = self.add(operand, Some(id));
            self.nodes[id].children.push(child);
        }
        id
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaves(&self) -> impl Iterator<Item = (usize, &Leaf)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.leaf().map(|leaf| (id, leaf)))
    }

    pub fn depth(&self, id: usize) -> usize {
        let mut depth = 0;
        let mut at = self.nodes[id].parent;
        while let Some(parent) = at {
            depth += 1;
            at = self.nodes[parent].parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::tokenize;
    use crate::query::parser::parse;
    use crate::query::predicate::Predicates;
    use crate::relation::BuiltinRelation;

    fn tree(query: &str) -> Tree {
        let tokens = tokenize(query).unwrap();
        Tree::flatten(parse(query, &tokens, &Predicates::default(), 5).unwrap())
    }

    fn shape(tree: &Tree, id: usize) -> String {
        let node = tree.node(id);
        let children: Vec<String> = node.children.iter().map(|&c| shape(tree, c)).collect();
        match &node.kind {
            NodeKind::Leaf(leaf) => format!("{}{:?}", leaf.predicate, leaf.params),
            NodeKind::And => format!("and({})", children.join(" ")),
            NodeKind::Or => format!("or({})", children.join(" ")),
        }
    }

    #[test]
    fn collapses_operator_chains() {
        let tree = tree("(before(0,1) and meets(1,2)) and (starts(2,3) or during(3,4) or equal(0,4))");
        assert_eq!(
            shape(&tree, tree.root()),
            "and(before[0, 1] meets[1, 2] or(starts[2, 3] during[3, 4] equal[0, 4]))"
        );
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.depth(6), 2);
        let leaves: Vec<usize> = tree.leaves().map(|(id, _)| id).collect();
        assert_eq!(leaves, vec![1, 2, 4, 5, 6]);
        assert_eq!(tree.node(4).parent, Some(3));
    }

    #[test]
    fn keeps_alternating_operators() {
        let tree = tree("before(0,1) and (meets(1,2) or (starts(2,3) and during(3,4)))");
        assert_eq!(
            shape(&tree, tree.root()),
            "and(before[0, 1] or(meets[1, 2] and(starts[2, 3] during[3, 4])))"
        );
    }

    #[test]
    fn leaf_expands_repeated_columns() {
        let leaf = Leaf::new(Predicate::Builtin(BuiltinRelation::Before), vec![2, 0, 2]);
        assert_eq!(leaf.columns, vec![0, 2]);
        let a = Loc::new(0, 1, 0).unwrap();
        let b = Loc::new(2, 3, 0).unwrap();
        let seq = Leaf::new(Predicate::Builtin(BuiltinRelation::SeqBefore), vec![2, 0, 2]);
        // row is laid out as columns [0, 2]
        assert!(!seq.holds(&[a, b]));
        let seq = Leaf::new(Predicate::Builtin(BuiltinRelation::SeqBefore), vec![0, 2]);
        assert!(seq.holds(&[a, b]));
        let pair = Leaf::new(Predicate::Builtin(BuiltinRelation::Before), vec![2, 0]);
        assert!(pair.holds(&[b, a]));
        assert!(!pair.holds(&[a, b]));
    }
}
