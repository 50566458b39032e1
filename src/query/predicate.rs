use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::base::{Comparator, Loc};
use crate::relation::BuiltinRelation;

pub type UserFn = Rc<dyn Fn(&[Loc]) -> bool>;

/// What a query leaf evaluates on each row of locations.
#[derive(Clone)]
pub enum Predicate {
    Builtin(BuiltinRelation),
    /// `dist(a, b) op n`: `b` starts at or after the end of `a`, both share
    /// an offset, and the gap compares with `n`.
    Dist {
        comparator: Comparator,
        distance: usize,
    },
    User { name: String, function: UserFn },
}

impl Predicate {
    pub fn holds(&self, locs: &[Loc]) -> bool {
        match self {
            Predicate::Builtin(relation) => relation.holds(locs),
            Predicate::Dist {
                comparator,
                distance,
            } => match locs {
                [a, b] => {
                    a.offset() == b.offset()
                        && b.start() >= a.end()
                        && comparator.compare(b.start() - a.end(), *distance)
                }
                _ => false,
            },
            Predicate::User { function, .. } => function(locs),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::Builtin(relation) => write!(f, "{}", relation.name()),
            Predicate::Dist {
                comparator,
                distance,
            } => write!(f, "dist {} {}", comparator.symbol(), distance),
            Predicate::User { name, .. } => write!(f, "{}", name),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Predicate({})", self)
    }
}

/// Predicate names a query may use. User defined predicates shadow the
/// built-in relations of the same name.
#[derive(Clone, Default)]
pub struct Predicates {
    user: HashMap<String, UserFn>,
}

impl Predicates {
    pub fn register(&mut self, name: &str, function: UserFn) {
        self.user.insert(name.to_string(), function);
    }

    pub fn resolve(&self, name: &str) -> Option<Predicate> {
        match self.user.get(name) {
            Some(function) => Some(Predicate::User {
                name: name.to_string(),
                function: function.clone(),
            }),
            None => BuiltinRelation::from_name(name).map(Predicate::Builtin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(start: usize, end: usize, offset: usize) -> Loc {
        Loc::new(start, end, offset).unwrap()
    }

    #[test]
    fn dist_measures_gap() {
        let within = Predicate::Dist {
            comparator: Comparator::LessThanEqual,
            distance: 2,
        };
        assert!(within.holds(&[loc(0, 3, 0), loc(5, 6, 0)]));
        assert!(within.holds(&[loc(0, 3, 0), loc(3, 6, 0)]));
        assert!(!within.holds(&[loc(0, 3, 0), loc(6, 7, 0)]));
        assert!(!within.holds(&[loc(5, 6, 0), loc(0, 3, 0)]));
        assert!(!within.holds(&[loc(0, 3, 0), loc(4, 5, 1)]));
        assert!(!within.holds(&[loc(0, 3, 0)]));
    }

    #[test]
    fn user_predicates_shadow_builtins() {
        let mut predicates = Predicates::default();
        assert!(matches!(
            predicates.resolve("before"),
            Some(Predicate::Builtin(BuiltinRelation::Before))
        ));
        assert!(predicates.resolve("long").is_none());

        predicates.register("long", Rc::new(|locs: &[Loc]| locs.iter().all(|l| l.len() > 3)));
        predicates.register("before", Rc::new(|_: &[Loc]| true));
        let long = predicates.resolve("long").unwrap();
        assert!(long.holds(&[loc(0, 4, 0)]));
        assert!(!long.holds(&[loc(0, 4, 0), loc(5, 6, 0)]));
        assert_eq!(long.to_string(), "long");
        assert!(predicates.resolve("before").unwrap().holds(&[loc(4, 5, 0), loc(0, 1, 0)]));
    }
}
