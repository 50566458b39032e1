use crate::error::{Error, Result};
use crate::query::lexer::{syntax_error, Token};
use crate::query::predicate::{Predicate, Predicates};

/// Binary query tree, as written.
#[derive(Clone, Debug)]
pub enum Expr {
    Leaf {
        predicate: Predicate,
        params: Vec<usize>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Recursive descent over
///
/// ```text
/// query   ::= conj ('or' conj)*
/// conj    ::= primary ('and' primary)*
/// primary ::= '(' query ')' | name '(' int (',' int)* ')'
/// ```
///
/// so `and` binds tighter than `or`.
struct Parser<'a> {
    query: &'a str,
    tokens: &'a [Token],
    pos: usize,
    predicates: &'a Predicates,
    columns: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn error(&self, code: u32, message: String) -> Error {
        syntax_error(code, self.query, message)
    }

    fn disjunction(&mut self) -> Result<Expr> {
        let mut left = self.conjunction()?;
        while let Some(Token::Or) = self.peek() {
            self.advance();
            let right = self.conjunction()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Expr> {
        let mut left = self.primary()?;
        while let Some(Token::And) = self.peek() {
            self.advance();
            let right = self.primary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            None => Err(self.error(110611, "query ends where a predicate is expected".into())),
            Some(Token::Open) => {
                let expr = self.disjunction()?;
                match self.advance() {
                    Some(Token::Close) => Ok(expr),
                    Some(token) => Err(self.error(110612, format!("expected ) at {}", token))),
                    None => Err(self.error(110612, "missing closing parenthesis".into())),
                }
            }
            Some(Token::Name(name)) => {
                let predicate = self
                    .predicates
                    .resolve(name)
                    .ok_or_else(|| Error::UnknownPredicate(name.clone()))?;
                let params = self.params()?;
                if let Predicate::Builtin(relation) = &predicate {
                    relation.check_arity(params.len())?;
                }
                Ok(Expr::Leaf { predicate, params })
            }
            Some(Token::Dist(comparator, distance)) => {
                let params = self.params()?;
                Ok(Expr::Leaf {
                    predicate: Predicate::Dist {
                        comparator: *comparator,
                        distance: *distance,
                    },
                    params,
                })
            }
            Some(token @ Token::And) | Some(token @ Token::Or) => {
                Err(self.error(110611, format!("misplaced operator {}", token)))
            }
            Some(token) => Err(self.error(110612, format!("unexpected {}", token))),
        }
    }

    fn params(&mut self) -> Result<Vec<usize>> {
        match self.advance() {
            Some(Token::Open) => {}
            other => return Err(self.param_error(other)),
        }
        let mut params = vec![];
        loop {
            match self.advance() {
                Some(Token::Int(col)) if *col < self.columns => params.push(*col),
                Some(Token::Int(col)) => {
                    return Err(Error::ColumnOutOfRange {
                        column: *col,
                        tags: self.columns,
                    })
                }
                other => return Err(self.param_error(other)),
            }
            match self.advance() {
                Some(Token::Comma) => {}
                Some(Token::Close) => return Ok(params),
                other => return Err(self.param_error(other)),
            }
        }
    }

    fn param_error(&self, at: Option<&Token>) -> Error {
        let at = at.map_or_else(|| "end of query".to_string(), |t| t.to_string());
        self.error(110609, format!("error while parsing parameters at {}", at))
    }
}

/// Parse `tokens` of `query` into a tree of predicates over `columns` tags.
pub fn parse(query: &str, tokens: &[Token], predicates: &Predicates, columns: usize) -> Result<Expr> {
    if tokens.is_empty() {
        return Err(syntax_error(110614, query, "empty query"));
    }
    let mut parser = Parser {
        query,
        tokens,
        pos: 0,
        predicates,
        columns,
    };
    let expr = parser.disjunction()?;
    match parser.peek() {
        None => Ok(expr),
        Some(Token::Close) => Err(parser.error(110612, "unmatched closing parenthesis".into())),
        Some(token) => Err(parser.error(110612, format!("expected and/or at {}", token))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Comparator;
    use crate::query::lexer::tokenize;
    use crate::relation::BuiltinRelation;

    fn parse_str(query: &str) -> Result<Expr> {
        parse(query, &tokenize(query)?, &Predicates::default(), 3)
    }

    fn leaf(expr: &Expr) -> (String, Vec<usize>) {
        match expr {
            Expr::Leaf { predicate, params } => (predicate.to_string(), params.clone()),
            other => panic!("not a leaf: {:?}", other),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_str("before(0,1) or meets(1,2) and starts(0,2)").unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert_eq!(leaf(&left), ("before".to_string(), vec![0, 1]));
                match *right {
                    Expr::And(a, b) => {
                        assert_eq!(leaf(&a).0, "meets");
                        assert_eq!(leaf(&b).0, "starts");
                    }
                    other => panic!("expected and, got {:?}", other),
                }
            }
            other => panic!("expected or, got {:?}", other),
        }
    }

    #[test]
    fn parentheses_group() {
        let expr = parse_str("(before(0,1) or meets(1,2)) and seq_before(0,1,2)").unwrap();
        match expr {
            Expr::And(left, right) => {
                assert!(matches!(*left, Expr::Or(_, _)));
                assert_eq!(leaf(&right), ("seq_before".to_string(), vec![0, 1, 2]));
            }
            other => panic!("expected and, got {:?}", other),
        }
        assert!(matches!(parse_str("((before(0,1)))").unwrap(), Expr::Leaf { .. }));
    }

    #[test]
    fn parses_dist() {
        let expr = parse_str("dist(2,0) < 4").unwrap();
        match expr {
            Expr::Leaf {
                predicate: Predicate::Dist { comparator, distance },
                params,
            } => {
                assert_eq!(comparator, Comparator::LessThan);
                assert_eq!(distance, 4);
                assert_eq!(params, vec![2, 0]);
            }
            other => panic!("expected dist, got {:?}", other),
        }
    }

    #[test]
    fn reports_syntax_errors() {
        let code = |q: &str| parse_str(q).unwrap_err().code();
        assert_eq!(code(""), 110614);
        assert_eq!(code("before(0,1) and"), 110611);
        assert_eq!(code("and before(0,1)"), 110611);
        assert_eq!(code("before(0,1) or or meets(0,1)"), 110611);
        assert_eq!(code("(before(0,1)"), 110612);
        assert_eq!(code("before(0,1))"), 110612);
        assert_eq!(code("before(0,1) meets(0,1)"), 110612);
        assert_eq!(code("before 0,1"), 110609);
        assert_eq!(code("before(0 1)"), 110609);
        assert_eq!(code("before()"), 110609);
        assert_eq!(code("before(0,3)"), 110610);
        assert_eq!(code("follows(0,1)"), 110613);
        assert_eq!(code("before(0,1,2)"), 110306);
    }

    #[test]
    fn resolves_user_predicates() {
        let mut predicates = Predicates::default();
        predicates.register("any", std::rc::Rc::new(|_: &[crate::base::Loc]| true));
        let expr = parse("any(0)", &tokenize("any(0)").unwrap(), &predicates, 1).unwrap();
        assert_eq!(leaf(&expr), ("any".to_string(), vec![0]));
        let expr = parse("before(0,0)", &tokenize("before(0,0)").unwrap(), &predicates, 1).unwrap();
        assert!(matches!(
            expr,
            Expr::Leaf {
                predicate: Predicate::Builtin(BuiltinRelation::Before),
                ..
            }
        ));
    }
}
