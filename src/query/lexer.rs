use std::fmt;

use regex::Regex;

use crate::base::Comparator;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Name(String),
    Int(usize),
    Open,
    Close,
    Comma,
    And,
    Or,
    /// `dist(a, b) op n` is lexed as `Dist(op, n) ( a , b )`.
    Dist(Comparator, usize),
    /// A comparison symbol outside of a `dist` expression.
    Symbol(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "{}", name),
            Token::Int(n) => write!(f, "{}", n),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Dist(cmp, n) => write!(f, "dist[{} {}]", cmp.symbol(), n),
            Token::Symbol(s) => write!(f, "{}", s),
        }
    }
}

pub(crate) fn syntax_error(code: u32, query: &str, message: impl Into<String>) -> Error {
    Error::QuerySyntax {
        code,
        query: query.to_string(),
        message: message.into(),
    }
}

fn is_int(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

// Column numbers too large for usize are out of range for any query.
fn int(word: &str) -> usize {
    word.parse().unwrap_or(usize::MAX)
}

/// Split `query` into words and the delimiters `( ) , < > = !`. Anything
/// else but whitespace is an error.
fn split(query: &str) -> Result<Vec<&str>> {
    let pattern = Regex::new(r"\w+|[)(,><=!]")?;
    let mut pieces = vec![];
    let mut last = 0;
    for m in pattern.find_iter(query) {
        check_gap(query, &query[last..m.start()])?;
        pieces.push(m.as_str());
        last = m.end();
    }
    check_gap(query, &query[last..])?;
    Ok(pieces)
}

fn check_gap(query: &str, gap: &str) -> Result<()> {
    match gap.chars().find(|c| !c.is_whitespace()) {
        Some(c) => Err(syntax_error(
            110617,
            query,
            format!("unexpected character {:?}", c),
        )),
        None => Ok(()),
    }
}

fn next_piece<'a>(pieces: &mut std::slice::Iter<'_, &'a str>, query: &str, what: &str) -> Result<&'a str> {
    pieces.next().copied().ok_or_else(|| {
        syntax_error(110607, query, format!("dist expression ends before {}", what))
    })
}

/// Lex the pieces after `dist`: `( n , n ) op n`, where `op` may be split
/// in two pieces such as `<` `=`. Returns the number of pieces used.
fn lex_dist(query: &str, pieces: &[&str], tokens: &mut Vec<Token>) -> Result<usize> {
    let mut rest = pieces.iter();
    let unexpected = |piece: &str, what: &str| {
        syntax_error(
            110606,
            query,
            format!("invalid dist expression at {:?}, expected {}", piece, what),
        )
    };

    let mut params = vec![];
    for expected in &["(", "n", ",", "n", ")"] {
        let piece = next_piece(&mut rest, query, expected)?;
        match *expected {
            "n" if is_int(piece) => params.push(Token::Int(int(piece))),
            "n" => return Err(unexpected(piece, "a column number")),
            delimiter if piece == delimiter => {}
            delimiter => return Err(unexpected(piece, delimiter)),
        }
    }

    let mut symbol = next_piece(&mut rest, query, "a comparison")?.to_string();
    let mut piece = next_piece(&mut rest, query, "a distance")?;
    if piece == "=" && symbol != "=" {
        symbol.push('=');
        piece = next_piece(&mut rest, query, "a distance")?;
    }
    let comparator =
        Comparator::from_symbol(&symbol).ok_or_else(|| unexpected(&symbol, "a comparison"))?;
    if !is_int(piece) {
        return Err(unexpected(piece, "a distance"));
    }

    tokens.push(Token::Dist(comparator, int(piece)));
    tokens.push(Token::Open);
    tokens.push(params[0].clone());
    tokens.push(Token::Comma);
    tokens.push(params[1].clone());
    tokens.push(Token::Close);
    Ok(pieces.len() - rest.len())
}

pub fn tokenize(query: &str) -> Result<Vec<Token>> {
    let pieces = split(query)?;
    let mut tokens = vec![];
    let mut i = 0;
    while i < pieces.len() {
        let piece = pieces[i];
        i += 1;
        let token = match piece {
            "dist" => {
                i += lex_dist(query, &pieces[i..], &mut tokens)?;
                continue;
            }
            "(" => Token::Open,
            ")" => Token::Close,
            "," => Token::Comma,
            "and" => Token::And,
            "or" => Token::Or,
            "<" | ">" | "=" | "!" => Token::Symbol(piece.to_string()),
            word if is_int(word) => Token::Int(int(word)),
            word => Token::Name(word.to_string()),
        };
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Token {
        Token::Name(s.to_string())
    }

    #[test]
    fn splits_words_and_delimiters() {
        let tokens = tokenize("before(0, 1) and\n(seq_before(0,1,2) or meets(1,2))").unwrap();
        assert_eq!(
            tokens,
            vec![
                name("before"),
                Token::Open,
                Token::Int(0),
                Token::Comma,
                Token::Int(1),
                Token::Close,
                Token::And,
                Token::Open,
                name("seq_before"),
                Token::Open,
                Token::Int(0),
                Token::Comma,
                Token::Int(1),
                Token::Comma,
                Token::Int(2),
                Token::Close,
                Token::Or,
                name("meets"),
                Token::Open,
                Token::Int(1),
                Token::Comma,
                Token::Int(2),
                Token::Close,
                Token::Close,
            ]
        );
    }

    #[test]
    fn rewrites_dist() {
        let expected = |cmp, n| {
            vec![
                Token::Dist(cmp, n),
                Token::Open,
                Token::Int(0),
                Token::Comma,
                Token::Int(2),
                Token::Close,
            ]
        };
        assert_eq!(
            tokenize("dist(0,2) <= 3").unwrap(),
            expected(Comparator::LessThanEqual, 3)
        );
        assert_eq!(
            tokenize("dist(0,2)!=10").unwrap(),
            expected(Comparator::NotEqual, 10)
        );
        assert_eq!(tokenize("dist(0, 2) = 1").unwrap(), expected(Comparator::Equal, 1));
        let tokens = tokenize("dist(0,2) > 1 and before(0,1)").unwrap();
        assert_eq!(tokens[0], Token::Dist(Comparator::GreaterThan, 1));
        assert_eq!(tokens[6], Token::And);
    }

    #[test]
    fn rejects_malformed_dist() {
        let code = |q: &str| tokenize(q).unwrap_err().code();
        assert_eq!(code("dist(0;2) < 1"), 110617);
        assert_eq!(code("dist(0 2) < 1"), 110606);
        assert_eq!(code("dist(0,2) < x"), 110606);
        assert_eq!(code("dist(0,2) ! 1"), 110606);
        assert_eq!(code("dist(0,2) <"), 110607);
        assert_eq!(code("dist(0,"), 110607);
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("before(0,1) & meets(1,2)").unwrap_err();
        assert_eq!(err.code(), 110617);
        assert!(tokenize("before(0,1)  ").is_ok());
        assert_eq!(tokenize("").unwrap(), vec![]);
    }

    #[test]
    fn keeps_stray_symbols() {
        assert_eq!(
            tokenize("< 1").unwrap(),
            vec![Token::Symbol("<".to_string()), Token::Int(1)]
        );
    }
}
