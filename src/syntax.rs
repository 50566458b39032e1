use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    bytes::streaming::take_until,
    character::complete::{alpha1, char, digit1, multispace0, multispace1},
    combinator::{cut, map, map_res, value},
    error::VerboseError,
    multi::separated_list,
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

type Err<'a> = VerboseError<&'a str>;

/// A shell command, e.g. `regex('word "\w+")` or `query("before(0,1)", 'a 'b)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Application(String, Vec<Expression>),
    Int(usize),
    String(String),
    Symbol(String),
}

fn parse_int<'a>(i: &'a str) -> IResult<&'a str, usize, Err<'a>> {
    map_res(digit1, |int_str: &str| int_str.parse::<usize>())(i)
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn parse_symbol<'a>(i: &'a str) -> IResult<&'a str, String, Err<'a>> {
    map(preceded(tag("'"), cut(take_while1(is_symbol_char))), |sym_str: &str| {
        sym_str.to_string()
    })(i)
}

// Streaming, so an unterminated string asks for more input.
fn parse_str<'a>(i: &'a str) -> IResult<&'a str, &str, Err<'a>> {
    take_until("\"")(i)
}

fn parse_double_quoted_str<'a>(i: &'a str) -> IResult<&'a str, String, Err<'a>> {
    map(
        preceded(char('\"'), cut(terminated(parse_str, char('\"')))),
        |s: &str| s.to_string(),
    )(i)
}

/// Arguments are separated by a comma or by whitespace.
fn parse_separator<'a>(i: &'a str) -> IResult<&'a str, (), Err<'a>> {
    alt((
        value((), tuple((multispace0, char(','), multispace0))),
        value((), multispace1),
    ))(i)
}

fn parse_arguments<'a>(i: &'a str) -> IResult<&'a str, Vec<Expression>, Err<'a>> {
    delimited(
        char('('),
        separated_list(parse_separator, preceded(multispace0, parse_expression)),
        cut(preceded(multispace0, char(')'))),
    )(i)
}

fn parse_application<'a>(i: &'a str) -> IResult<&'a str, (&'a str, Vec<Expression>), Err<'a>> {
    tuple((alpha1, preceded(multispace0, parse_arguments)))(i)
}

pub fn parse_expression<'a>(i: &'a str) -> IResult<&'a str, Expression, Err<'a>> {
    alt((
        map(parse_application, |(func, args)| {
            Expression::Application(func.to_string(), args)
        }),
        map(parse_int, Expression::Int),
        map(parse_double_quoted_str, Expression::String),
        map(parse_symbol, Expression::Symbol),
    ))(i)
}
