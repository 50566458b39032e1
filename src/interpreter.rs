use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use loc_tags::patterns::column_containing;
use loc_tags::{lit, Loc, Query, TagRef, Tagger};

use crate::syntax::{self, Expression};

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("unknown command or arguments")]
    UnknownCommand,
    #[error("expected a command")]
    ExpectedApplication,
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Tags(#[from] loc_tags::Error),
    #[error("lua: {0}")]
    Lua(#[from] rlua::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("parse error:\n{0}")]
    Parser(String),
    #[error("{0}: {1}")]
    Syntax(SyntaxError, String),
    #[error("unexpected input after command: {0:?}")]
    TrailingInput(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Regex {
        tag: String,
        pattern: String,
        group: usize,
        overlapped: bool,
    },
    Between {
        tag: String,
        start: String,
        end: String,
        distance: usize,
    },
    Column {
        tag: String,
        needle: String,
    },
    Project {
        tag: String,
        source: String,
        reference: String,
    },
    Show(TagRef),
    Tags,
    Delete(String),
    Untagged(Vec<TagRef>),
    Replace(String, String),
    Apply(Vec<String>),
    Udp(String, String),
    Query(String, Vec<TagRef>),
}

fn tag_ref(exp: &Expression) -> Option<TagRef> {
    match exp {
        Expression::Symbol(name) => Some(TagRef::from(name.as_str())),
        Expression::String(text) => Some(lit(text.as_str())),
        _ => None,
    }
}

fn symbols(args: &[Expression]) -> Option<Vec<String>> {
    args.iter()
        .map(|exp| match exp {
            Expression::Symbol(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

impl Command {
    #[rustfmt::skip]
    fn from_expression(exp: &Expression) -> std::result::Result<Command, SyntaxError> {
        if let Expression::Application(func, args) = exp {
            match (func.as_str(), args.as_slice()) {
                ("regex",
                 [Expression::Symbol(tag), Expression::String(pattern)]) => {
                    Ok(Command::Regex { tag: tag.clone(), pattern: pattern.clone(), group: 0, overlapped: false })
                }
                ("regex",
                 [Expression::Symbol(tag), Expression::String(pattern), Expression::Int(group)]) => {
                    Ok(Command::Regex { tag: tag.clone(), pattern: pattern.clone(), group: *group, overlapped: false })
                }
                ("overlapped",
                 [Expression::Symbol(tag), Expression::String(pattern)]) => {
                    Ok(Command::Regex { tag: tag.clone(), pattern: pattern.clone(), group: 0, overlapped: true })
                }
                ("overlapped",
                 [Expression::Symbol(tag), Expression::String(pattern), Expression::Int(group)]) => {
                    Ok(Command::Regex { tag: tag.clone(), pattern: pattern.clone(), group: *group, overlapped: true })
                }

                ("between",
                 [Expression::Symbol(tag), Expression::Symbol(start), Expression::Symbol(end), Expression::Int(distance)]) => {
                    Ok(Command::Between { tag: tag.clone(), start: start.clone(), end: end.clone(), distance: *distance })
                }
                ("column",
                 [Expression::Symbol(tag), Expression::String(needle)]) => {
                    Ok(Command::Column { tag: tag.clone(), needle: needle.clone() })
                }
                ("project",
                 [Expression::Symbol(tag), Expression::Symbol(source), Expression::Symbol(reference)]) => {
                    Ok(Command::Project { tag: tag.clone(), source: source.clone(), reference: reference.clone() })
                }

                ("show", [arg]) => tag_ref(arg).map(Command::Show).ok_or(SyntaxError::UnknownCommand),
                ("tags", []) => Ok(Command::Tags),
                ("delete", [Expression::Symbol(tag)]) => Ok(Command::Delete(tag.clone())),
                ("untagged", args) => args
                    .iter()
                    .map(tag_ref)
                    .collect::<Option<Vec<_>>>()
                    .map(Command::Untagged)
                    .ok_or(SyntaxError::UnknownCommand),
                ("replace",
                 [Expression::Symbol(tag), Expression::String(text)]) => {
                    Ok(Command::Replace(tag.clone(), text.clone()))
                }
                ("apply", args) => symbols(args).map(Command::Apply).ok_or(SyntaxError::UnknownCommand),

                ("udp",
                 [Expression::Symbol(name), Expression::String(source)]) => {
                    Ok(Command::Udp(name.clone(), source.clone()))
                }
                ("query",
                 [Expression::String(query), tags @ ..]) => tags
                    .iter()
                    .map(tag_ref)
                    .collect::<Option<Vec<_>>>()
                    .map(|tags| Command::Query(query.clone(), tags))
                    .ok_or(SyntaxError::UnknownCommand),

                _ => Err(SyntaxError::UnknownCommand),
            }
        } else {
            Err(SyntaxError::ExpectedApplication)
        }
    }
}

enum ParseState {
    Empty,
    Incomplete,
    Complete(Command),
}

fn parse_line(line: &str) -> Result<ParseState> {
    if line.trim().is_empty() {
        return Ok(ParseState::Empty);
    }

    match syntax::parse_expression(line.trim_start()) {
        Ok((rest, _)) if !rest.trim().is_empty() => Err(ShellError::TrailingInput(rest.to_string())),
        Ok((_, exp)) => match Command::from_expression(&exp) {
            Ok(command) => Ok(ParseState::Complete(command)),
            Err(err) => Err(ShellError::Syntax(err, line.to_string())),
        },
        Err(err) => match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                // FIXME: https://github.com/Geal/nom/issues/1027
                let default = format!("{:#?}", e);
                let converted = std::panic::catch_unwind(|| nom::error::convert_error(line, e));
                Err(ShellError::Parser(converted.unwrap_or(default)))
            }
            nom::Err::Incomplete(_) => Ok(ParseState::Incomplete),
        },
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CursorState {
    /// Nothing waits to be executed.
    Root,
    /// Complete commands wait to be executed.
    Buffered,
    /// A command continues on the next line.
    MultiLine,
}

/// Evaluate `source` with the global `locs` holding one
/// `{start, end, offset}` table per argument. Lua truthiness decides.
fn eval_predicate(lua: &rlua::Lua, source: &str, locs: &[Loc]) -> rlua::Result<bool> {
    lua.context(|lua_ctx| {
        let table = lua_ctx.create_table()?;
        for (i, loc) in locs.iter().enumerate() {
            let entry = lua_ctx.create_table()?;
            entry.set("start", loc.start())?;
            entry.set("end", loc.end())?;
            entry.set("offset", loc.offset())?;
            table.set(i + 1, entry)?;
        }
        lua_ctx.globals().set("locs", table)?;
        lua_ctx.load(source).eval()
    })
}

fn check_predicate(lua: &rlua::Lua, source: &str) -> rlua::Result<()> {
    lua.context(|lua_ctx| {
        let expression = format!("return {}", source);
        match lua_ctx.load(&expression).into_function() {
            Ok(_) => Ok(()),
            Err(_) => lua_ctx.load(source).into_function().map(|_| ()),
        }
    })
}

fn lua_predicate(lua: Rc<rlua::Lua>, name: String, source: String) -> impl Fn(&[Loc]) -> bool {
    move |locs: &[Loc]| match eval_predicate(&lua, &source, locs) {
        Ok(holds) => holds,
        Err(err) => {
            warn!(udp = name.as_str(), "predicate failed, counted as false: {}", err);
            false
        }
    }
}

pub struct Interpreter {
    tagger: Tagger,
    buffer: Vec<Command>,
    line: String,
    lua: Rc<rlua::Lua>,
    udps: Vec<(String, String)>,
    trace: bool,
}

impl Interpreter {
    pub fn new(tagger: Tagger, trace: bool) -> Self {
        Interpreter {
            tagger,
            buffer: vec![],
            line: String::new(),
            lua: Rc::new(rlua::Lua::new()),
            udps: vec![],
            trace,
        }
    }

    pub fn add_line_segment(&mut self, segment: &str) -> Result<CursorState> {
        self.line.push_str(segment);
        let line = std::mem::replace(&mut self.line, String::new());

        match parse_line(&line)? {
            ParseState::Incomplete => {
                self.line = line;
                self.line.push('\n');
                Ok(CursorState::MultiLine)
            }
            ParseState::Complete(command) => {
                self.buffer.push(command);
                Ok(CursorState::Buffered)
            }
            ParseState::Empty if self.buffer.is_empty() => Ok(CursorState::Root),
            ParseState::Empty => Ok(CursorState::Buffered),
        }
    }

    /// Run the buffered commands in order and return their output lines.
    pub fn execute(&mut self) -> Result<Vec<String>> {
        let commands = std::mem::replace(&mut self.buffer, vec![]);
        let mut lines = vec![];
        for command in commands {
            debug!(command = ?command, "executing");
            lines.extend(self.apply(command)?);
        }
        Ok(lines)
    }

    fn apply(&mut self, command: Command) -> Result<Vec<String>> {
        match command {
            Command::Regex {
                tag,
                pattern,
                group,
                overlapped,
            } => {
                let count = self.tagger.tag_re(&tag, &pattern, group, overlapped)?;
                Ok(vec![format!("tagged {} locations with '{}", count, tag)])
            }
            Command::Between {
                tag,
                start,
                end,
                distance,
            } => {
                let locs = self.tagger.between(&start, &end, distance);
                let count = self.tagger.tag_list(&tag, &locs);
                Ok(vec![format!("tagged {} locations with '{}", count, tag)])
            }
            Command::Column { tag, needle } => {
                let locs = column_containing(self.tagger.text(), &needle)?;
                let count = self.tagger.tag_list(&tag, &locs);
                Ok(vec![format!("tagged {} locations with '{}", count, tag)])
            }
            Command::Project {
                tag,
                source,
                reference,
            } => {
                let locs = self.tagger.project(&source, &reference)?;
                let count = self.tagger.tag_list(&tag, &locs);
                Ok(vec![format!("tagged {} locations with '{}", count, tag)])
            }
            Command::Show(tag) => {
                let locs = self.tagger.get_locs(&tag, false);
                let mut lines: Vec<String> = locs
                    .iter()
                    .map(|loc| format!("{} {:?}", loc, self.tagger.get_text_loc(loc)))
                    .collect();
                lines.push(format!("{} locations", locs.len()));
                Ok(lines)
            }
            Command::Tags => Ok(self
                .tagger
                .tags()
                .map(|tag| {
                    let count = self.tagger.get_locs(&tag.into(), false).len();
                    format!("'{} ({} locations)", tag, count)
                })
                .collect()),
            Command::Delete(tag) => match self.tagger.del_tag(&tag) {
                Some(locs) => Ok(vec![format!("deleted '{} ({} locations)", tag, locs.len())]),
                None => Ok(vec![]),
            },
            Command::Untagged(tags) => {
                let locs = self.tagger.not_in(&tags, None)?;
                Ok(locs
                    .iter()
                    .filter(|loc| !self.tagger.get_text_loc(loc).trim().is_empty())
                    .map(|loc| format!("{} {:?}", loc, self.tagger.get_text_loc(loc)))
                    .collect())
            }
            Command::Replace(tag, text) => Ok(self
                .tagger
                .replace_tag(&tag, &text)?
                .lines()
                .map(str::to_string)
                .collect()),
            Command::Apply(tags) => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                Ok(self
                    .tagger
                    .apply_tags(&tags)
                    .lines()
                    .map(str::to_string)
                    .collect())
            }
            Command::Udp(name, source) => {
                check_predicate(&self.lua, &source)?;
                self.udps.retain(|(known, _)| known != &name);
                self.udps.push((name.clone(), source));
                Ok(vec![format!("registered predicate {}", name)])
            }
            Command::Query(text, tags) => {
                let mut query = Query::new(&tags, &text, &self.tagger).trace(self.trace);
                for (name, source) in &self.udps {
                    let predicate = lua_predicate(self.lua.clone(), name.clone(), source.clone());
                    query = query.udp(name, predicate);
                }
                let mut rows = query.execute()?;
                rows.sort();
                let mut lines: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|loc| format!("{} {:?}", loc, self.tagger.get_text_loc(loc)))
                            .collect::<Vec<_>>()
                            .join(" | ")
                    })
                    .collect();
                lines.push(format!("{} rows", rows.len()));
                Ok(lines)
            }
        }
    }
}
