mod interpreter;
mod repl;
mod syntax;

use std::fs::{self, File};
use std::io::prelude::*;
use std::io::BufReader;

use clap::{App, Arg};
use tracing::Level;

use loc_tags::Tagger;

use interpreter::{CursorState, Interpreter, Result};
use repl::print_output;

/// Replay a script. Lines starting with `> ` are commands, a blank line runs
/// the commands read so far and any other line is echoed.
fn run_script(interpreter: &mut Interpreter, file_name: &str) -> Result<()> {
    let file = BufReader::new(File::open(file_name)?);
    let mut state = CursorState::Root;

    for segment in file.lines() {
        let segment = segment?;
        if !segment.is_empty() {
            println!("{}", segment);
        }

        state = match state {
            CursorState::MultiLine => interpreter.add_line_segment(&segment)?,
            _ if segment.starts_with("> ") => interpreter.add_line_segment(&segment[2..])?,
            CursorState::Buffered if segment.trim().is_empty() => {
                print_output(&interpreter.execute()?);
                CursorState::Root
            }
            state => state,
        };
    }

    if state != CursorState::Root {
        print_output(&interpreter.execute()?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = App::new("loc-tags")
        .about("Tag spans of a text and query them with interval relations")
        .arg(
            Arg::with_name("text")
                .short("t")
                .long("text")
                .help("Text file to tag, empty text without it")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("file")
                .short("f")
                .long("file")
                .help("Parse and run commands in this file before the interactive REPL")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("keep-case")
                .short("k")
                .long("keep-case")
                .help("Do not lower case the text"),
        )
        .arg(
            Arg::with_name("debug")
                .short("d")
                .long("debug")
                .help("Log query planning and print the query tree after every step"),
        )
        .get_matches();

    let debug = args.is_present("debug");
    tracing_subscriber::fmt()
        .with_max_level(if debug { Level::TRACE } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let text = match args.value_of("text") {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    let tagger = Tagger::new(text, !args.is_present("keep-case"));
    let mut interpreter = Interpreter::new(tagger, debug);

    if let Some(file_name) = args.value_of("file") {
        run_script(&mut interpreter, file_name)?;
    }

    repl::start(&mut interpreter).map_err(|e| {
        println!("{}", e);
        e
    })
}
