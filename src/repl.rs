use rustyline::error::ReadlineError;

use crate::interpreter::{CursorState, Interpreter, Result};

const HISTORY: &str = "history.txt";

pub fn print_output(lines: &[String]) {
    println!();
    for line in lines {
        println!("  {}", line);
    }
    println!();
}

/// Read commands until interrupted. Each complete command runs right away;
/// errors are printed and the session goes on.
pub fn start(interpreter: &mut Interpreter) -> Result<()> {
    let mut rl = rustyline::Editor::<()>::new();
    if rl.load_history(HISTORY).is_err() {
        println!("No previous history.");
    }

    let mut state = CursorState::Root;
    loop {
        let prompt = match state {
            CursorState::MultiLine => "| ",
            _ => "> ",
        };

        match rl.readline(prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str());
                state = match interpreter.add_line_segment(&line) {
                    Ok(CursorState::Buffered) => {
                        match interpreter.execute() {
                            Ok(output) => print_output(&output),
                            Err(err) => println!("Error: {}", err),
                        }
                        CursorState::Root
                    }
                    Ok(state) => state,
                    Err(err) => {
                        println!("Error: {}", err);
                        CursorState::Root
                    }
                };
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    rl.save_history(HISTORY)?;
    Ok(())
}
