use crate::evaluator::Error;
use crate::interpreter::Interpreter;
use ansi_term::Colour::Red;
use std::io::{self, BufRead};
use std::vec;

/// Characters of a buffered source, decoded as UTF-8 one line at a time. The
/// first read failure ends the stream and is kept for the caller.
struct SourceChars<R> {
    source: R,
    pending: vec::IntoIter<char>,
    error: Option<io::Error>,
}

impl<R: BufRead> SourceChars<R> {
    fn new(source: R) -> Self {
        Self {
            source,
            pending: Vec::new().into_iter(),
            error: None,
        }
    }
}

impl<R: BufRead> Iterator for SourceChars<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(c) = self.pending.next() {
                return Some(c);
            }
            if self.error.is_some() {
                return None;
            }
            let mut line = String::new();
            match self.source.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => self.pending = line.chars().collect::<Vec<_>>().into_iter(),
                Err(e) => self.error = Some(e),
            }
        }
    }
}

/// Evaluates every form read from `source`. A read failure, including input
/// that is not valid UTF-8, is reported as [`Error::Io`] in place of whatever
/// the truncated input led to.
pub fn run_source<R: BufRead>(interpreter: &mut Interpreter, source: R) -> Result<(), Error> {
    let mut chars = SourceChars::new(source);
    let result = interpreter.run(&mut chars);
    match (result, chars.error) {
        (Err(Error::Exit), _) => Err(Error::Exit),
        (_, Some(e)) => Err(Error::Io(e)),
        (result, None) => result,
    }
}

/// Runs the interpreter over standard input and returns the process exit
/// status: zero at end of input or on `(exit)`, one after any other error.
pub fn launch() -> i32 {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    match run_source(&mut interpreter, stdin.lock()) {
        Ok(()) | Err(Error::Exit) => {
            log::info!("finished with {} live objects", interpreter.live_objects());
            0
        }
        Err(e) => {
            report(&e);
            1
        }
    }
}

fn report(e: &Error) {
    let message = format!("error: {}", e);
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{}", Red.paint(message));
    } else {
        eprintln!("{}", message);
    }
}
