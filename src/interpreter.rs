use crate::core::CORE;
use crate::environment;
use crate::evaluator::{self, Error};
use crate::heap::Heap;
use crate::printer::pr_str;
use crate::reader::Reader;
use crate::symbols::SymbolTable;
use crate::types::ObjRef;
use std::io::Write;

/// Everything one run of the interpreter owns: the heap, the symbol table,
/// the persistent top-level environment and the stream results go to.
pub struct Interpreter {
    pub heap: Heap,
    pub symbols: SymbolTable,
    global: ObjRef,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    /// Creates an interpreter whose printed results and `println` output go
    /// to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let mut heap = Heap::new();
        let mut symbols = SymbolTable::new();
        let global = environment::root(&mut heap);

        let t = symbols.intern(&mut heap, "t");
        let truth = heap.t();
        environment::define(&mut heap, global, t, truth).expect("root is a frame");
        for (&name, &func) in CORE.iter() {
            let sym = symbols.intern(&mut heap, name);
            let primitive = heap.primitive(func);
            environment::define(&mut heap, global, sym, primitive).expect("root is a frame");
            heap.release(primitive);
        }
        log::info!(
            "interpreter ready: {} primitives, {} symbols, {} live objects",
            CORE.len(),
            symbols.len(),
            heap.stats().live()
        );
        Self {
            heap,
            symbols,
            global,
            out,
        }
    }

    /// The top-level environment, borrowed.
    pub fn global(&self) -> ObjRef {
        self.global
    }

    /// Evaluates `form` in the top-level environment.
    pub fn eval(&mut self, form: ObjRef) -> evaluator::Result {
        let global = self.global;
        evaluator::eval(self, global, form)
    }

    pub fn print(&self, object: ObjRef) -> String {
        pr_str(&self.heap, object)
    }

    pub(crate) fn write_line(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn live_objects(&self) -> usize {
        self.heap.stats().live()
    }

    // Reads and evaluates one form. Returns `Ok(None)` at end of input;
    // otherwise the form's value, carrying one credit.
    fn step<I: Iterator<Item = char>>(&mut self, reader: &mut Reader<I>) -> evaluator::Result<Option<ObjRef>> {
        let form = match reader.read(&mut self.heap, &mut self.symbols)? {
            Some(form) => form,
            None => return Ok(None),
        };
        log::trace!("read {}", self.print(form));
        let value = self.eval(form);
        self.heap.release(form);
        value.map(Some)
    }

    /// Reads, evaluates and prints every form of `input` in turn, stopping at
    /// the first error.
    pub fn run<I: Iterator<Item = char>>(&mut self, input: I) -> Result<(), Error> {
        let mut reader = Reader::new(input);
        while let Some(value) = self.step(&mut reader)? {
            let text = self.print(value);
            self.heap.release(value);
            self.write_line(&text)?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Like [`run`](Self::run), but collects the printed results, one per
    /// line, instead of writing them out.
    pub fn rep_str(&mut self, input: &str) -> Result<String, Error> {
        let mut reader = Reader::from_str(input);
        let mut printed = Vec::new();
        while let Some(value) = self.step(&mut reader)? {
            printed.push(self.print(value));
            self.heap.release(value);
        }
        Ok(printed.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn run(input: &str) -> (Result<(), Error>, String) {
        let buffer = SharedBuffer::default();
        let mut interp = Interpreter::with_output(Box::new(buffer.clone()));
        let result = interp.run(input.chars());
        (result, buffer.contents())
    }

    #[test]
    fn prints_each_result_on_its_own_line() {
        let (result, out) = run("(+ 1 2 3)\n(define x 10) (setq x (+ x 1)) x");
        assert!(result.is_ok());
        assert_eq!(out, "6\n10\n11\n11\n");
    }

    #[test]
    fn println_shares_the_output_stream() {
        let (result, out) = run("(println '(a . b)) 1");
        assert!(result.is_ok());
        assert_eq!(out, "(a . b)\n()\n1\n");
    }

    #[test]
    fn first_error_stops_the_run() {
        let (result, out) = run("1 (1 2");
        match result {
            Err(Error::Syntax(e)) => assert_eq!(e.to_string(), "unclosed parenthesis"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(out, "1\n");

        let (result, out) = run("(foo) 2");
        assert!(matches!(result, Err(Error::UnknownSymbol(_))));
        assert_eq!(out, "");
    }

    #[test]
    fn exit_stops_without_printing() {
        let (result, out) = run("1 (exit) 2");
        assert!(matches!(result, Err(Error::Exit)));
        assert_eq!(out, "1\n");
    }

    #[test]
    fn symbols_stay_unique_across_forms() {
        let mut interp = Interpreter::new();
        interp.rep_str("(define a 'sym)").unwrap();
        assert_eq!(interp.rep_str("(eq a 'sym)").unwrap(), "t");
        let sym = interp.symbols.lookup("sym");
        assert!(sym.is_some());
    }

    #[test]
    fn evaluating_a_form_releases_it() {
        let mut interp = Interpreter::new();
        interp.rep_str("'(1 2 3)").unwrap();
        let live = interp.live_objects();
        interp.rep_str("'(1 2 3) (list 4 5)").unwrap();
        assert_eq!(interp.live_objects(), live);
    }
}
