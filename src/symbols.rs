// Two reads of the same name must give the same object: the evaluator compares
// symbols by handle, never by content.

use crate::heap::Heap;
use crate::types::ObjRef;
use std::collections::HashMap;

/// Interning context. Holds one credit on every symbol it has handed out, so
/// symbols live as long as the table does.
#[derive(Default)]
pub struct SymbolTable {
    by_name: HashMap<String, ObjRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unique symbol called `name`, creating it on first use. The
    /// returned handle is borrowed from the table.
    pub fn intern(&mut self, heap: &mut Heap, name: &str) -> ObjRef {
        if let Some(&sym) = self.by_name.get(name) {
            return sym;
        }
        let sym = heap.symbol(name);
        log::trace!("intern {}", name);
        self.by_name.insert(name.into(), sym);
        sym
    }

    pub fn lookup(&self, name: &str) -> Option<ObjRef> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_identity() {
        let mut heap = Heap::new();
        let mut symbols = SymbolTable::new();
        let a = symbols.intern(&mut heap, "foo");
        let b = symbols.intern(&mut heap, "foo");
        let c = symbols.intern(&mut heap, "bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(heap.symbol_name(a), Ok("foo"));
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn interning_allocates_once() {
        let mut heap = Heap::new();
        let mut symbols = SymbolTable::new();
        symbols.intern(&mut heap, "quote");
        let live = heap.stats().live();
        symbols.intern(&mut heap, "quote");
        assert_eq!(heap.stats().live(), live);
        assert_eq!(symbols.lookup("quote").map(|s| heap.count(s)), Some(1));
        assert_eq!(symbols.lookup("unquote"), None);
    }
}
