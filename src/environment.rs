use crate::evaluator::{Error, Result};
use crate::heap::Heap;
use crate::types::{Arity, Field, ObjRef, TypeMismatch};
use std::fmt;

#[derive(Debug)]
pub struct UnknownSymbol(pub String);

impl fmt::Display for UnknownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undefined symbol: {}", self.0)
    }
}

/// Creates the top-level frame. Its parent is Nil, which ends every lookup.
pub fn root(heap: &mut Heap) -> ObjRef {
    let nil = heap.nil();
    heap.environment(nil, nil)
}

/// Searches the frame chain, innermost first, for the binding of `sym`. The
/// binding is the `(symbol . value)` pair itself, so its value can be
/// replaced in place.
pub fn find(heap: &Heap, env: ObjRef, sym: ObjRef) -> Option<ObjRef> {
    let mut frame = env;
    while let Ok(current) = heap.as_frame(frame) {
        let mut cell = current.bindings;
        while let Ok(pair) = heap.as_pair(cell) {
            if heap.head(pair.head) == Ok(sym) {
                return Some(pair.head);
            }
            cell = pair.tail;
        }
        frame = current.parent;
    }
    None
}

pub fn lookup(heap: &Heap, env: ObjRef, sym: ObjRef) -> std::result::Result<ObjRef, UnknownSymbol> {
    find(heap, env, sym).ok_or_else(|| {
        let name = heap.symbol_name(sym).unwrap_or("<not a symbol>");
        UnknownSymbol(name.into())
    })
}

/// Returns a new frame below `env` binding each of `params` to the matching
/// element of `args`. `what` names the procedure kind in arity errors.
pub fn extend(heap: &mut Heap, env: ObjRef, params: ObjRef, args: ObjRef, what: &'static str) -> Result {
    let params = heap.list_to_vec(params)?;
    let args = heap.list_to_vec(args)?;
    Arity::exactly(params.len())
        .validate_for(args.len(), what)
        .map_err(Error::BadArgCount)?;

    let mut bindings = heap.owned_nil();
    for (&param, &arg) in params.iter().zip(args.iter()) {
        let extended = heap.acons(param, arg, bindings);
        heap.release(bindings);
        bindings = extended;
    }
    let frame = heap.environment(bindings, env);
    heap.release(bindings);
    Ok(frame)
}

/// Prepends a binding to the frame `env` itself. An existing binding of the
/// same symbol in that frame is shadowed, not replaced.
pub fn define(heap: &mut Heap, env: ObjRef, sym: ObjRef, value: ObjRef) -> std::result::Result<(), TypeMismatch> {
    let frame = heap.as_frame(env)?;
    let bindings = heap.acons(sym, value, frame.bindings);
    let result = heap.reassign(env, Field::Bindings, bindings);
    heap.release(bindings);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolTable;

    struct Fixture {
        heap: Heap,
        symbols: SymbolTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                heap: Heap::new(),
                symbols: SymbolTable::new(),
            }
        }

        fn sym(&mut self, name: &str) -> ObjRef {
            self.symbols.intern(&mut self.heap, name)
        }

        fn int(&mut self, value: i64) -> ObjRef {
            self.heap.integer(value)
        }

        fn value_of(&self, env: ObjRef, sym: ObjRef) -> Option<i64> {
            let binding = find(&self.heap, env, sym)?;
            let value = self.heap.tail(binding).ok()?;
            self.heap.as_int(value).ok()
        }
    }

    #[test]
    fn define_shadows_within_a_frame() {
        let mut fx = Fixture::new();
        let env = root(&mut fx.heap);
        let x = fx.sym("x");
        let one = fx.int(1);
        let two = fx.int(2);
        define(&mut fx.heap, env, x, one).unwrap();
        define(&mut fx.heap, env, x, two).unwrap();
        assert_eq!(fx.value_of(env, x), Some(2));
        assert_eq!(fx.heap.list_length(fx.heap.as_frame(env).unwrap().bindings), Ok(2));
    }

    #[test]
    fn lookup_walks_outward() {
        let mut fx = Fixture::new();
        let global = root(&mut fx.heap);
        let x = fx.sym("x");
        let y = fx.sym("y");
        let one = fx.int(1);
        define(&mut fx.heap, global, x, one).unwrap();

        let two = fx.int(2);
        let param = fx.heap.retain(y);
        let params = fx.heap.list(vec![param]);
        let args = fx.heap.list(vec![two]);
        let inner = extend(&mut fx.heap, global, params, args, "closure").unwrap();

        assert_eq!(fx.value_of(inner, x), Some(1));
        assert_eq!(fx.value_of(inner, y), Some(2));
        assert_eq!(fx.value_of(global, y), None);
        let z = fx.sym("z");
        let err = lookup(&fx.heap, inner, z).unwrap_err();
        assert_eq!(err.to_string(), "undefined symbol: z");
    }

    #[test]
    fn extend_binds_most_recent_first() {
        let mut fx = Fixture::new();
        let global = root(&mut fx.heap);
        let a = fx.sym("a");
        let b = fx.sym("b");
        let params = {
            let (a, b) = (fx.heap.retain(a), fx.heap.retain(b));
            fx.heap.list(vec![a, b])
        };
        let args = {
            let (one, two) = (fx.int(1), fx.int(2));
            fx.heap.list(vec![one, two])
        };
        let frame = extend(&mut fx.heap, global, params, args, "closure").unwrap();
        let bindings = fx.heap.as_frame(frame).unwrap().bindings;
        let first = fx.heap.head(bindings).unwrap();
        assert_eq!(fx.heap.head(first), Ok(b));
        assert_eq!(fx.value_of(frame, a), Some(1));
    }

    #[test]
    fn extend_rejects_arity_mismatch() {
        let mut fx = Fixture::new();
        let global = root(&mut fx.heap);
        let a = fx.sym("a");
        let param = fx.heap.retain(a);
        let params = fx.heap.list(vec![param]);
        let nil = fx.heap.nil();
        match extend(&mut fx.heap, global, params, nil, "closure") {
            Err(Error::BadArgCount(e)) => assert_eq!(
                e.to_string(),
                "when evaluating closure expected exactly 1 arguments, but received 0 arguments"
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn binding_is_mutable_in_place() {
        let mut fx = Fixture::new();
        let env = root(&mut fx.heap);
        let x = fx.sym("x");
        let ten = fx.int(10);
        define(&mut fx.heap, env, x, ten).unwrap();
        fx.heap.release(ten);

        let eleven = fx.int(11);
        let binding = lookup(&fx.heap, env, x).unwrap();
        let live = fx.heap.stats().live();
        fx.heap.reassign(binding, Field::Tail, eleven).unwrap();
        assert_eq!(fx.value_of(env, x), Some(11));
        assert_eq!(fx.heap.stats().live(), live - 1);
    }

    #[test]
    fn released_frame_leaves_nothing_behind() {
        let mut fx = Fixture::new();
        let global = root(&mut fx.heap);
        let a = fx.sym("a");
        let live = fx.heap.stats().live();
        let param = fx.heap.retain(a);
        let params = fx.heap.list(vec![param]);
        let seven = fx.int(7);
        let args = fx.heap.list(vec![seven]);
        let frame = extend(&mut fx.heap, global, params, args, "closure").unwrap();
        fx.heap.release(params);
        fx.heap.release(args);
        fx.heap.release(frame);
        assert_eq!(fx.heap.stats().live(), live);
        assert_eq!(fx.heap.count(global), 1);
    }
}
