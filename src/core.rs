use crate::evaluator::{self, eval, eval_list, Error};
use crate::heap::Heap;
use crate::interpreter::Interpreter;
use crate::macroexpand;
use crate::printer::pr_str;
use crate::special_forms::{DEFINE, DEFMACRO, DEFUN, IF, LAMBDA, QUOTE, SETQ};
use crate::types::{Arity, Int, ObjRef, Pair, PrimitiveFn};
use std::collections::HashMap;

/// Evaluates the operands of a function primitive and hands their values to
/// `f`. The values stay alive until `f` returns.
fn with_values<T>(
    ctx: &mut Interpreter,
    env: ObjRef,
    args: ObjRef,
    f: impl FnOnce(&mut Interpreter, &[ObjRef]) -> evaluator::Result<T>,
) -> evaluator::Result<T> {
    let values = eval_list(ctx, env, args)?;
    let result = match ctx.heap.list_to_vec(values) {
        Ok(items) => f(ctx, &items),
        Err(e) => Err(Error::TypeMismatch(e)),
    };
    ctx.heap.release(values);
    result
}

fn grab_ints(heap: &Heap, values: &[ObjRef]) -> evaluator::Result<Vec<Int>> {
    let type_check: Result<Vec<_>, _> = values.iter().map(|&v| heap.as_int(v)).collect();
    type_check.map_err(Error::TypeMismatch)
}

// With two or more operands the first one seeds the fold; otherwise the
// identity does, so that (- x) negates.
fn arithmetic_(
    ctx: &mut Interpreter,
    env: ObjRef,
    args: ObjRef,
    identity: Int,
    op: fn(Int, Int) -> Int,
) -> evaluator::Result {
    let ints = with_values(ctx, env, args, |ctx, values| grab_ints(&ctx.heap, values))?;
    let value = match ints.split_first() {
        Some((&first, rest)) if !rest.is_empty() => rest.iter().fold(first, |acc, &x| op(acc, x)),
        _ => ints.iter().fold(identity, |acc, &x| op(acc, x)),
    };
    Ok(ctx.heap.integer(value))
}

macro_rules! arithmetic_primitive {
    ($SYMBOL:tt, $NAME:ident, $IDENTITY:expr, $ARITY:expr) => {
        paste::item! {
            const $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| {
                    arithmetic_(ctx, env, args, $IDENTITY, Int:: [<wrapping_ $NAME:lower>])
                },
                arity: $ARITY,
            };
        }
    };
}

arithmetic_primitive!(+, ADD, 0, Arity::at_least(0));
arithmetic_primitive!(-, SUB, 0, Arity::at_least(1));
arithmetic_primitive!(*, MUL, 1, Arity::at_least(0));

const NUM_EQ: PrimitiveFn = PrimitiveFn {
    name: "=",
    fn_ptr: num_eq_,
    arity: Arity::exactly(2),
};

fn num_eq_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> evaluator::Result {
    let equal = with_values(ctx, env, args, |ctx, values| {
        let ints = grab_ints(&ctx.heap, values)?;
        Ok(ints[0] == ints[1])
    })?;
    Ok(ctx.heap.boolean(equal))
}

const EQ: PrimitiveFn = PrimitiveFn {
    name: "eq",
    fn_ptr: eq_,
    arity: Arity::exactly(2),
};

fn eq_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> evaluator::Result {
    let identical = with_values(ctx, env, args, |_, values| Ok(values[0] == values[1]))?;
    Ok(ctx.heap.boolean(identical))
}

const LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: eval_list,
    arity: Arity::at_least(0),
};

const CONS: PrimitiveFn = PrimitiveFn {
    name: "cons",
    fn_ptr: cons_,
    arity: Arity::exactly(2),
};

fn cons_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> evaluator::Result {
    with_values(ctx, env, args, |ctx, values| {
        Ok(ctx.heap.cons(values[0], values[1]))
    })
}

const CAR: PrimitiveFn = PrimitiveFn {
    name: "car",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| {
        pair_field(ctx, env, args, |pair| pair.head)
    },
    arity: Arity::exactly(1),
};

const CDR: PrimitiveFn = PrimitiveFn {
    name: "cdr",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| {
        pair_field(ctx, env, args, |pair| pair.tail)
    },
    arity: Arity::exactly(1),
};

// car and cdr of () are ().
fn pair_field(
    ctx: &mut Interpreter,
    env: ObjRef,
    args: ObjRef,
    field: fn(Pair) -> ObjRef,
) -> evaluator::Result {
    with_values(ctx, env, args, |ctx, values| {
        let target = values[0];
        if ctx.heap.is_nil(target) {
            return Ok(ctx.heap.owned_nil());
        }
        let pair = ctx.heap.as_pair(target)?;
        Ok(ctx.heap.retain(field(pair)))
    })
}

const PRINTLN: PrimitiveFn = PrimitiveFn {
    name: "println",
    fn_ptr: println_,
    arity: Arity::exactly(1),
};

fn println_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> evaluator::Result {
    let form = ctx.heap.head(args)?;
    let value = eval(ctx, env, form)?;
    let text = pr_str(&ctx.heap, value);
    ctx.heap.release(value);
    ctx.write_line(&text)?;
    Ok(ctx.heap.owned_nil())
}

const EXIT: PrimitiveFn = PrimitiveFn {
    name: "exit",
    fn_ptr: |_ctx: &mut Interpreter, _env: ObjRef, _args: ObjRef| Err(Error::Exit),
    arity: Arity::exactly(0),
};

type Expander = fn(&mut Interpreter, ObjRef, ObjRef) -> evaluator::Result;

// The operand is the form to expand; it is not evaluated.
fn expansion_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef, expander: Expander) -> evaluator::Result {
    let form = ctx.heap.head(args)?;
    expander(ctx, env, form)
}

const MACROEXPAND_1: PrimitiveFn = PrimitiveFn {
    name: "macroexpand-1",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| {
        expansion_(ctx, env, args, macroexpand::expand_once)
    },
    arity: Arity::exactly(1),
};

const MACROEXPAND: PrimitiveFn = PrimitiveFn {
    name: "macroexpand",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| {
        expansion_(ctx, env, args, macroexpand::expand)
    },
    arity: Arity::exactly(1),
};

const MACROEXPAND_ALL: PrimitiveFn = PrimitiveFn {
    name: "macroexpand-all",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| {
        expansion_(ctx, env, args, macroexpand::expand_all)
    },
    arity: Arity::exactly(1),
};

type Namespace = HashMap<&'static str, &'static PrimitiveFn>;
lazy_static! {
    pub static ref CORE: Namespace = {
        let mut map = Namespace::new();
        for func in [
            // Special forms
            QUOTE,
            IF,
            SETQ,
            DEFINE,
            DEFUN,
            DEFMACRO,
            LAMBDA,
            // Arithmetic
            ADD,
            SUB,
            MUL,
            NUM_EQ,
            // Working with lists
            LIST,
            CONS,
            CAR,
            CDR,
            EQ,
            // Macro introspection
            MACROEXPAND_1,
            MACROEXPAND,
            MACROEXPAND_ALL,
            // Other
            PRINTLN,
            EXIT,
        ].iter() {
            map.insert(func.name, func);
        }
        map
    };
}
