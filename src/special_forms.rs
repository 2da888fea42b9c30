// Primitives which decide for themselves how their operands are evaluated.

use crate::environment;
use crate::evaluator::{eval, progn, Error, Result};
use crate::heap::Heap;
use crate::interpreter::Interpreter;
use crate::printer::pr_str;
use crate::types::{Arity, Field, ObjRef, Pair, PrimitiveFn, TypeMismatch};

pub(crate) const QUOTE: PrimitiveFn = PrimitiveFn {
    name: "quote",
    fn_ptr: quote_,
    arity: Arity::exactly(1),
};

fn quote_(ctx: &mut Interpreter, _env: ObjRef, args: ObjRef) -> Result {
    let quoted = ctx.heap.head(args)?;
    Ok(ctx.heap.retain(quoted))
}

pub(crate) const IF: PrimitiveFn = PrimitiveFn {
    name: "if",
    fn_ptr: if_,
    arity: Arity::at_least(2),
};

// (if cond then else...)
fn if_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> Result {
    let Pair { head: condition, tail: branches } = ctx.heap.as_pair(args)?;
    let Pair { head: then, tail: otherwise } = ctx.heap.as_pair(branches)?;
    let condition = eval(ctx, env, condition)?;
    let truthy = !ctx.heap.is_nil(condition);
    ctx.heap.release(condition);
    if truthy {
        eval(ctx, env, then)
    } else if ctx.heap.is_nil(otherwise) {
        Ok(ctx.heap.owned_nil())
    } else {
        progn(ctx, env, otherwise)
    }
}

pub(crate) const SETQ: PrimitiveFn = PrimitiveFn {
    name: "setq",
    fn_ptr: setq_,
    arity: Arity::exactly(2),
};

fn setq_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> Result {
    let (sym, form) = symbol_and_form(&ctx.heap, args)?;
    let binding = environment::lookup(&ctx.heap, env, sym)?;
    let binding = ctx.heap.retain(binding);
    let result = match eval(ctx, env, form) {
        Ok(value) => match ctx.heap.reassign(binding, Field::Tail, value) {
            Ok(()) => Ok(value),
            Err(e) => {
                ctx.heap.release(value);
                Err(Error::TypeMismatch(e))
            }
        },
        Err(e) => Err(e),
    };
    ctx.heap.release(binding);
    result
}

pub(crate) const DEFINE: PrimitiveFn = PrimitiveFn {
    name: "define",
    fn_ptr: define_,
    arity: Arity::exactly(2),
};

fn define_(ctx: &mut Interpreter, env: ObjRef, args: ObjRef) -> Result {
    let (sym, form) = symbol_and_form(&ctx.heap, args)?;
    let value = eval(ctx, env, form)?;
    bind(ctx, env, sym, value)
}

pub(crate) const DEFUN: PrimitiveFn = PrimitiveFn {
    name: "defun",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| define_procedure(ctx, env, args, false),
    arity: Arity::at_least(2),
};

pub(crate) const DEFMACRO: PrimitiveFn = PrimitiveFn {
    name: "defmacro",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| define_procedure(ctx, env, args, true),
    arity: Arity::at_least(2),
};

// (defun name (params...) body...)
fn define_procedure(ctx: &mut Interpreter, env: ObjRef, args: ObjRef, is_macro: bool) -> Result {
    let Pair { head: sym, tail: rest } = ctx.heap.as_pair(args)?;
    ctx.heap.symbol_name(sym)?;
    let procedure = make_procedure(ctx, env, rest, is_macro)?;
    bind(ctx, env, sym, procedure)
}

pub(crate) const LAMBDA: PrimitiveFn = PrimitiveFn {
    name: "lambda",
    fn_ptr: |ctx: &mut Interpreter, env: ObjRef, args: ObjRef| make_procedure(ctx, env, args, false),
    arity: Arity::at_least(1),
};

/// Builds a closure (or macro) from `((params...) body...)`, capturing `env`.
/// The body must hold at least one form.
fn make_procedure(ctx: &mut Interpreter, env: ObjRef, args: ObjRef, is_macro: bool) -> Result {
    let Pair { head: params, tail: body } = ctx.heap.as_pair(args)?;
    check_parameters(&ctx.heap, params)?;
    match ctx.heap.list_length(body)? {
        0 => Err(Error::TypeMismatch(TypeMismatch::EmptyBody)),
        _ => Ok(ctx.heap.procedure(is_macro, params, body, env)),
    }
}

fn check_parameters(heap: &Heap, params: ObjRef) -> std::result::Result<(), TypeMismatch> {
    let params = heap
        .list_to_vec(params)
        .map_err(|_| TypeMismatch::BadParameterList)?;
    match params.iter().all(|&p| heap.symbol_name(p).is_ok()) {
        true => Ok(()),
        false => Err(TypeMismatch::BadParameterList),
    }
}

// Splits `(symbol form)`, as taken by define and setq.
fn symbol_and_form(heap: &Heap, args: ObjRef) -> Result<(ObjRef, ObjRef)> {
    let Pair { head: sym, tail: rest } = heap.as_pair(args)?;
    heap.symbol_name(sym)?;
    Ok((sym, heap.head(rest)?))
}

// Adds `sym` to the current frame and hands the caller's credit on `value` back.
fn bind(ctx: &mut Interpreter, env: ObjRef, sym: ObjRef, value: ObjRef) -> Result {
    if let Err(e) = environment::define(&mut ctx.heap, env, sym, value) {
        ctx.heap.release(value);
        return Err(Error::TypeMismatch(e));
    }
    log::debug!(
        "define {} as {}",
        pr_str(&ctx.heap, sym),
        pr_str(&ctx.heap, value)
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(input: &str) -> String {
        Interpreter::new().rep_str(input).unwrap()
    }

    fn rep_err(input: &str) -> Error {
        Interpreter::new().rep_str(input).unwrap_err()
    }

    #[test]
    fn quote_returns_its_operand() {
        assert_eq!(rep("(quote (a b . c))"), "(a b . c)");
        assert_eq!(rep("'undefined"), "undefined");
        assert_eq!(
            rep_err("(quote a b)").to_string(),
            "when evaluating quote expected exactly 1 arguments, but received 2 arguments"
        );
    }

    #[test]
    fn if_treats_only_nil_as_false() {
        assert_eq!(rep("(if 0 1 2)"), "1");
        assert_eq!(rep("(if () 1 2)"), "2");
        assert_eq!(rep("(if () 1)"), "()");
        assert_eq!(rep("(if (= 1 1) 'yes undefined)"), "yes");
    }

    #[test]
    fn else_branch_is_a_progn() {
        assert_eq!(rep("(define n 0) (if () 1 (setq n 5) (+ n 1))"), "0\n6");
    }

    #[test]
    fn setq_needs_an_existing_binding() {
        match rep_err("(setq undefined 1)") {
            Error::UnknownSymbol(e) => assert_eq!(e.to_string(), "undefined symbol: undefined"),
            e => panic!("unexpected {:?}", e),
        }
        assert!(matches!(
            rep_err("(setq 1 2)"),
            Error::TypeMismatch(TypeMismatch::NotASymbol)
        ));
    }

    #[test]
    fn setq_updates_the_innermost_binding() {
        let input = "
            (define x 1)
            ((lambda (x) (setq x 2) x) 10)
            x";
        assert_eq!(rep(input), "1\n2\n1");
    }

    #[test]
    fn define_shadows_in_the_current_frame() {
        assert_eq!(rep("(define x 1) (define x 2) x"), "1\n2\n2");
    }

    #[test]
    fn define_inside_a_body_stays_local() {
        let input = "
            (defun f () (define local 3) local)
            (f)
            local";
        match Interpreter::new().rep_str(input) {
            Err(Error::UnknownSymbol(e)) => assert_eq!(e.0, "local"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defun_and_defmacro_return_what_they_bind() {
        assert_eq!(rep("(defun f (x) x)"), "<function>");
        assert_eq!(rep("(defmacro m (x) x)"), "<macro>");
        assert_eq!(rep("(lambda () 1)"), "<function>");
    }

    #[test]
    fn recursive_defun() {
        let input = "
            (defun count-down (n) (if (= n 0) 'done (count-down (- n 1))))
            (count-down 100)";
        assert_eq!(rep(input).lines().last(), Some("done"));
    }

    #[test]
    fn malformed_procedures() {
        assert!(matches!(
            rep_err("(lambda (x))"),
            Error::TypeMismatch(TypeMismatch::EmptyBody)
        ));
        assert!(matches!(
            rep_err("(lambda (x 1) x)"),
            Error::TypeMismatch(TypeMismatch::BadParameterList)
        ));
        assert!(matches!(
            rep_err("(lambda (x . y) x)"),
            Error::TypeMismatch(TypeMismatch::BadParameterList)
        ));
        assert!(matches!(
            rep_err("(lambda x x)"),
            Error::TypeMismatch(TypeMismatch::BadParameterList)
        ));
        assert!(matches!(
            rep_err("(defun 1 () 1)"),
            Error::TypeMismatch(TypeMismatch::NotASymbol)
        ));
        assert!(matches!(rep_err("(defun f)"), Error::BadArgCount(_)));
    }
}
