use crate::environment::{self, UnknownSymbol};
use crate::interpreter::Interpreter;
use crate::printer::pr_str;
use crate::types::{BadArgCount, ObjRef, Object, Pair, PrimitiveFn, Procedure, TypeMismatch};
use crate::{macroexpand, reader};
use std::fmt;

pub type Result<T = ObjRef> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Syntax(reader::Error),
    BadArgCount(BadArgCount),
    TypeMismatch(TypeMismatch),
    UnknownSymbol(UnknownSymbol),
    NotAFunction,
    Internal(String),
    Io(std::io::Error),
    // Raised by `(exit)`; the driver treats it as a successful end of the run.
    Exit,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "syntax error: {}", e),
            Error::BadArgCount(e) => write!(f, "{}", e),
            Error::TypeMismatch(e) => write!(f, "type mismatch: {}", e),
            Error::UnknownSymbol(e) => write!(f, "{}", e),
            Error::NotAFunction => write!(f, "head of list must denote a function"),
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Exit => write!(f, "exit requested"),
        }
    }
}

impl From<reader::Error> for Error {
    fn from(e: reader::Error) -> Self {
        Self::Syntax(e)
    }
}

impl From<TypeMismatch> for Error {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<UnknownSymbol> for Error {
    fn from(e: UnknownSymbol) -> Self {
        Self::UnknownSymbol(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Evaluates `form` in `env`. Both are borrowed; the result carries one
/// credit for the caller.
pub fn eval(ctx: &mut Interpreter, env: ObjRef, form: ObjRef) -> Result {
    match ctx.heap.get(form) {
        Object::Symbol(_) => {
            let binding = environment::lookup(&ctx.heap, env, form)?;
            let value = ctx.heap.tail(binding)?;
            Ok(ctx.heap.retain(value))
        }
        Object::Pair(_) => eval_application(ctx, env, form),
        Object::Environment(_) => Err(Error::Internal(format!(
            "cannot evaluate {}",
            pr_str(&ctx.heap, form)
        ))),
        _ => Ok(ctx.heap.retain(form)),
    }
}

fn eval_application(ctx: &mut Interpreter, env: ObjRef, form: ObjRef) -> Result {
    let expanded = macroexpand::expand(ctx, env, form)?;
    // A macro may expand to something other than an application, e.g. a literal.
    let pair = match ctx.heap.as_pair(expanded) {
        Ok(pair) => pair,
        Err(_) => return Ok(expanded),
    };
    let result = apply_form(ctx, env, pair);
    ctx.heap.release(expanded);
    result
}

fn apply_form(ctx: &mut Interpreter, env: ObjRef, Pair { head, tail }: Pair) -> Result {
    let callable = eval(ctx, env, head)?;
    let result = apply(ctx, env, callable, tail);
    ctx.heap.release(callable);
    result
}

/// Applies `callable` to the raw argument forms `args`. Primitives receive the
/// forms unevaluated; closures receive their values, evaluated left to right.
pub fn apply(ctx: &mut Interpreter, env: ObjRef, callable: ObjRef, args: ObjRef) -> Result {
    if !ctx.heap.is_list(args) {
        return Err(Error::TypeMismatch(TypeMismatch::NotAList));
    }
    match ctx.heap.get(callable) {
        Object::Primitive(func) => {
            let func = *func;
            call_primitive(ctx, env, func, args)
        }
        Object::Closure(procedure) => {
            let procedure = *procedure;
            let values = eval_list(ctx, env, args)?;
            log::trace!("apply {:?} to {}", callable, pr_str(&ctx.heap, values));
            let result = invoke(ctx, procedure, values, "closure");
            ctx.heap.release(values);
            result
        }
        _ => Err(Error::NotAFunction),
    }
}

pub fn call_primitive(ctx: &mut Interpreter, env: ObjRef, func: &'static PrimitiveFn, args: ObjRef) -> Result {
    let argc = ctx.heap.list_length(args)?;
    func.arity
        .validate_for(argc, func.name)
        .map_err(Error::BadArgCount)?;
    log::trace!("Call {} with {}", func.name, pr_str(&ctx.heap, args));
    let result = (func.fn_ptr)(ctx, env, args);
    match &result {
        Ok(val) => log::trace!("Call to {} resulted in {}", func.name, pr_str(&ctx.heap, *val)),
        Err(e) => log::trace!("Call to {} failed: {}", func.name, e),
    }
    result
}

/// Runs the body of a closure or macro in a fresh frame below its captured
/// environment, binding its parameters to the elements of `args`. The caller
/// must keep the procedure object alive for the duration of the call.
pub(crate) fn invoke(ctx: &mut Interpreter, procedure: Procedure, args: ObjRef, what: &'static str) -> Result {
    let frame = environment::extend(&mut ctx.heap, procedure.env, procedure.params, args, what)?;
    let result = progn(ctx, frame, procedure.body);
    ctx.heap.release(frame);
    result
}

/// Evaluates each form of `body` in order and returns the last value.
pub fn progn(ctx: &mut Interpreter, env: ObjRef, body: ObjRef) -> Result {
    let forms = ctx.heap.list_to_vec(body)?;
    let (last, init) = match forms.split_last() {
        Some(split) => split,
        None => return Err(Error::Internal("progn of an empty body".into())),
    };
    for &form in init {
        let value = eval(ctx, env, form)?;
        ctx.heap.release(value);
    }
    eval(ctx, env, *last)
}

/// Evaluates every element of `list` and returns a fresh list of the results.
pub fn eval_list(ctx: &mut Interpreter, env: ObjRef, list: ObjRef) -> Result {
    let forms = ctx.heap.list_to_vec(list)?;
    let mut values = Vec::with_capacity(forms.len());
    for form in forms {
        match eval(ctx, env, form) {
            Ok(value) => values.push(value),
            Err(e) => {
                for value in values {
                    ctx.heap.release(value);
                }
                return Err(e);
            }
        }
    }
    Ok(ctx.heap.list(values))
}
