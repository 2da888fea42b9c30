//! Macro expansion at three depths: one step, to a fixed point at the top of
//! a form, and everywhere inside it.
//!
//! Expanding never evaluates the arguments of a macro call. The macro's
//! parameters are bound to the raw argument forms and its body is run like a
//! closure body; whatever it returns is new code.

use crate::environment;
use crate::evaluator::{self, Result};
use crate::interpreter::Interpreter;
use crate::printer::pr_str;
use crate::types::{ObjRef, Object, Procedure};

/// If `form` is an application whose head symbol is bound to a macro, returns
/// the (borrowed) macro object and its procedure.
fn macro_procedure(ctx: &Interpreter, env: ObjRef, form: ObjRef) -> Option<(ObjRef, Procedure)> {
    let head = ctx.heap.head(form).ok()?;
    ctx.heap.symbol_name(head).ok()?;
    let binding = environment::find(&ctx.heap, env, head)?;
    let value = ctx.heap.tail(binding).ok()?;
    match ctx.heap.get(value) {
        Object::Macro(procedure) => Some((value, *procedure)),
        _ => None,
    }
}

pub fn is_macro_call(ctx: &Interpreter, env: ObjRef, form: ObjRef) -> bool {
    macro_procedure(ctx, env, form).is_some()
}

/// Expands a macro call once. Anything else is returned as it is.
pub fn expand_once(ctx: &mut Interpreter, env: ObjRef, form: ObjRef) -> Result {
    let (mac, procedure) = match macro_procedure(ctx, env, form) {
        Some(found) => found,
        None => return Ok(ctx.heap.retain(form)),
    };
    let args = ctx.heap.tail(form)?;
    ctx.heap.retain(mac);
    let expansion = evaluator::invoke(ctx, procedure, args, "macro");
    ctx.heap.release(mac);
    if let Ok(expansion) = &expansion {
        log::debug!(
            "expanded {} into {}",
            pr_str(&ctx.heap, form),
            pr_str(&ctx.heap, *expansion)
        );
    }
    expansion
}

/// Expands the head of `form` until it is no longer a macro call. A macro
/// which expands into a call of itself never terminates.
pub fn expand(ctx: &mut Interpreter, env: ObjRef, form: ObjRef) -> Result {
    let mut current = ctx.heap.retain(form);
    while is_macro_call(ctx, env, current) {
        let next = expand_once(ctx, env, current);
        ctx.heap.release(current);
        current = next?;
    }
    Ok(current)
}

/// Expands `form`, then every element of the result, recursively. When no
/// element changes, the expanded form itself is returned rather than a copy.
pub fn expand_all(ctx: &mut Interpreter, env: ObjRef, form: ObjRef) -> Result {
    let expanded = expand(ctx, env, form)?;
    if !ctx.heap.is_pair(expanded) {
        return Ok(expanded);
    }
    let (items, tail) = ctx.heap.list_parts(expanded);
    let mut rewritten = Vec::with_capacity(items.len());
    for &item in &items {
        match expand_all(ctx, env, item) {
            Ok(new) => rewritten.push(new),
            Err(e) => {
                for new in rewritten {
                    ctx.heap.release(new);
                }
                ctx.heap.release(expanded);
                return Err(e);
            }
        }
    }
    if rewritten == items {
        for new in rewritten {
            ctx.heap.release(new);
        }
        return Ok(expanded);
    }
    let tail = ctx.heap.retain(tail);
    let rebuilt = ctx.heap.list_with_tail(rewritten, tail);
    ctx.heap.release(expanded);
    Ok(rebuilt)
}
