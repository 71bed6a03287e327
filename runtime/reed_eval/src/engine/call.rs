//! Calls: argument collection, activation, suspension and the epilogue.
//!
//! A `Call` frame evaluates the callee and then the arguments one per
//! step, keeping each result as a value-or-place so by-reference
//! parameters can alias the caller's storage. Once everything is in
//! hand it replaces itself with an `Invoke` frame.
//!
//! `Invoke` is the activation record. For a native it runs the handler
//! directly; a handler that returns `Suspend` parks the whole Job, and
//! the re-pushed frame picks the host's resume value up later. For a
//! script function it opens the callee scope, binds parameters, runs the
//! body, and an epilogue step tears the scope back down — which also
//! makes it the fixed target `return` unwinds to.

use reed_ir::{ExprId, ExprRange, Span};

use crate::errors::{self, EvalResult};
use crate::job::Job;
use crate::value::{duplicate, FuncRef, FuncValue, NativeOutcome, Value, Var};

use super::frame::{ArgVec, Frame, RetExp};
use super::{take_ret, take_value, Control};

#[expect(clippy::too_many_arguments, reason = "frame fields arrive destructured")]
pub(super) fn run_call(
    job: &mut Job,
    callee: ExprId,
    args: ExprRange,
    span: Span,
    step: u8,
    func: Option<FuncRef>,
    mut argv: ArgVec,
    argi: u32,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::Call {
                callee,
                args,
                span,
                step: 1,
                func: None,
                argv,
                argi: 0,
            });
            job.frames.push(Frame::Eval { expr: callee });
        }
        1 => {
            let resolved = take_value(job);
            let Value::Func(f) = resolved else {
                return Err(errors::not_callable(resolved.type_name()).with_span(span));
            };
            job.frames.push(Frame::Call {
                callee,
                args,
                span,
                step: 2,
                func: Some(f),
                argv,
                argi: 0,
            });
        }
        _ => {
            // One argument lands per step; argi counts launches.
            if (argi as usize) > argv.len() {
                argv.push(take_ret(job));
            }
            let module = job.module_rc();
            let arg_ids = module.exprs_in(args);
            if (argi as usize) < arg_ids.len() {
                let next = arg_ids[argi as usize];
                job.frames.push(Frame::Call {
                    callee,
                    args,
                    span,
                    step: 2,
                    func,
                    argv,
                    argi: argi + 1,
                });
                job.frames.push(Frame::Eval { expr: next });
            } else {
                let Some(func) = func else {
                    return Err(errors::custom("call frame lost its callee"));
                };
                job.frames.push(Frame::Invoke {
                    func,
                    span,
                    step: 0,
                    argv,
                    saved_depth: 0,
                });
            }
        }
    }
    Ok(Control::Next)
}

/// Turn a collected argument into the callee's parameter slot: places
/// alias, values get a fresh slot with a by-value copy.
fn arg_var(arg: &RetExp) -> Var {
    match arg {
        RetExp::Place(var) => var.clone(),
        RetExp::Value(v) => Var::new(duplicate(v)),
    }
}

pub(super) fn run_invoke(
    job: &mut Job,
    func: FuncRef,
    span: Span,
    step: u8,
    argv: ArgVec,
    saved_depth: usize,
) -> EvalResult<Control> {
    match step {
        0 => match &*func {
            FuncValue::Native { name, arity, f } => {
                if argv.len() != *arity {
                    return Err(errors::wrong_arg_count(
                        job.name_str(*name),
                        *arity,
                        argv.len(),
                    )
                    .with_span(span));
                }
                let handler = f.clone();
                let vars: Vec<Var> = argv.iter().map(arg_var).collect();
                match handler(job, &vars)? {
                    NativeOutcome::Return(v) => {
                        job.ret = Some(RetExp::Value(v));
                    }
                    NativeOutcome::Suspend => {
                        job.frames.push(Frame::Invoke {
                            func: func.clone(),
                            span,
                            step: 1,
                            argv,
                            saved_depth,
                        });
                        return Ok(Control::Suspend);
                    }
                }
            }
            FuncValue::Script { name, func: fid } => {
                let module = job.module_rc();
                let decl = module.func(*fid);
                if argv.len() != decl.params.len() {
                    return Err(errors::wrong_arg_count(
                        job.name_str(*name),
                        decl.params.len(),
                        argv.len(),
                    )
                    .with_span(span));
                }
                let depth = job.scopes.depth();
                // The frame is about to be re-pushed at this index; that
                // index is what `return` truncates the stack to.
                let entry = job.frames.len();
                job.scopes.push_func(entry);
                for (param, arg) in decl.params.iter().zip(argv.iter()) {
                    let var = if param.by_ref {
                        arg_var(arg)
                    } else {
                        Var::new(duplicate(&arg.value()))
                    };
                    job.scopes.join(param.name, var);
                }
                let body = decl.body;
                job.ret = None;
                job.frames.push(Frame::Invoke {
                    func: func.clone(),
                    span,
                    step: 2,
                    argv,
                    saved_depth: depth,
                });
                job.frames.push(Frame::Stmt { stmt: body, step: 0 });
            }
        },
        1 => {
            // Native resume: the host's value becomes the call's result.
            let v = job.resume.take().unwrap_or(Value::Nil);
            job.ret = Some(RetExp::Value(v));
        }
        _ => {
            // Script epilogue: tear the callee scopes down, folding the
            // callee arena into the caller's so escaped containers stay
            // tracked. `return` set the result; falling off the end
            // yields Nil.
            while job.scopes.depth() > saved_depth {
                match job.scopes.pop() {
                    Some(scope) => job.scopes.absorb_arena(scope),
                    None => break,
                }
            }
            if job.ret.is_none() {
                job.ret = Some(RetExp::Value(Value::Nil));
            }
        }
    }
    Ok(Control::Next)
}
