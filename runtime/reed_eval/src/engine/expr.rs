//! Expression frame handlers.
//!
//! Every handler advances its frame by exactly one transition: consume
//! the child result left in `job.ret` (if any), do one piece of work,
//! and either push the next child (re-pushing itself with the step
//! advanced) or leave its own result in `job.ret`.

use smallvec::smallvec;

use reed_ir::{BinaryOp, ExprId, ExprKind, ExprRange, IncDecOp, LogicalOp, Name, Span, UnaryOp};

use crate::array::ArrayRef;
use crate::errors::{self, EvalResult};
use crate::job::Job;
use crate::object::{Object, ObjectRef};
use crate::operators;
use crate::value::{duplicate, Value, Var, Watch};

use super::frame::{ArgVec, Frame, RetExp};
use super::{take_ret, take_value, Control};

/// Dispatch one expression node. Leaves resolve immediately; compound
/// expressions are replaced by their dedicated frame.
pub(super) fn run_eval(job: &mut Job, expr: ExprId) -> EvalResult<Control> {
    let module = job.module_rc();
    let node = module.expr(expr);
    let span = node.span;
    match node.kind {
        ExprKind::Nil => job.ret = Some(RetExp::Value(Value::Nil)),
        ExprKind::Int(n) => job.ret = Some(RetExp::Value(Value::Int(n))),
        ExprKind::Real(r) => job.ret = Some(RetExp::Value(Value::Real(r))),
        ExprKind::Bool(b) => job.ret = Some(RetExp::Value(Value::Bool(b))),
        ExprKind::Str(name) => {
            let text = job.name_str(name);
            job.ret = Some(RetExp::Value(Value::string(text)));
        }
        ExprKind::Ident(name) => {
            // Reading an unknown name vivifies a Nil binding in the
            // innermost scope, so every identifier is a place.
            let var = match job.scopes.search(name, false) {
                Some(var) => var,
                None => {
                    let var = Var::nil();
                    job.scopes.join(name, var.clone());
                    var
                }
            };
            job.ret = Some(RetExp::Place(var));
        }
        ExprKind::New { set } => {
            let Some(set) = job.sets.get(&set).cloned() else {
                return Err(errors::undefined_set(job.name_str(set)).with_span(span));
            };
            let obj = ObjectRef::new(Object::instance(&set));
            job.scopes.current_arena_mut().track_object(&obj);
            job.ret = Some(RetExp::Value(Value::Object(obj)));
        }
        ExprKind::Binary { op, left, right } => job.frames.push(Frame::Binary {
            op,
            left,
            right,
            span,
            step: 0,
            lhs: None,
        }),
        ExprKind::Logical { op, left, right } => job.frames.push(Frame::Logical {
            op,
            left,
            right,
            span,
            step: 0,
            lhs: false,
        }),
        ExprKind::Unary { op, operand } => job.frames.push(Frame::Unary {
            op,
            operand,
            span,
            step: 0,
        }),
        ExprKind::Assign { op, target, value } => job.frames.push(Frame::Assign {
            op,
            target,
            value,
            span,
            step: 0,
            place: None,
            assigned: None,
        }),
        ExprKind::IncDec { op, prefix, target } => job.frames.push(Frame::IncDec {
            op,
            prefix,
            target,
            span,
            step: 0,
            result: None,
        }),
        ExprKind::Index { target, index } => job.frames.push(Frame::Index {
            target,
            index,
            span,
            step: 0,
            base: None,
        }),
        ExprKind::Member { target, member } => job.frames.push(Frame::Member {
            target,
            member,
            span,
            step: 0,
        }),
        ExprKind::Call { callee, args } => job.frames.push(Frame::Call {
            callee,
            args,
            span,
            step: 0,
            func: None,
            argv: ArgVec::new(),
            argi: 0,
        }),
        ExprKind::ArrayLit { elems } => job.frames.push(Frame::ArrayLit {
            elems,
            span,
            idx: 0,
            acc: None,
        }),
    }
    Ok(Control::Next)
}

#[expect(clippy::too_many_arguments, reason = "frame fields arrive destructured")]
pub(super) fn run_binary(
    job: &mut Job,
    op: BinaryOp,
    left: ExprId,
    right: ExprId,
    span: Span,
    step: u8,
    lhs: Option<Value>,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::Binary {
                op,
                left,
                right,
                span,
                step: 1,
                lhs: None,
            });
            job.frames.push(Frame::Eval { expr: left });
        }
        1 => {
            let l = take_value(job);
            job.frames.push(Frame::Binary {
                op,
                left,
                right,
                span,
                step: 2,
                lhs: Some(l),
            });
            job.frames.push(Frame::Eval { expr: right });
        }
        _ => {
            let r = take_value(job);
            let l = lhs.unwrap_or(Value::Nil);
            let result = operators::evaluate_binary(op, &l, &r)?;
            job.ret = Some(RetExp::Value(result));
        }
    }
    Ok(Control::Next)
}

#[expect(clippy::too_many_arguments, reason = "frame fields arrive destructured")]
pub(super) fn run_logical(
    job: &mut Job,
    op: LogicalOp,
    left: ExprId,
    right: ExprId,
    span: Span,
    step: u8,
    lhs: bool,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::Logical {
                op,
                left,
                right,
                span,
                step: 1,
                lhs: false,
            });
            job.frames.push(Frame::Eval { expr: left });
        }
        1 => {
            let l = take_value(job).is_truthy();
            match op {
                // Short circuits.
                LogicalOp::And if !l => job.ret = Some(RetExp::Value(Value::Bool(false))),
                LogicalOp::Or if l => job.ret = Some(RetExp::Value(Value::Bool(true))),
                _ => {
                    job.frames.push(Frame::Logical {
                        op,
                        left,
                        right,
                        span,
                        step: 2,
                        lhs: l,
                    });
                    job.frames.push(Frame::Eval { expr: right });
                }
            }
        }
        _ => {
            let r = take_value(job).is_truthy();
            let result = match op {
                LogicalOp::And | LogicalOp::Or => r,
                LogicalOp::Xor => lhs ^ r,
            };
            job.ret = Some(RetExp::Value(Value::Bool(result)));
        }
    }
    Ok(Control::Next)
}

pub(super) fn run_unary(
    job: &mut Job,
    op: UnaryOp,
    operand: ExprId,
    span: Span,
    step: u8,
) -> EvalResult<Control> {
    if step == 0 {
        job.frames.push(Frame::Unary {
            op,
            operand,
            span,
            step: 1,
        });
        job.frames.push(Frame::Eval { expr: operand });
    } else {
        let v = take_value(job);
        job.ret = Some(RetExp::Value(operators::evaluate_unary(op, &v)?));
    }
    Ok(Control::Next)
}

/// Push a watch invocation: `func(data, new_value)` in statement
/// position; the interrupted frame restores its own result afterwards.
fn push_watch_call(job: &mut Job, watch: Watch, new_value: Value, span: Span) {
    let argv: ArgVec = smallvec![
        RetExp::Value(watch.data),
        RetExp::Value(new_value),
    ];
    job.frames.push(Frame::Invoke {
        func: watch.func,
        span,
        step: 0,
        argv,
        saved_depth: 0,
    });
}

#[expect(clippy::too_many_arguments, reason = "frame fields arrive destructured")]
pub(super) fn run_assign(
    job: &mut Job,
    op: Option<BinaryOp>,
    target: ExprId,
    value: ExprId,
    span: Span,
    step: u8,
    place: Option<Var>,
    assigned: Option<Value>,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::Assign {
                op,
                target,
                value,
                span,
                step: 1,
                place: None,
                assigned: None,
            });
            job.frames.push(Frame::Eval { expr: target });
        }
        1 => {
            let RetExp::Place(var) = take_ret(job) else {
                return Err(errors::invalid_assign_target().with_span(span));
            };
            job.frames.push(Frame::Assign {
                op,
                target,
                value,
                span,
                step: 2,
                place: Some(var),
                assigned: None,
            });
            job.frames.push(Frame::Eval { expr: value });
        }
        2 => {
            let rhs = take_value(job);
            let var = place.unwrap_or_else(Var::nil);
            let new = match op {
                Some(op) => operators::evaluate_binary(op, &var.get(), &rhs)?,
                None => duplicate(&rhs),
            };
            let watch = var.set(new.clone())?;
            match watch {
                Some(watch) => {
                    // Run the watch, then restore the assigned value as
                    // this expression's result.
                    job.frames.push(Frame::Assign {
                        op,
                        target,
                        value,
                        span,
                        step: 3,
                        place: Some(var),
                        assigned: Some(new.clone()),
                    });
                    push_watch_call(job, watch, new, span);
                }
                None => job.ret = Some(RetExp::Value(new)),
            }
        }
        _ => {
            job.ret = Some(RetExp::Value(assigned.unwrap_or(Value::Nil)));
        }
    }
    Ok(Control::Next)
}

#[expect(clippy::too_many_arguments, reason = "frame fields arrive destructured")]
pub(super) fn run_inc_dec(
    job: &mut Job,
    op: IncDecOp,
    prefix: bool,
    target: ExprId,
    span: Span,
    step: u8,
    result: Option<Value>,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::IncDec {
                op,
                prefix,
                target,
                span,
                step: 1,
                result: None,
            });
            job.frames.push(Frame::Eval { expr: target });
        }
        1 => {
            let RetExp::Place(var) = take_ret(job) else {
                return Err(errors::invalid_assign_target().with_span(span));
            };
            let old = var.get();
            let new = operators::evaluate_inc_dec(op, &old)?;
            let watch = var.set(new.clone())?;
            let produced = if prefix { new.clone() } else { old };
            match watch {
                Some(watch) => {
                    job.frames.push(Frame::IncDec {
                        op,
                        prefix,
                        target,
                        span,
                        step: 2,
                        result: Some(produced),
                    });
                    push_watch_call(job, watch, new, span);
                }
                None => job.ret = Some(RetExp::Value(produced)),
            }
        }
        _ => {
            job.ret = Some(RetExp::Value(result.unwrap_or(Value::Nil)));
        }
    }
    Ok(Control::Next)
}

/// Resolve the evaluated target of `[]` or `.` to its container,
/// vivifying an empty one when the target is a Nil place.
fn container_of(job: &mut Job, target: RetExp, op: &'static str) -> EvalResult {
    let value = target.value();
    if !value.is_nil() {
        return Ok(value);
    }
    let RetExp::Place(var) = target else {
        return Err(errors::operation_not_supported("nil", op));
    };
    if var.is_frozen() {
        return Err(errors::frozen_value());
    }
    // Vivification is initialization, not an observed mutation: it
    // writes directly and does not fire a watch.
    let value = match op {
        "[]" => {
            let arr = ArrayRef::new();
            job.scopes.current_arena_mut().track_array(&arr);
            Value::Array(arr)
        }
        _ => {
            let obj = ObjectRef::new(Object::bare());
            job.scopes.current_arena_mut().track_object(&obj);
            Value::Object(obj)
        }
    };
    var.force_set(value.clone());
    Ok(value)
}

pub(super) fn run_index(
    job: &mut Job,
    target: ExprId,
    index: Option<ExprId>,
    span: Span,
    step: u8,
    base: Option<ArrayRef>,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::Index {
                target,
                index,
                span,
                step: 1,
                base: None,
            });
            job.frames.push(Frame::Eval { expr: target });
        }
        1 => {
            let resolved = take_ret(job);
            let arr = match container_of(job, resolved, "[]")? {
                Value::Array(arr) => arr,
                other => {
                    return Err(errors::operation_not_supported(other.type_name(), "[]"));
                }
            };
            match index {
                None => {
                    // Implicit-push form: allocate the next integer slot.
                    let var = arr.borrow_mut().get_or_create(None);
                    job.ret = Some(RetExp::Place(var));
                }
                Some(index_expr) => {
                    job.frames.push(Frame::Index {
                        target,
                        index,
                        span,
                        step: 2,
                        base: Some(arr),
                    });
                    job.frames.push(Frame::Eval { expr: index_expr });
                }
            }
        }
        _ => {
            let key = take_value(job);
            let Some(arr) = base else {
                return Err(errors::custom("index frame lost its array"));
            };
            let var = arr.borrow_mut().get_or_create(Some(&key));
            job.ret = Some(RetExp::Place(var));
        }
    }
    Ok(Control::Next)
}

pub(super) fn run_member(
    job: &mut Job,
    target: ExprId,
    member: Name,
    span: Span,
    step: u8,
) -> EvalResult<Control> {
    if step == 0 {
        job.frames.push(Frame::Member {
            target,
            member,
            span,
            step: 1,
        });
        job.frames.push(Frame::Eval { expr: target });
    } else {
        let resolved = take_ret(job);
        let obj = match container_of(job, resolved, ".")? {
            Value::Object(obj) => obj,
            other => {
                return Err(errors::operation_not_supported(other.type_name(), "."));
            }
        };
        let var = obj.borrow_mut().member_or_create(member);
        job.ret = Some(RetExp::Place(var));
    }
    Ok(Control::Next)
}

pub(super) fn run_array_lit(
    job: &mut Job,
    elems: ExprRange,
    span: Span,
    idx: u32,
    acc: Option<ArrayRef>,
) -> EvalResult<Control> {
    let arr = match acc {
        Some(arr) => arr,
        None => {
            let arr = ArrayRef::new();
            job.scopes.current_arena_mut().track_array(&arr);
            arr
        }
    };
    if idx > 0 {
        // Collect the element evaluated by the previous step.
        let v = take_value(job);
        arr.borrow_mut().push(duplicate(&v));
    }
    let module = job.module_rc();
    let elem_ids = module.exprs_in(elems);
    if (idx as usize) < elem_ids.len() {
        let next = elem_ids[idx as usize];
        job.frames.push(Frame::ArrayLit {
            elems,
            span,
            idx: idx + 1,
            acc: Some(arr),
        });
        job.frames.push(Frame::Eval { expr: next });
    } else {
        job.ret = Some(RetExp::Value(Value::Array(arr)));
    }
    Ok(Control::Next)
}
