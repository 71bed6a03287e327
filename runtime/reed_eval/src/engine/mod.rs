//! The step engine.
//!
//! `step` advances a Job by exactly one frame transition: pop the top
//! frame, run it once, push whatever it needs next. All evaluation state
//! lives in the frames and the scope chain, never on the Rust call
//! stack, so the engine can stop after any step — at a budget boundary
//! or a native suspension — and pick up exactly where it left off.
//!
//! Non-local control flow (`break`, `continue`, `return`, `goto`) is an
//! explicit unwind over the frame stack: pop frames one at a time,
//! undoing their scopes, until the matching target frame is found.

pub mod frame;

mod call;
mod expr;
mod stmt;

use reed_ir::Name;

use crate::errors::{self, EvalResult};
use crate::job::Job;
use crate::value::Value;

use frame::{Frame, RetExp};

/// What one `step` did, as seen by the scheduler.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StepOutcome {
    /// More frames remain.
    Running,
    /// A native suspended; the Job waits for a host `resume`.
    Suspended,
    /// The continuation stack is empty; the Job is finished.
    Done,
    /// A fatal error was recorded on the Job.
    Failed,
}

/// Internal continuation signal from a frame handler.
pub(crate) enum Control {
    Next,
    Suspend,
}

/// Advance `job` by one frame transition.
pub(crate) fn step(job: &mut Job) -> EvalResult<StepOutcome> {
    let Some(frame) = job.frames.pop() else {
        return Ok(StepOutcome::Done);
    };
    let span = frame.span();
    let control = dispatch(job, frame).map_err(|e| e.with_span(span))?;
    match control {
        Control::Suspend => Ok(StepOutcome::Suspended),
        Control::Next => {
            if job.frames.is_empty() {
                Ok(StepOutcome::Done)
            } else {
                Ok(StepOutcome::Running)
            }
        }
    }
}

fn dispatch(job: &mut Job, frame: Frame) -> EvalResult<Control> {
    match frame {
        Frame::Eval { expr } => expr::run_eval(job, expr),
        Frame::Binary {
            op,
            left,
            right,
            span,
            step,
            lhs,
        } => expr::run_binary(job, op, left, right, span, step, lhs),
        Frame::Logical {
            op,
            left,
            right,
            span,
            step,
            lhs,
        } => expr::run_logical(job, op, left, right, span, step, lhs),
        Frame::Unary {
            op,
            operand,
            span,
            step,
        } => expr::run_unary(job, op, operand, span, step),
        Frame::Assign {
            op,
            target,
            value,
            span,
            step,
            place,
            assigned,
        } => expr::run_assign(job, op, target, value, span, step, place, assigned),
        Frame::IncDec {
            op,
            prefix,
            target,
            span,
            step,
            result,
        } => expr::run_inc_dec(job, op, prefix, target, span, step, result),
        Frame::Index {
            target,
            index,
            span,
            step,
            base,
        } => expr::run_index(job, target, index, span, step, base),
        Frame::Member {
            target,
            member,
            span,
            step,
        } => expr::run_member(job, target, member, span, step),
        Frame::Call {
            callee,
            args,
            span,
            step,
            func,
            argv,
            argi,
        } => call::run_call(job, callee, args, span, step, func, argv, argi),
        Frame::Invoke {
            func,
            span,
            step,
            argv,
            saved_depth,
        } => call::run_invoke(job, func, span, step, argv, saved_depth),
        Frame::ArrayLit {
            elems,
            span,
            idx,
            acc,
        } => expr::run_array_lit(job, elems, span, idx, acc),
        Frame::Stmt { stmt, step } => stmt::run_stmt(job, stmt, step),
        Frame::Block {
            range,
            idx,
            scoped,
            entered,
        } => stmt::run_block(job, range, idx, scoped, entered),
        Frame::If {
            cond,
            then_branch,
            else_branch,
            step,
        } => stmt::run_if(job, cond, then_branch, else_branch, step),
        Frame::While { cond, body, step } => stmt::run_while(job, cond, body, step),
        Frame::For {
            init,
            cond,
            update,
            body,
            step,
        } => stmt::run_for(job, init, cond, update, body, step),
        Frame::Return { value, span, step } => stmt::run_return(job, value, span, step),
        Frame::SetDefBody {
            name,
            body,
            idx,
            entered,
        } => stmt::run_set_def(job, name, body, idx, entered),
    }
}

/// Take the pending expression result. A missing result is an engine
/// invariant violation; Nil keeps it from cascading in release builds.
pub(crate) fn take_ret(job: &mut Job) -> RetExp {
    debug_assert!(job.ret.is_some(), "frame consumed a result that was never produced");
    job.ret.take().unwrap_or(RetExp::Value(Value::Nil))
}

/// Take the pending result as a plain value.
pub(crate) fn take_value(job: &mut Job) -> Value {
    take_ret(job).value()
}

// Unwinding

/// `break`: pop frames to the nearest loop frame and remove it.
pub(crate) fn unwind_break(job: &mut Job) -> EvalResult<()> {
    loop {
        let Some(top) = job.frames.pop() else {
            return Err(errors::break_outside_loop());
        };
        match top {
            Frame::While { .. } | Frame::For { .. } => return Ok(()),
            Frame::Block {
                scoped: true,
                entered: true,
                ..
            } => {
                job.scopes.pop();
            }
            Frame::Invoke { .. } | Frame::SetDefBody { .. } => {
                return Err(errors::break_outside_loop());
            }
            _ => {}
        }
    }
}

/// `continue`: pop frames to the nearest loop frame and leave it on top.
/// Loop frames already sit in their after-body state, so exposing one
/// resumes at the condition (while) or the update clause (for).
pub(crate) fn unwind_continue(job: &mut Job) -> EvalResult<()> {
    loop {
        match job.frames.last() {
            None => return Err(errors::continue_outside_loop()),
            Some(Frame::While { .. } | Frame::For { .. }) => return Ok(()),
            Some(Frame::Invoke { .. } | Frame::SetDefBody { .. }) => {
                return Err(errors::continue_outside_loop());
            }
            Some(_) => {}
        }
        let popped = job.frames.pop();
        if let Some(Frame::Block {
            scoped: true,
            entered: true,
            ..
        }) = popped
        {
            job.scopes.pop();
        }
    }
}

/// `goto`: pop frames outward until an enclosing statement-list frame
/// contains the label, then continue that frame at the label's position.
/// Function and set-definition boundaries are hard stops.
pub(crate) fn unwind_goto(job: &mut Job, label: Name) -> EvalResult<()> {
    let module = job.module_rc();
    let find = |range: reed_ir::StmtRange| {
        module.stmts_in(range).iter().position(|&id| {
            matches!(module.stmt(id).kind, reed_ir::StmtKind::Label(l) if l == label)
        })
    };
    loop {
        let found = match job.frames.last() {
            None | Some(Frame::Invoke { .. }) => {
                return Err(errors::undefined_label(job.name_str(label)));
            }
            Some(Frame::Block { range, .. }) => find(*range),
            Some(Frame::SetDefBody { body, .. }) => {
                // A set body is a jump boundary of its own.
                let Some(pos) = find(*body) else {
                    return Err(errors::undefined_label(job.name_str(label)));
                };
                Some(pos)
            }
            Some(_) => None,
        };

        if let Some(pos) = found {
            #[expect(clippy::cast_possible_truncation, reason = "statement lists are u32-indexed")]
            if let Some(Frame::Block { idx, .. } | Frame::SetDefBody { idx, .. }) =
                job.frames.last_mut()
            {
                *idx = pos as u32;
            }
            return Ok(());
        }

        // Not here; discard the frame and keep walking out.
        if let Some(Frame::Block {
            scoped: true,
            entered: true,
            ..
        }) = job.frames.pop()
        {
            job.scopes.pop();
        }
    }
}

/// `return`: truncate the continuation stack to the function's entry
/// frame and hand it the return value. A top-level return ends the Job
/// with that value as its result.
pub(crate) fn unwind_return(job: &mut Job, value: Value) {
    match job.scopes.current_func_entry() {
        None => {
            job.frames.clear();
            job.ret = Some(RetExp::Value(value));
        }
        Some(entry) => {
            job.frames.truncate(entry + 1);
            if let Some(Frame::Invoke { step, .. }) = job.frames.last_mut() {
                *step = 2;
            } else {
                debug_assert!(false, "function entry marker does not point at a call frame");
            }
            job.ret = Some(RetExp::Value(value));
        }
    }
}
