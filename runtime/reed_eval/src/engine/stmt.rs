//! Statement frame handlers.

use std::collections::BTreeMap;
use std::rc::Rc;

use reed_ir::{ExprId, Name, Span, StmtId, StmtKind, StmtRange};

use crate::errors::EvalResult;
use crate::job::Job;
use crate::object::SetDef;
use crate::value::{duplicate, FuncValue, Value, Var};

use super::frame::{Frame, RetExp};
use super::{take_value, unwind_break, unwind_continue, unwind_goto, unwind_return, Control};

/// Dispatch one statement node; simple kinds resolve in a single step.
pub(super) fn run_stmt(job: &mut Job, stmt: StmtId, step: u8) -> EvalResult<Control> {
    let module = job.module_rc();
    let node = module.stmt(stmt);
    let span = node.span;
    match node.kind {
        StmtKind::Expr(expr) => {
            if step == 0 {
                job.frames.push(Frame::Stmt { stmt, step: 1 });
                job.frames.push(Frame::Eval { expr });
            } else {
                // Expression statements discard their result.
                job.ret = None;
            }
        }
        StmtKind::Block(range) => job.frames.push(Frame::Block {
            range,
            idx: 0,
            scoped: true,
            entered: false,
        }),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => job.frames.push(Frame::If {
            cond,
            then_branch,
            else_branch,
            step: 0,
        }),
        StmtKind::While { cond, body } => job.frames.push(Frame::While { cond, body, step: 0 }),
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => job.frames.push(Frame::For {
            init,
            cond,
            update,
            body,
            step: 0,
        }),
        StmtKind::Return(value) => job.frames.push(Frame::Return {
            value,
            span,
            step: 0,
        }),
        StmtKind::Break => unwind_break(job).map_err(|e| e.with_span(span))?,
        StmtKind::Continue => unwind_continue(job).map_err(|e| e.with_span(span))?,
        StmtKind::Goto(label) => unwind_goto(job, label).map_err(|e| e.with_span(span))?,
        StmtKind::Label(_) => {}
        StmtKind::FuncDef(fid) => {
            let decl = module.func(fid);
            let func = Rc::new(FuncValue::Script {
                name: decl.name,
                func: fid,
            });
            job.scopes.join(decl.name, Var::new(Value::Func(func)));
        }
        StmtKind::SetDef { name, body } => job.frames.push(Frame::SetDefBody {
            name,
            body,
            idx: 0,
            entered: false,
        }),
    }
    Ok(Control::Next)
}

/// Statement-list runner backing blocks and the module body.
pub(super) fn run_block(
    job: &mut Job,
    range: StmtRange,
    idx: u32,
    scoped: bool,
    entered: bool,
) -> EvalResult<Control> {
    if scoped && !entered {
        job.scopes.push_block();
    }
    let module = job.module_rc();
    let stmts = module.stmts_in(range);
    if (idx as usize) < stmts.len() {
        let next = stmts[idx as usize];
        job.frames.push(Frame::Block {
            range,
            idx: idx + 1,
            scoped,
            entered: true,
        });
        job.frames.push(Frame::Stmt { stmt: next, step: 0 });
    } else if scoped {
        job.scopes.pop();
    }
    Ok(Control::Next)
}

pub(super) fn run_if(
    job: &mut Job,
    cond: ExprId,
    then_branch: StmtId,
    else_branch: Option<StmtId>,
    step: u8,
) -> EvalResult<Control> {
    if step == 0 {
        job.frames.push(Frame::If {
            cond,
            then_branch,
            else_branch,
            step: 1,
        });
        job.frames.push(Frame::Eval { expr: cond });
    } else {
        let taken = take_value(job).is_truthy();
        if taken {
            job.frames.push(Frame::Stmt {
                stmt: then_branch,
                step: 0,
            });
        } else if let Some(els) = else_branch {
            job.frames.push(Frame::Stmt { stmt: els, step: 0 });
        }
    }
    Ok(Control::Next)
}

pub(super) fn run_while(
    job: &mut Job,
    cond: ExprId,
    body: StmtId,
    step: u8,
) -> EvalResult<Control> {
    if step == 0 {
        job.frames.push(Frame::While { cond, body, step: 1 });
        job.frames.push(Frame::Eval { expr: cond });
    } else {
        let continue_loop = take_value(job).is_truthy();
        if continue_loop {
            // Re-arm at the condition; the body runs on top of us, so a
            // `continue` that pops back to this frame re-tests the
            // condition.
            job.frames.push(Frame::While { cond, body, step: 0 });
            job.frames.push(Frame::Stmt { stmt: body, step: 0 });
        }
    }
    Ok(Control::Next)
}

/// For-loop steps: 0 launches the init clause, 1 discards the previous
/// clause's value and launches the condition, 2 tests it and launches
/// the body, 3 launches the update clause and loops back to 1. The frame
/// sits at step 3 while the body runs, so `continue` lands on the update
/// clause.
pub(super) fn run_for(
    job: &mut Job,
    init: Option<ExprId>,
    cond: Option<ExprId>,
    update: Option<ExprId>,
    body: StmtId,
    step: u8,
) -> EvalResult<Control> {
    match step {
        0 => {
            job.frames.push(Frame::For {
                init,
                cond,
                update,
                body,
                step: 1,
            });
            if let Some(init) = init {
                job.frames.push(Frame::Eval { expr: init });
            } else {
                job.ret = Some(RetExp::Value(Value::Nil));
            }
        }
        1 => {
            job.ret = None;
            job.frames.push(Frame::For {
                init,
                cond,
                update,
                body,
                step: 2,
            });
            match cond {
                Some(cond) => job.frames.push(Frame::Eval { expr: cond }),
                // An absent condition is always true.
                None => job.ret = Some(RetExp::Value(Value::Bool(true))),
            }
        }
        2 => {
            let continue_loop = take_value(job).is_truthy();
            if continue_loop {
                job.frames.push(Frame::For {
                    init,
                    cond,
                    update,
                    body,
                    step: 3,
                });
                job.frames.push(Frame::Stmt { stmt: body, step: 0 });
            }
        }
        _ => {
            job.frames.push(Frame::For {
                init,
                cond,
                update,
                body,
                step: 1,
            });
            if let Some(update) = update {
                job.frames.push(Frame::Eval { expr: update });
            } else {
                job.ret = Some(RetExp::Value(Value::Nil));
            }
        }
    }
    Ok(Control::Next)
}

pub(super) fn run_return(
    job: &mut Job,
    value: Option<ExprId>,
    span: Span,
    step: u8,
) -> EvalResult<Control> {
    if step == 0 {
        if let Some(expr) = value {
            job.frames.push(Frame::Return {
                value,
                span,
                step: 1,
            });
            job.frames.push(Frame::Eval { expr });
        } else {
            unwind_return(job, Value::Nil);
        }
    } else {
        let v = take_value(job);
        unwind_return(job, v);
    }
    Ok(Control::Next)
}

/// Run a set body inside a Set scope, then freeze the scope's bindings
/// into a template visible to `new`. Redefinition replaces the previous
/// template; existing instances keep the one they were built from.
pub(super) fn run_set_def(
    job: &mut Job,
    name: Name,
    body: StmtRange,
    idx: u32,
    entered: bool,
) -> EvalResult<Control> {
    if !entered {
        job.scopes.push_set();
    }
    let module = job.module_rc();
    let stmts = module.stmts_in(body);
    if (idx as usize) < stmts.len() {
        let next = stmts[idx as usize];
        job.frames.push(Frame::SetDefBody {
            name,
            body,
            idx: idx + 1,
            entered: true,
        });
        job.frames.push(Frame::Stmt { stmt: next, step: 0 });
    } else if let Some(scope) = job.scopes.pop() {
        let members: BTreeMap<Name, Value> = scope
            .vars()
            .map(|(member, var)| (member, duplicate(&var.get())))
            .collect();
        job.sets.insert(name, Rc::new(SetDef { name, members }));
    }
    Ok(Control::Next)
}
