//! Continuation frames.
//!
//! The engine never recurses: every in-flight expression or statement is a
//! frame on the Job's continuation stack, and each frame carries a small
//! `step` counter marking how far through its children it has got. One
//! engine step pops the top frame, advances it once, and pushes whatever
//! it needs next — so the whole evaluation can stop between any two steps
//! and resume later with the stack intact.

use smallvec::SmallVec;

use reed_ir::{BinaryOp, ExprId, ExprRange, IncDecOp, LogicalOp, Name, Span, StmtId, StmtRange, UnaryOp};

use crate::array::ArrayRef;
use crate::value::{FuncRef, Value, Var};

/// An evaluation result travelling up the stack: either a plain value or
/// a place (an aliasable variable slot). Places are what assignment,
/// `++`/`--`, by-reference arguments and auto-vivification operate on.
#[derive(Clone, Debug)]
pub enum RetExp {
    Value(Value),
    Place(Var),
}

impl RetExp {
    /// Collapse to a value; a place reads its current contents.
    pub fn value(&self) -> Value {
        match self {
            RetExp::Value(v) => v.clone(),
            RetExp::Place(var) => var.get(),
        }
    }
}

/// Collected call arguments.
pub type ArgVec = SmallVec<[RetExp; 4]>;

/// One suspended computation on the continuation stack.
#[derive(Clone)]
pub enum Frame {
    // Expressions

    /// Dispatch an expression node; single-step for leaves, otherwise
    /// replaced by the dedicated frame below.
    Eval { expr: ExprId },

    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        span: Span,
        step: u8,
        lhs: Option<Value>,
    },

    Logical {
        op: LogicalOp,
        left: ExprId,
        right: ExprId,
        span: Span,
        step: u8,
        lhs: bool,
    },

    Unary {
        op: UnaryOp,
        operand: ExprId,
        span: Span,
        step: u8,
    },

    Assign {
        op: Option<BinaryOp>,
        target: ExprId,
        value: ExprId,
        span: Span,
        step: u8,
        place: Option<Var>,
        assigned: Option<Value>,
    },

    IncDec {
        op: IncDecOp,
        prefix: bool,
        target: ExprId,
        span: Span,
        step: u8,
        result: Option<Value>,
    },

    Index {
        target: ExprId,
        index: Option<ExprId>,
        span: Span,
        step: u8,
        base: Option<ArrayRef>,
    },

    Member {
        target: ExprId,
        member: Name,
        span: Span,
        step: u8,
    },

    /// Call in its argument-collection phase; replaced by `Invoke` once
    /// the callee and all arguments are in hand.
    Call {
        callee: ExprId,
        args: ExprRange,
        span: Span,
        step: u8,
        func: Option<FuncRef>,
        argv: ArgVec,
        argi: u32,
    },

    /// An activated function: native dispatch (with suspension support)
    /// or a script frame that owns its callee scope. The unwind target
    /// for `return`.
    Invoke {
        func: FuncRef,
        span: Span,
        step: u8,
        argv: ArgVec,
        saved_depth: usize,
    },

    ArrayLit {
        elems: ExprRange,
        span: Span,
        idx: u32,
        acc: Option<ArrayRef>,
    },

    // Statements

    /// Dispatch a statement node; single-step for simple kinds.
    Stmt { stmt: StmtId, step: u8 },

    /// Statement-list runner; the unwind target for `goto`.
    Block {
        range: StmtRange,
        idx: u32,
        /// Whether this block opened (and must pop) a scope. The module
        /// body runs directly in the root scope.
        scoped: bool,
        entered: bool,
    },

    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
        step: u8,
    },

    /// Loop frame; the unwind target for `break`/`continue`.
    While {
        cond: ExprId,
        body: StmtId,
        step: u8,
    },

    For {
        init: Option<ExprId>,
        cond: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
        step: u8,
    },

    Return {
        value: Option<ExprId>,
        span: Span,
        step: u8,
    },

    /// Set-definition body: runs its statements in a Set scope, then
    /// freezes the scope's bindings into a template.
    SetDefBody {
        name: Name,
        body: StmtRange,
        idx: u32,
        entered: bool,
    },
}

impl Frame {
    /// The source span to attach to errors raised while this frame runs.
    pub fn span(&self) -> Span {
        match self {
            Frame::Binary { span, .. }
            | Frame::Logical { span, .. }
            | Frame::Unary { span, .. }
            | Frame::Assign { span, .. }
            | Frame::IncDec { span, .. }
            | Frame::Index { span, .. }
            | Frame::Member { span, .. }
            | Frame::Call { span, .. }
            | Frame::Invoke { span, .. }
            | Frame::ArrayLit { span, .. }
            | Frame::Return { span, .. } => *span,
            _ => Span::DUMMY,
        }
    }

    /// Push every value this frame holds onto the collector's root list.
    pub fn trace(&self, roots: &mut Vec<Value>) {
        match self {
            Frame::Binary { lhs, .. } => {
                if let Some(v) = lhs {
                    roots.push(v.clone());
                }
            }
            Frame::Assign { place, assigned, .. } => {
                if let Some(var) = place {
                    roots.push(var.get());
                }
                if let Some(v) = assigned {
                    roots.push(v.clone());
                }
            }
            Frame::IncDec { result, .. } => {
                if let Some(v) = result {
                    roots.push(v.clone());
                }
            }
            Frame::Index { base, .. } => {
                if let Some(arr) = base {
                    roots.push(Value::Array(arr.clone()));
                }
            }
            Frame::Call { func, argv, .. } => {
                if let Some(f) = func {
                    roots.push(Value::Func(f.clone()));
                }
                trace_args(argv, roots);
            }
            Frame::Invoke { func, argv, .. } => {
                roots.push(Value::Func(func.clone()));
                trace_args(argv, roots);
            }
            Frame::ArrayLit { acc, .. } => {
                if let Some(arr) = acc {
                    roots.push(Value::Array(arr.clone()));
                }
            }
            _ => {}
        }
    }
}

fn trace_args(argv: &ArgVec, roots: &mut Vec<Value>) {
    for arg in argv {
        roots.push(arg.value());
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frame::Eval { expr } => write!(f, "Eval({expr:?})"),
            Frame::Binary { op, step, .. } => write!(f, "Binary({op:?}, step={step})"),
            Frame::Logical { op, step, .. } => write!(f, "Logical({op:?}, step={step})"),
            Frame::Unary { op, step, .. } => write!(f, "Unary({op:?}, step={step})"),
            Frame::Assign { step, .. } => write!(f, "Assign(step={step})"),
            Frame::IncDec { op, step, .. } => write!(f, "IncDec({op:?}, step={step})"),
            Frame::Index { step, .. } => write!(f, "Index(step={step})"),
            Frame::Member { member, step, .. } => write!(f, "Member({member:?}, step={step})"),
            Frame::Call { step, argi, .. } => write!(f, "Call(step={step}, argi={argi})"),
            Frame::Invoke { func, step, .. } => {
                write!(f, "Invoke({:?}, step={step})", func.name())
            }
            Frame::ArrayLit { idx, .. } => write!(f, "ArrayLit(idx={idx})"),
            Frame::Stmt { stmt, step } => write!(f, "Stmt({stmt:?}, step={step})"),
            Frame::Block { idx, scoped, .. } => write!(f, "Block(idx={idx}, scoped={scoped})"),
            Frame::If { step, .. } => write!(f, "If(step={step})"),
            Frame::While { step, .. } => write!(f, "While(step={step})"),
            Frame::For { step, .. } => write!(f, "For(step={step})"),
            Frame::Return { step, .. } => write!(f, "Return(step={step})"),
            Frame::SetDefBody { name, idx, .. } => {
                write!(f, "SetDefBody({name:?}, idx={idx})")
            }
        }
    }
}
