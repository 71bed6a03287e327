//! Statement nodes and declarations.

use std::fmt;

use crate::{ExprId, FuncId, Name, Span, Spanned, StmtId, StmtRange};

/// Statement node.
#[derive(Copy, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

impl fmt::Debug for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

impl Spanned for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

/// Statement variants.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum StmtKind {
    /// Expression statement; the result is discarded.
    Expr(ExprId),

    /// Braced block opening a block scope.
    Block(StmtRange),

    /// Conditional.
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },

    /// While loop. A loop statement's frame is the unwind target for
    /// `break`/`continue`.
    While { cond: ExprId, body: StmtId },

    /// C-style for loop; all three headers are optional.
    For {
        init: Option<ExprId>,
        cond: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    },

    /// Return from the enclosing function, unwinding the continuation
    /// stack to the function's entry marker.
    Return(Option<ExprId>),

    /// Break out of the nearest enclosing loop.
    Break,

    /// Continue the nearest enclosing loop.
    Continue,

    /// Jump to a label in an enclosing block of the same function.
    Goto(Name),

    /// Jump target. Executing a label is a no-op.
    Label(Name),

    /// Function definition; binds the function value under its name.
    FuncDef(FuncId),

    /// Set (class template) definition. The body runs in a Set scope and
    /// its resulting bindings become the template's default members.
    SetDef { name: Name, body: StmtRange },
}

/// A function declaration stored in the module arena.
#[derive(Clone, PartialEq, Debug)]
pub struct FuncDecl {
    pub name: Name,
    pub params: Vec<Param>,
    pub body: StmtId,
    pub span: Span,
}

/// A declared parameter.
///
/// `by_ref` parameters alias the caller's storage instead of receiving a
/// duplicated value; assigning through them is visible to the caller.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Param {
    pub name: Name,
    pub by_ref: bool,
}

impl Param {
    pub fn new(name: Name) -> Self {
        Param {
            name,
            by_ref: false,
        }
    }

    pub fn by_ref(name: Name) -> Self {
        Param { name, by_ref: true }
    }
}
