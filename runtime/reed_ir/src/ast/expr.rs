//! Expression nodes.
//!
//! All children are arena indices, not boxes; a node is `Copy` and 16-24
//! bytes. One node corresponds to one production instance of the source
//! grammar's precedence ladder, which is exactly the granularity the
//! engine's continuation frames resume at.

use std::fmt;

use super::operators::{BinaryOp, IncDecOp, LogicalOp, UnaryOp};
use crate::{ExprId, ExprRange, Name, Span, Spanned};

/// Expression node.
#[derive(Copy, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

/// Expression variants.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ExprKind {
    /// Nil literal.
    Nil,

    /// Integer literal: 42
    Int(i64),

    /// Real literal: 3.14
    Real(f64),

    /// Boolean literal: true, false
    Bool(bool),

    /// String literal (interned).
    Str(Name),

    /// Variable reference. Reading an undeclared name auto-vivifies a Nil
    /// binding in the innermost scope.
    Ident(Name),

    /// Binary operation: left op right.
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },

    /// Logical operation; `&&`/`||` short-circuit.
    Logical {
        op: LogicalOp,
        left: ExprId,
        right: ExprId,
    },

    /// Unary operation: op operand.
    Unary { op: UnaryOp, operand: ExprId },

    /// Assignment or compound assignment. `op` is the arithmetic part of
    /// a compound assign (`x += y` is `op: Some(Add)`), `None` for plain
    /// `=`. The target must evaluate to a place.
    Assign {
        op: Option<BinaryOp>,
        target: ExprId,
        value: ExprId,
    },

    /// Pre/post increment or decrement of a place.
    IncDec {
        op: IncDecOp,
        prefix: bool,
        target: ExprId,
    },

    /// Array subscript. `index: None` is the implicit-push form `arr[]`,
    /// which allocates the next integer slot.
    Index {
        target: ExprId,
        index: Option<ExprId>,
    },

    /// Member access: target.member
    Member { target: ExprId, member: Name },

    /// Call: callee(args...). The callee expression must evaluate to a
    /// function value (script or native).
    Call { callee: ExprId, args: ExprRange },

    /// Instantiate a set template: new Name
    New { set: Name },

    /// Array literal: [e1, e2, ...] with implicit integer keys.
    ArrayLit { elems: ExprRange },
}
