//! AST node types.
//!
//! The parser (external to this workspace) produces these; the runtime
//! treats them as immutable. Everything is index-based and `Copy` so the
//! evaluator's continuation frames can carry node references freely.

mod expr;
mod operators;
mod stmt;

pub use expr::{Expr, ExprKind};
pub use operators::{BinaryOp, IncDecOp, LogicalOp, UnaryOp};
pub use stmt::{FuncDecl, Param, Stmt, StmtKind};
