//! Reed IR - AST and interface types for the Reed script runtime.
//!
//! This crate is the boundary between the (external) lexer/parser and the
//! execution engine. It provides:
//!
//! - `Name` / `Interner` / `SharedInterner`: interned identifiers
//! - `Span` / `Spanned`: source locations for error reporting
//! - `ExprId` / `StmtId` / `FuncId` + ranges: flat arena indices
//! - `ast`: expression/statement nodes and operator enums
//! - `Module` / `ModuleBuilder`: immutable program storage and the
//!   construction API the parser targets
//!
//! The runtime never mutates a `Module`; many Jobs may evaluate the same
//! one.

mod arena;
pub mod ast;
mod builder;
mod ids;
mod interner;
mod name;
mod span;

pub use arena::Module;
pub use ast::{BinaryOp, Expr, ExprKind, FuncDecl, IncDecOp, LogicalOp, Param, Stmt, StmtKind, UnaryOp};
pub use builder::ModuleBuilder;
pub use ids::{ExprId, ExprRange, FuncId, StmtId, StmtRange};
pub use interner::{Interner, SharedInterner};
pub use name::Name;
pub use span::{Span, Spanned};
