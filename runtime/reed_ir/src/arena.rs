//! The module arena: flat storage for a parsed program.

use crate::ast::{Expr, FuncDecl, Stmt};
use crate::{ExprId, ExprRange, FuncId, Name, StmtId, StmtRange};

/// One parsed module: contiguous node arrays plus the top-level statement
/// list. Immutable once built; the runtime only reads it.
#[derive(Debug)]
pub struct Module {
    /// Source file name (interned), used in error reports.
    pub source_name: Name,
    /// Top-level statements.
    pub body: StmtRange,
    pub(crate) exprs: Vec<Expr>,
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) funcs: Vec<FuncDecl>,
    /// Flattened expression lists (call arguments, array literals).
    pub(crate) expr_lists: Vec<ExprId>,
    /// Flattened statement lists (blocks, set bodies, the module body).
    pub(crate) stmt_lists: Vec<StmtId>,
}

impl Module {
    /// Resolve an expression id.
    ///
    /// # Panics
    /// Panics on an id not produced for this module; that is a parser or
    /// host bug, not a script error.
    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Resolve a statement id.
    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    /// Resolve a function declaration id.
    #[inline]
    pub fn func(&self, id: FuncId) -> &FuncDecl {
        &self.funcs[id.index()]
    }

    /// The expression ids covered by a range.
    #[inline]
    pub fn exprs_in(&self, range: ExprRange) -> &[ExprId] {
        let start = range.start as usize;
        &self.expr_lists[start..start + range.len()]
    }

    /// The statement ids covered by a range.
    #[inline]
    pub fn stmts_in(&self, range: StmtRange) -> &[StmtId] {
        let start = range.start as usize;
        &self.stmt_lists[start..start + range.len()]
    }

    /// Number of expression nodes.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Number of statement nodes.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}
