//! Programmatic module construction.
//!
//! This is the interface the parser (or an embedding host, or a test)
//! uses to hand the runtime a program. The builder owns the growing
//! arenas and shares a [`SharedInterner`] with whoever will later need to
//! resolve names back to text.

use crate::ast::{BinaryOp, Expr, ExprKind, FuncDecl, IncDecOp, LogicalOp, Param, Stmt, StmtKind, UnaryOp};
use crate::{ExprId, ExprRange, FuncId, Module, Name, SharedInterner, Span, StmtId, StmtRange};

/// Builds a [`Module`] node by node.
pub struct ModuleBuilder {
    interner: SharedInterner,
    source_name: Name,
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    funcs: Vec<FuncDecl>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
}

impl ModuleBuilder {
    /// Create a builder for the given source file name.
    pub fn new(interner: SharedInterner, source_name: &str) -> Self {
        let source_name = interner.intern(source_name);
        ModuleBuilder {
            interner,
            source_name,
            exprs: Vec::new(),
            stmts: Vec::new(),
            funcs: Vec::new(),
            expr_lists: Vec::new(),
            stmt_lists: Vec::new(),
        }
    }

    /// Intern a name through the shared interner.
    pub fn intern(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    /// The shared interner.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    // Low-level pushes

    /// Push an expression with an explicit span.
    pub fn push_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::new(u32::try_from(self.exprs.len()).unwrap_or(u32::MAX));
        self.exprs.push(Expr::new(kind, span));
        id
    }

    /// Push a statement with an explicit span.
    pub fn push_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::new(u32::try_from(self.stmts.len()).unwrap_or(u32::MAX));
        self.stmts.push(Stmt::new(kind, span));
        id
    }

    /// Flatten an expression list into the side array.
    pub fn expr_list(&mut self, ids: &[ExprId]) -> ExprRange {
        let start = u32::try_from(self.expr_lists.len()).unwrap_or(u32::MAX);
        self.expr_lists.extend_from_slice(ids);
        ExprRange::new(start, u32::try_from(ids.len()).unwrap_or(u32::MAX))
    }

    /// Flatten a statement list into the side array.
    pub fn stmt_list(&mut self, ids: &[StmtId]) -> StmtRange {
        let start = u32::try_from(self.stmt_lists.len()).unwrap_or(u32::MAX);
        self.stmt_lists.extend_from_slice(ids);
        StmtRange::new(start, u32::try_from(ids.len()).unwrap_or(u32::MAX))
    }

    // Expression conveniences (dummy spans; parsers use push_expr)

    pub fn nil(&mut self) -> ExprId {
        self.push_expr(ExprKind::Nil, Span::DUMMY)
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.push_expr(ExprKind::Int(value), Span::DUMMY)
    }

    pub fn real(&mut self, value: f64) -> ExprId {
        self.push_expr(ExprKind::Real(value), Span::DUMMY)
    }

    pub fn bool(&mut self, value: bool) -> ExprId {
        self.push_expr(ExprKind::Bool(value), Span::DUMMY)
    }

    pub fn str(&mut self, text: &str) -> ExprId {
        let name = self.intern(text);
        self.push_expr(ExprKind::Str(name), Span::DUMMY)
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        let name = self.intern(name);
        self.push_expr(ExprKind::Ident(name), Span::DUMMY)
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.push_expr(ExprKind::Binary { op, left, right }, Span::DUMMY)
    }

    pub fn logical(&mut self, op: LogicalOp, left: ExprId, right: ExprId) -> ExprId {
        self.push_expr(ExprKind::Logical { op, left, right }, Span::DUMMY)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.push_expr(ExprKind::Unary { op, operand }, Span::DUMMY)
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> ExprId {
        self.push_expr(
            ExprKind::Assign {
                op: None,
                target,
                value,
            },
            Span::DUMMY,
        )
    }

    pub fn compound_assign(&mut self, op: BinaryOp, target: ExprId, value: ExprId) -> ExprId {
        self.push_expr(
            ExprKind::Assign {
                op: Some(op),
                target,
                value,
            },
            Span::DUMMY,
        )
    }

    pub fn inc_dec(&mut self, op: IncDecOp, prefix: bool, target: ExprId) -> ExprId {
        self.push_expr(ExprKind::IncDec { op, prefix, target }, Span::DUMMY)
    }

    pub fn index(&mut self, target: ExprId, index: ExprId) -> ExprId {
        self.push_expr(
            ExprKind::Index {
                target,
                index: Some(index),
            },
            Span::DUMMY,
        )
    }

    /// The implicit-push form `arr[]`.
    pub fn index_push(&mut self, target: ExprId) -> ExprId {
        self.push_expr(
            ExprKind::Index {
                target,
                index: None,
            },
            Span::DUMMY,
        )
    }

    pub fn member(&mut self, target: ExprId, member: &str) -> ExprId {
        let member = self.intern(member);
        self.push_expr(ExprKind::Member { target, member }, Span::DUMMY)
    }

    pub fn call(&mut self, callee: ExprId, args: &[ExprId]) -> ExprId {
        let args = self.expr_list(args);
        self.push_expr(ExprKind::Call { callee, args }, Span::DUMMY)
    }

    pub fn new_object(&mut self, set: &str) -> ExprId {
        let set = self.intern(set);
        self.push_expr(ExprKind::New { set }, Span::DUMMY)
    }

    pub fn array_lit(&mut self, elems: &[ExprId]) -> ExprId {
        let elems = self.expr_list(elems);
        self.push_expr(ExprKind::ArrayLit { elems }, Span::DUMMY)
    }

    // Statement conveniences

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.push_stmt(StmtKind::Expr(expr), Span::DUMMY)
    }

    pub fn block(&mut self, stmts: &[StmtId]) -> StmtId {
        let range = self.stmt_list(stmts);
        self.push_stmt(StmtKind::Block(range), Span::DUMMY)
    }

    pub fn if_stmt(&mut self, cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId>) -> StmtId {
        self.push_stmt(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            Span::DUMMY,
        )
    }

    pub fn while_stmt(&mut self, cond: ExprId, body: StmtId) -> StmtId {
        self.push_stmt(StmtKind::While { cond, body }, Span::DUMMY)
    }

    pub fn for_stmt(
        &mut self,
        init: Option<ExprId>,
        cond: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    ) -> StmtId {
        self.push_stmt(
            StmtKind::For {
                init,
                cond,
                update,
                body,
            },
            Span::DUMMY,
        )
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.push_stmt(StmtKind::Return(value), Span::DUMMY)
    }

    pub fn brk(&mut self) -> StmtId {
        self.push_stmt(StmtKind::Break, Span::DUMMY)
    }

    pub fn cont(&mut self) -> StmtId {
        self.push_stmt(StmtKind::Continue, Span::DUMMY)
    }

    pub fn goto(&mut self, label: &str) -> StmtId {
        let label = self.intern(label);
        self.push_stmt(StmtKind::Goto(label), Span::DUMMY)
    }

    pub fn label(&mut self, label: &str) -> StmtId {
        let label = self.intern(label);
        self.push_stmt(StmtKind::Label(label), Span::DUMMY)
    }

    /// Declare a function. Params are `(name, by_ref)` pairs.
    pub fn func(&mut self, name: &str, params: &[(&str, bool)], body: StmtId) -> StmtId {
        let name = self.intern(name);
        let params = params
            .iter()
            .map(|&(p, by_ref)| Param {
                name: self.intern(p),
                by_ref,
            })
            .collect();
        let id = FuncId::new(u32::try_from(self.funcs.len()).unwrap_or(u32::MAX));
        self.funcs.push(FuncDecl {
            name,
            params,
            body,
            span: Span::DUMMY,
        });
        self.push_stmt(StmtKind::FuncDef(id), Span::DUMMY)
    }

    /// Declare a set template whose body populates the default members.
    pub fn set_def(&mut self, name: &str, body: &[StmtId]) -> StmtId {
        let name = self.intern(name);
        let body = self.stmt_list(body);
        self.push_stmt(StmtKind::SetDef { name, body }, Span::DUMMY)
    }

    /// Finish the module with the given top-level statements.
    pub fn finish(mut self, top_level: &[StmtId]) -> Module {
        let body = self.stmt_list(top_level);
        Module {
            source_name: self.source_name,
            body,
            exprs: self.exprs,
            stmts: self.stmts,
            funcs: self.funcs,
            expr_lists: self.expr_lists,
            stmt_lists: self.stmt_lists,
        }
    }
}
