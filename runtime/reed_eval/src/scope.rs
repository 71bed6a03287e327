//! Symbol table and scope chain.
//!
//! Scopes form a stack per Job. `join` inserts-or-replaces in the
//! innermost scope (redeclaration silently replaces — scripting
//! semantics). `search` walks innermost to outermost; a local-only search
//! stops at the innermost function boundary, the global walk crosses it,
//! which gives the language its dynamically-resolved-at-call-time
//! capture.
//!
//! Function scopes carry two extras: the cycle collector's arena for
//! containers created while they were innermost, and the continuation
//! stack index of the call frame that entered them — the unwind target
//! for `return`.

use rustc_hash::FxHashMap;

use reed_ir::Name;

use crate::gc::GcArena;
use crate::value::Var;

/// What kind of region a scope is.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ScopeKind {
    /// Function body (or the program's root). Owns a GC arena.
    Func,
    /// A `set` body under definition; its bindings become the template.
    Set,
    /// Braced block.
    Block,
}

/// One scope: a symbol table plus function-scope extras.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    symbols: FxHashMap<Name, Var>,
    /// For `Func` scopes: index of the invoking frame on the
    /// continuation stack. `None` for the program's root scope.
    pub entry_frame: Option<usize>,
    /// For `Func` scopes: the collector arena.
    pub arena: Option<GcArena>,
}

impl Scope {
    fn func(entry_frame: Option<usize>) -> Self {
        Scope {
            kind: ScopeKind::Func,
            symbols: FxHashMap::default(),
            entry_frame,
            arena: Some(GcArena::new()),
        }
    }

    fn plain(kind: ScopeKind) -> Self {
        Scope {
            kind,
            symbols: FxHashMap::default(),
            entry_frame: None,
            arena: None,
        }
    }

    /// Insert-or-replace a binding.
    pub fn join(&mut self, name: Name, var: Var) {
        self.symbols.insert(name, var);
    }

    /// Look up in this scope only.
    pub fn get(&self, name: Name) -> Option<Var> {
        self.symbols.get(&name).cloned()
    }

    /// Iterate this scope's bindings.
    pub fn vars(&self) -> impl Iterator<Item = (Name, &Var)> {
        self.symbols.iter().map(|(&name, var)| (name, var))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// The per-Job scope stack.
#[derive(Debug)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    /// A fresh chain holding the program's root function scope.
    pub fn new() -> Self {
        ScopeChain {
            scopes: vec![Scope::func(None)],
        }
    }

    /// Current depth (root scope counts).
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Enter a function scope; `entry_frame` is the invoking frame's
    /// index on the continuation stack.
    pub fn push_func(&mut self, entry_frame: usize) {
        self.scopes.push(Scope::func(Some(entry_frame)));
    }

    /// Enter a block scope.
    pub fn push_block(&mut self) {
        self.scopes.push(Scope::plain(ScopeKind::Block));
    }

    /// Enter a set-definition scope.
    pub fn push_set(&mut self) {
        self.scopes.push(Scope::plain(ScopeKind::Set));
    }

    /// Leave the innermost scope. The root scope is never popped.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// The innermost scope.
    pub fn innermost(&self) -> &Scope {
        self.scopes.last().unwrap_or_else(|| unreachable!("root scope always present"))
    }

    /// The innermost scope, mutable.
    pub fn innermost_mut(&mut self) -> &mut Scope {
        self.scopes
            .last_mut()
            .unwrap_or_else(|| unreachable!("root scope always present"))
    }

    /// The root (global) scope, mutable. Native registration binds here.
    pub fn root_mut(&mut self) -> &mut Scope {
        &mut self.scopes[0]
    }

    /// Insert-or-replace in the innermost scope.
    pub fn join(&mut self, name: Name, var: Var) {
        self.innermost_mut().join(name, var);
    }

    /// Walk from the innermost scope outward.
    ///
    /// With `local_only`, the walk stops after the innermost function
    /// scope (block scopes above it are still searched); otherwise it
    /// crosses function boundaries all the way to the root.
    pub fn search(&self, name: Name, local_only: bool) -> Option<Var> {
        for scope in self.scopes.iter().rev() {
            if let Some(var) = scope.get(name) {
                return Some(var);
            }
            if local_only && scope.kind == ScopeKind::Func {
                return None;
            }
        }
        None
    }

    /// The innermost function scope's continuation-stack entry marker;
    /// `None` at the program's root.
    pub fn current_func_entry(&self) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.kind == ScopeKind::Func)
            .and_then(|scope| scope.entry_frame)
    }

    /// The innermost function scope's arena, for registering new
    /// containers.
    pub fn current_arena_mut(&mut self) -> &mut GcArena {
        let scope = self
            .scopes
            .iter_mut()
            .rev()
            .find(|scope| scope.arena.is_some())
            .unwrap_or_else(|| unreachable!("root scope owns an arena"));
        scope
            .arena
            .as_mut()
            .unwrap_or_else(|| unreachable!("checked above"))
    }

    /// Merge a popped function scope's surviving arena items into the
    /// (now innermost) enclosing function arena. Containers that escaped
    /// the callee stay tracked.
    pub fn absorb_arena(&mut self, mut popped: Scope) {
        if let Some(arena) = popped.arena.take() {
            if !arena.is_empty() {
                self.current_arena_mut().merge(arena);
            }
        }
    }

    /// Iterate every binding in every scope (collector roots).
    pub fn all_vars(&self) -> impl Iterator<Item = &Var> {
        self.scopes.iter().flat_map(|scope| scope.vars().map(|(_, var)| var))
    }

    /// Iterate scopes outermost-first.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    /// Iterate scopes outermost-first, mutably (collector passes).
    pub fn scopes_mut(&mut self) -> impl Iterator<Item = &mut Scope> {
        self.scopes.iter_mut()
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn n(raw: u32) -> Name {
        Name::from_raw(raw)
    }

    #[test]
    fn test_join_replaces_silently() {
        let mut chain = ScopeChain::new();
        chain.join(n(1), Var::new(Value::Int(1)));
        chain.join(n(1), Var::new(Value::Int(2)));
        assert_eq!(chain.search(n(1), false).unwrap().get().as_int(), Some(2));
    }

    #[test]
    fn test_search_walks_outward() {
        let mut chain = ScopeChain::new();
        chain.join(n(1), Var::new(Value::Int(10)));
        chain.push_block();
        chain.join(n(2), Var::new(Value::Int(20)));
        assert!(chain.search(n(1), false).is_some());
        assert!(chain.search(n(2), false).is_some());
        chain.pop();
        assert!(chain.search(n(2), false).is_none());
    }

    #[test]
    fn test_local_only_stops_at_function_boundary() {
        let mut chain = ScopeChain::new();
        chain.join(n(1), Var::new(Value::Int(1)));
        chain.push_func(0);
        chain.push_block();

        // Local search stops at the function boundary; the global name
        // is invisible.
        assert!(chain.search(n(1), true).is_none());
        // The unrestricted walk crosses it.
        assert!(chain.search(n(1), false).is_some());
    }

    #[test]
    fn test_shadowing_inside_function() {
        let mut chain = ScopeChain::new();
        chain.join(n(1), Var::new(Value::Int(1)));
        chain.push_func(0);
        chain.join(n(1), Var::new(Value::Int(2)));
        assert_eq!(chain.search(n(1), true).unwrap().get().as_int(), Some(2));
        chain.pop();
        assert_eq!(chain.search(n(1), true).unwrap().get().as_int(), Some(1));
    }

    #[test]
    fn test_func_entry_marker() {
        let mut chain = ScopeChain::new();
        assert_eq!(chain.current_func_entry(), None);
        chain.push_func(7);
        chain.push_block();
        assert_eq!(chain.current_func_entry(), Some(7));
    }

    #[test]
    fn test_root_never_popped() {
        let mut chain = ScopeChain::new();
        assert!(chain.pop().is_none());
        assert_eq!(chain.depth(), 1);
    }
}
