//! String interner.
//!
//! Names flow through the whole runtime as 32-bit [`Name`] handles; this
//! module owns the mapping between handles and text. The shared variant
//! wraps the interner in `parking_lot::RwLock` so the host, the parser,
//! and native functions can intern concurrently with cheap reads.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

/// Interns strings, handing out stable [`Name`] handles.
///
/// Index 0 is always the empty string, matching [`Name::EMPTY`].
pub struct Interner {
    map: FxHashMap<Box<str>, Name>,
    strings: Vec<Box<str>>,
}

impl Interner {
    /// Create an interner with the empty string pre-interned.
    pub fn new() -> Self {
        let mut interner = Interner {
            map: FxHashMap::default(),
            strings: Vec::new(),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        interner
    }

    /// Intern a string, returning its handle.
    ///
    /// Interning the same text twice returns the same handle.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(&name) = self.map.get(text) {
            return name;
        }
        let name = Name::from_raw(u32::try_from(self.strings.len()).unwrap_or(u32::MAX));
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.map.insert(boxed, name);
        name
    }

    /// Resolve a handle back to its text.
    ///
    /// Returns the empty string for handles this interner never produced.
    pub fn lookup(&self, name: Name) -> &str {
        self.strings
            .get(name.index())
            .map_or("", |s| s.as_ref())
    }

    /// Number of interned strings (including the pre-interned empty one).
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True if only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, clonable handle to an [`Interner`].
///
/// Cloning is cheap (`Arc`); all clones observe the same name table.
#[derive(Clone)]
pub struct SharedInterner(Arc<RwLock<Interner>>);

impl SharedInterner {
    /// Create a fresh shared interner.
    pub fn new() -> Self {
        SharedInterner(Arc::new(RwLock::new(Interner::new())))
    }

    /// Intern a string.
    pub fn intern(&self, text: &str) -> Name {
        self.0.write().intern(text)
    }

    /// Resolve a handle to owned text.
    pub fn lookup(&self, name: Name) -> String {
        self.0.read().lookup(name).to_string()
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_lookup_roundtrip() {
        let mut interner = Interner::new();
        let name = interner.intern("hello");
        assert_eq!(interner.lookup(name), "hello");
    }

    #[test]
    fn test_empty_pre_interned() {
        let interner = Interner::new();
        assert_eq!(interner.lookup(Name::EMPTY), "");
        assert!(interner.is_empty());
    }

    #[test]
    fn test_shared_interner_clones_share() {
        let shared = SharedInterner::new();
        let clone = shared.clone();
        let name = shared.intern("x");
        assert_eq!(clone.lookup(name), "x");
        assert_eq!(clone.intern("x"), name);
    }
}
