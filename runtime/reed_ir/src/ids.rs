//! Arena indices for the flat AST.
//!
//! Expressions and statements are stored in contiguous arrays inside a
//! [`crate::Module`]; nodes reference children by 32-bit index instead of
//! `Box`. Argument lists and statement lists are ranges into flat side
//! arrays so a node stays `Copy`.

use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Invalid sentinel value.
            pub const INVALID: $name = $name(u32::MAX);

            /// Create a new id.
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Index into the arena.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw u32 value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// True unless this is the sentinel.
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                } else {
                    write!(f, concat!(stringify!($name), "::INVALID"))
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

arena_id! {
    /// Index of an expression in the module arena.
    ExprId
}

arena_id! {
    /// Index of a statement in the module arena.
    StmtId
}

arena_id! {
    /// Index of a function declaration in the module arena.
    FuncId
}

macro_rules! arena_range {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
        pub struct $name {
            pub start: u32,
            pub len: u32,
        }

        impl $name {
            /// Empty range.
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            /// Create a new range.
            #[inline]
            pub const fn new(start: u32, len: u32) -> Self {
                $name { start, len }
            }

            /// Number of elements.
            #[inline]
            pub const fn len(self) -> usize {
                self.len as usize
            }

            /// True if the range holds no elements.
            #[inline]
            pub const fn is_empty(self) -> bool {
                self.len == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), "({}..{})"),
                    self.start,
                    self.start + self.len
                )
            }
        }
    };
}

arena_range! {
    /// Range into the module's flat expression-list array.
    ExprRange
}

arena_range! {
    /// Range into the module's flat statement-list array.
    StmtRange
}
