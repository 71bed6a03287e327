//! Runtime values and variable slots.
//!
//! # Ownership model
//!
//! The source design's manual reference counts map onto `Rc`: scalars are
//! inline, strings are immutable shared buffers, and Objects/Arrays/
//! Functions are `Rc` handles with reference semantics. A Job is
//! single-threaded and never shares values with another Job, so `Rc` (not
//! `Arc`) is correct by construction.
//!
//! # Copy semantics
//!
//! [`duplicate`] implements the language's assignment/pass-by-value rule:
//! scalars and strings copy by value, Objects/Arrays/Functions alias.
//! Strings are immutable buffers — every string operator allocates a new
//! one — so sharing the buffer is observationally a by-value copy.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use reed_ir::{FuncId, Name};

use crate::array::ArrayRef;
use crate::errors::{frozen_value, EvalResult, RuntimeError};
use crate::job::Job;
use crate::object::ObjectRef;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Int(i64),
    Bool(bool),
    Real(f64),
    /// Immutable shared string buffer.
    Str(Rc<str>),
    Object(ObjectRef),
    Func(FuncRef),
    Array(ArrayRef),
}

impl Value {
    /// Create a string value.
    #[inline]
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Type name used in error messages and by `type` natives.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Func(_) => "function",
            Value::Array(_) => "array",
        }
    }

    /// Truthiness: nil, false, 0, 0.0 and "" are falsy; everything else
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Real(r) => *r != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Func(_) | Value::Array(_) => true,
        }
    }

    /// True for `Nil`.
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            #[expect(clippy::cast_precision_loss, reason = "script reals are f64 by definition")]
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render for user-facing output (`print`, string concatenation).
    pub fn display_value(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Object(o) => format!("<object {:#x}>", o.ptr_id()),
            Value::Func(f) => format!("<function {:?}>", f.name()),
            Value::Array(a) => {
                let a = a.borrow();
                let inner: Vec<_> = a
                    .iter()
                    .map(|elem| elem.var.get().display_value())
                    .collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

/// Equality through the shared comparator: numerics compare cross-type,
/// reference types by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::compare::values_equal(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Real(r) => write!(f, "Real({r})"),
            Value::Str(s) => write!(f, "Str({:?})", &**s),
            Value::Object(o) => write!(f, "Object({:#x})", o.ptr_id()),
            Value::Func(func) => write!(f, "Func({:?})", func.name()),
            Value::Array(a) => write!(f, "Array({:#x})", a.ptr_id()),
        }
    }
}

/// By-value copy per the language's rule: scalars and strings copy,
/// reference types alias. The returned value shares no mutable state with
/// `value` unless `value` is an Object/Array/Function.
#[inline]
pub fn duplicate(value: &Value) -> Value {
    value.clone()
}

// Functions

/// Outcome of a native-function invocation.
pub enum NativeOutcome {
    /// The call completed with a value.
    Return(Value),
    /// The Job must suspend; the scheduler's resume injects the eventual
    /// result into the invoking expression.
    Suspend,
}

/// Native function handler.
///
/// Arguments arrive as [`Var`] slots: a by-reference parameter aliases the
/// caller's storage, so assigning through it is visible to the script.
pub type NativeFn = Rc<dyn Fn(&mut Job, &[Var]) -> Result<NativeOutcome, RuntimeError>>;

/// A callable value: a script function (an arena declaration) or a native
/// handler registered by the host.
#[derive(Clone)]
pub enum FuncValue {
    Script { name: Name, func: FuncId },
    Native { name: Name, arity: usize, f: NativeFn },
}

impl FuncValue {
    pub fn name(&self) -> Name {
        match self {
            FuncValue::Script { name, .. } | FuncValue::Native { name, .. } => *name,
        }
    }
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuncValue::Script { name, func } => write!(f, "Script({name:?}, {func:?})"),
            FuncValue::Native { name, arity, .. } => write!(f, "Native({name:?}, arity={arity})"),
        }
    }
}

/// Shared handle to a function value.
pub type FuncRef = Rc<FuncValue>;

// Variables

/// Watch hook: a script/native function plus user data, invoked after
/// every mutation of the watched slot as `func(data, new_value)`.
#[derive(Clone)]
pub struct Watch {
    pub func: FuncRef,
    pub data: Value,
}

/// The storage behind a [`Var`].
pub struct Slot {
    value: Value,
    frozen: bool,
    watch: Option<Watch>,
}

/// A variable: a named or anonymous binding slot.
///
/// `Var` is a clonable handle (`Rc<RefCell<Slot>>`); cloning aliases the
/// same storage, which is exactly the source design's `Refer` variable —
/// by-reference native parameters are plain clones of the caller's `Var`.
#[derive(Clone)]
pub struct Var(Rc<RefCell<Slot>>);

impl Var {
    /// Create a fresh slot holding `value`.
    pub fn new(value: Value) -> Self {
        Var(Rc::new(RefCell::new(Slot {
            value,
            frozen: false,
            watch: None,
        })))
    }

    /// Fresh Nil slot (auto-vivification).
    pub fn nil() -> Self {
        Var::new(Value::Nil)
    }

    /// Read the current value (cloned; cheap for scalars, `Rc` bump for
    /// reference types).
    pub fn get(&self) -> Value {
        self.0.borrow().value.clone()
    }

    /// Overwrite the slot in place.
    ///
    /// Fails on a frozen slot. On success returns the watch hook (if any)
    /// so the caller can schedule its invocation — the engine enters the
    /// watch function as a regular call before continuing.
    pub fn set(&self, value: Value) -> EvalResult<Option<Watch>> {
        let mut slot = self.0.borrow_mut();
        if slot.frozen {
            return Err(frozen_value());
        }
        slot.value = value;
        Ok(slot.watch.clone())
    }

    /// Overwrite unconditionally, bypassing the frozen flag and watch
    /// hook. Used by the cycle collector's sever pass and by Job
    /// teardown, never by script-visible mutation.
    pub(crate) fn force_set(&self, value: Value) {
        self.0.borrow_mut().value = value;
    }

    /// Mark the slot not-modifiable.
    pub fn freeze(&self) {
        self.0.borrow_mut().frozen = true;
    }

    /// True if the slot is frozen.
    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen
    }

    /// Install a watch hook, replacing any existing one.
    pub fn set_watch(&self, func: FuncRef, data: Value) {
        self.0.borrow_mut().watch = Some(Watch { func, data });
    }

    /// Remove the watch hook.
    pub fn clear_watch(&self) {
        self.0.borrow_mut().watch = None;
    }

    /// Identity of the underlying storage; two `Var`s alias iff equal.
    pub fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Number of live handles to this slot (test support for the
    /// refcount invariant).
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.0.borrow();
        write!(f, "Var({:?}", slot.value)?;
        if slot.frozen {
            write!(f, ", frozen")?;
        }
        if slot.watch.is_some() {
            write!(f, ", watched")?;
        }
        write!(f, ")")
    }
}
