//! Objects and Set templates.
//!
//! A **Set** is the language's class template: a named, ordered map of
//! default member values built by evaluating the `set` body in a Set
//! scope. An **Object** is an instance: its members start as duplicates
//! of the template's defaults (scalars copied, reference types aliased),
//! after which the instance evolves independently.
//!
//! Member maps are ordered (`BTreeMap` keyed by interned `Name`), the
//! idiomatic stand-in for the source's red-black trees: iteration order
//! is deterministic and lookup stays O(log n).

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use reed_ir::Name;

use crate::value::{duplicate, Value, Var};

/// A class template.
#[derive(Debug)]
pub struct SetDef {
    pub name: Name,
    /// Default members in declaration order.
    pub members: BTreeMap<Name, Value>,
}

/// Shared handle to a template. Reference-counted because live Objects
/// keep their originating Set alive after its defining scope exits.
pub type SetRef = Rc<SetDef>;

/// An object instance.
pub struct Object {
    /// The originating template; `None` for objects synthesized by native
    /// code or auto-vivified by member access.
    set: Option<SetRef>,
    members: BTreeMap<Name, Var>,
}

impl Object {
    /// A bare object with no template and no members.
    pub fn bare() -> Self {
        Object {
            set: None,
            members: BTreeMap::new(),
        }
    }

    /// Instantiate a template, duplicating each default member.
    pub fn instance(set: &SetRef) -> Self {
        let members = set
            .members
            .iter()
            .map(|(&name, value)| (name, Var::new(duplicate(value))))
            .collect();
        Object {
            set: Some(Rc::clone(set)),
            members,
        }
    }

    /// The originating template, if any.
    pub fn set(&self) -> Option<&SetRef> {
        self.set.as_ref()
    }

    /// Look up a member without creating it.
    pub fn member(&self, name: Name) -> Option<Var> {
        self.members.get(&name).cloned()
    }

    /// Look up a member, auto-vivifying a Nil slot when absent.
    pub fn member_or_create(&mut self, name: Name) -> Var {
        self.members.entry(name).or_insert_with(Var::nil).clone()
    }

    /// Insert-or-replace a member (native-code synthesis).
    pub fn insert_member(&mut self, name: Name, var: Var) {
        self.members.insert(name, var);
    }

    /// Iterate members in name order.
    pub fn members(&self) -> impl Iterator<Item = (Name, &Var)> {
        self.members.iter().map(|(&name, var)| (name, var))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sever every member (cycle-collector clean pass and Job teardown).
    pub(crate) fn sever(&mut self) {
        for var in self.members.values() {
            var.force_set(Value::Nil);
        }
    }
}

/// Shared handle to an object instance.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        ObjectRef(Rc::new(RefCell::new(object)))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    /// Identity; two refs alias iff equal.
    pub fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Live handle count (refcount-invariant tests).
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Weak handle for the collector's arena.
    pub fn downgrade(&self) -> ObjectWeak {
        ObjectWeak(Rc::downgrade(&self.0))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.ptr_id())
    }
}

/// Weak object handle held by the cycle collector.
#[derive(Clone, Debug)]
pub struct ObjectWeak(Weak<RefCell<Object>>);

impl ObjectWeak {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}
