//! Arrays: hybrid ordered-map/vector.
//!
//! Elements are shared records reachable through two indexes: integer
//! position (with a monotonically increasing `next_index` for the
//! implicit-push form `arr[]`) and an associative index over arbitrary
//! comparable keys ordered by the value comparator. Access is
//! auto-vivifying: an absent slot is created holding Nil and its `Var`
//! returned, so `arr[5]` on a fresh array is a valid place to assign
//! into.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::compare::KeyValue;
use crate::value::{duplicate, Value, Var};

/// One element record, shared by both indexes.
#[derive(Debug)]
pub struct Element {
    /// The associative key; `None` for positional elements.
    pub key: Option<Value>,
    pub var: Var,
}

/// Array storage.
pub struct Array {
    /// Element records in insertion order.
    elems: Vec<Element>,
    /// Integer-position index into `elems`.
    by_index: BTreeMap<i64, usize>,
    /// Associative index into `elems`, ordered by the value comparator.
    by_key: BTreeMap<KeyValue, usize>,
    /// Next implicit push position.
    next_index: i64,
}

impl Array {
    pub fn new() -> Self {
        Array {
            elems: Vec::new(),
            by_index: BTreeMap::new(),
            by_key: BTreeMap::new(),
            next_index: 0,
        }
    }

    /// Append at the next integer position (the `arr[]` form and array
    /// literals). Returns the new slot.
    pub fn push(&mut self, value: Value) -> Var {
        let var = Var::new(value);
        let slot = self.elems.len();
        self.elems.push(Element {
            key: None,
            var: var.clone(),
        });
        self.by_index.insert(self.next_index, slot);
        self.next_index += 1;
        var
    }

    /// Look up a slot without creating it.
    pub fn get(&self, key: &Value) -> Option<Var> {
        match integral_index(key) {
            Some(index) => self
                .by_index
                .get(&index)
                .map(|&slot| self.elems[slot].var.clone()),
            None => self
                .by_key
                .get(&KeyValue(key.clone()))
                .map(|&slot| self.elems[slot].var.clone()),
        }
    }

    /// Look up a slot, inserting a Nil element when absent
    /// (auto-vivification).
    ///
    /// `None` is the implicit-push form: the slot takes the array's next
    /// integer position. Int keys (and Real keys with an integral value)
    /// address the positional index; everything else is duplicated into
    /// the associative index.
    pub fn get_or_create(&mut self, key: Option<&Value>) -> Var {
        let Some(key) = key else {
            return self.push(Value::Nil);
        };
        if let Some(index) = integral_index(key) {
            if let Some(&slot) = self.by_index.get(&index) {
                return self.elems[slot].var.clone();
            }
            let var = Var::nil();
            let slot = self.elems.len();
            self.elems.push(Element {
                key: None,
                var: var.clone(),
            });
            self.by_index.insert(index, slot);
            if index >= self.next_index {
                self.next_index = index + 1;
            }
            return var;
        }
        if let Some(&slot) = self.by_key.get(&KeyValue(key.clone())) {
            return self.elems[slot].var.clone();
        }
        let var = Var::nil();
        let slot = self.elems.len();
        self.elems.push(Element {
            key: Some(duplicate(key)),
            var: var.clone(),
        });
        self.by_key.insert(KeyValue(duplicate(key)), slot);
        var
    }

    /// Total number of elements across both indexes.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// The next implicit push position.
    pub fn next_index(&self) -> i64 {
        self.next_index
    }

    /// Iterate element records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    /// Sever every element (cycle-collector clean pass and Job
    /// teardown). Associative keys hold Values too, so they are dropped
    /// along with the value slots; no strong handle survives through
    /// this array.
    pub(crate) fn sever(&mut self) {
        self.by_key.clear();
        for elem in &mut self.elems {
            elem.key = None;
            elem.var.force_set(Value::Nil);
        }
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer position for `key`, if it addresses the positional index.
/// Real keys with an integral value alias the same slot as the equal Int
/// key — the comparator treats them as equal, and the two indexes must
/// agree with it.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "guarded by the fract and i64-range checks"
)]
fn integral_index(key: &Value) -> Option<i64> {
    match key {
        Value::Int(n) => Some(*n),
        Value::Real(r) => {
            if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r <= i64::MAX as f64 {
                Some(*r as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Shared handle to an array.
#[derive(Clone)]
pub struct ArrayRef(Rc<RefCell<Array>>);

impl ArrayRef {
    pub fn new() -> Self {
        ArrayRef(Rc::new(RefCell::new(Array::new())))
    }

    pub fn borrow(&self) -> Ref<'_, Array> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Array> {
        self.0.borrow_mut()
    }

    pub fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn downgrade(&self) -> ArrayWeak {
        ArrayWeak(Rc::downgrade(&self.0))
    }
}

impl Default for ArrayRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayRef({:#x})", self.ptr_id())
    }
}

/// Weak array handle held by the cycle collector.
#[derive(Clone, Debug)]
pub struct ArrayWeak(Weak<RefCell<Array>>);

impl ArrayWeak {
    pub fn upgrade(&self) -> Option<ArrayRef> {
        self.0.upgrade().map(ArrayRef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_vivify_integer_slot() {
        let arr = ArrayRef::new();
        let slot = arr.borrow_mut().get_or_create(Some(&Value::Int(5)));
        assert!(slot.get().is_nil());
        slot.set(Value::Int(3)).unwrap();
        // Same slot on re-access.
        let again = arr.borrow_mut().get_or_create(Some(&Value::Int(5)));
        assert_eq!(again.get().as_int(), Some(3));
        // Sparse index advances the push position past it.
        assert_eq!(arr.borrow().next_index(), 6);
    }

    #[test]
    fn test_associative_slot_separate_from_positions() {
        let arr = ArrayRef::new();
        arr.borrow_mut().push(Value::Int(1));
        let key = Value::string("k");
        let slot = arr.borrow_mut().get_or_create(Some(&key));
        slot.set(Value::Int(42)).unwrap();

        // The associative slot is not visible at any integer position.
        assert!(arr.borrow().get(&Value::Int(1)).is_none());
        assert_eq!(arr.borrow().next_index(), 1);
        assert_eq!(
            arr.borrow().get(&Value::string("k")).unwrap().get().as_int(),
            Some(42)
        );
        assert_eq!(arr.borrow().len(), 2);
    }

    #[test]
    fn test_implicit_push_takes_next_index() {
        let arr = ArrayRef::new();
        arr.borrow_mut().get_or_create(None);
        arr.borrow_mut().get_or_create(None);
        assert_eq!(arr.borrow().next_index(), 2);
        assert!(arr.borrow().get(&Value::Int(0)).is_some());
        assert!(arr.borrow().get(&Value::Int(1)).is_some());
    }

    #[test]
    fn test_integral_real_key_aliases_int_slot() {
        let arr = ArrayRef::new();
        let slot = arr.borrow_mut().get_or_create(Some(&Value::Int(2)));
        slot.set(Value::Bool(true)).unwrap();
        let same = arr.borrow_mut().get_or_create(Some(&Value::Real(2.0)));
        assert_eq!(slot.ptr_id(), same.ptr_id());
    }

    #[test]
    fn test_nil_key_is_a_valid_associative_key() {
        let arr = ArrayRef::new();
        let slot = arr.borrow_mut().get_or_create(Some(&Value::Nil));
        slot.set(Value::Int(7)).unwrap();
        assert_eq!(arr.borrow().get(&Value::Nil).unwrap().get().as_int(), Some(7));
    }
}
