//! The value comparator.
//!
//! One total order over all values, shared by the relational operators,
//! equality, and the array's associative index. Keeping equality and
//! ordering on a single comparator is load-bearing: scripts observe the
//! same tie-breaks whether they sort, compare, or use a value as a key.
//!
//! Ordering: type rank first (Nil < Bool < numeric < string < array <
//! object < function), then within the type. Int and Real share the
//! numeric rank and compare cross-type via `f64::total_cmp`; strings
//! compare by content; reference types compare by identity.

use std::cmp::Ordering;

use crate::Value;

#[inline]
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Nil => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Real(_) => 2,
        Value::Str(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
        Value::Func(_) => 6,
    }
}

/// Total order over values.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        #[expect(clippy::cast_precision_loss, reason = "cross-type numeric compare is defined on reals")]
        (Value::Int(x), Value::Real(y)) => (*x as f64).total_cmp(y),
        #[expect(clippy::cast_precision_loss, reason = "cross-type numeric compare is defined on reals")]
        (Value::Real(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        (Value::Real(x), Value::Real(y)) => x.total_cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.as_ref().cmp(y.as_ref()),
        (Value::Array(x), Value::Array(y)) => x.ptr_id().cmp(&y.ptr_id()),
        (Value::Object(x), Value::Object(y)) => x.ptr_id().cmp(&y.ptr_id()),
        (Value::Func(x), Value::Func(y)) => {
            (std::rc::Rc::as_ptr(x) as usize).cmp(&(std::rc::Rc::as_ptr(y) as usize))
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Equality under the comparator.
#[inline]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

/// A value usable as an ordered map key.
///
/// Wraps the comparator into `Ord` so `BTreeMap<KeyValue, _>` reproduces
/// the language's associative-index ordering.
#[derive(Clone, Debug)]
pub struct KeyValue(pub Value);

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        values_equal(&self.0, &other.0)
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}
