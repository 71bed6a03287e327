//! Cycle collector.
//!
//! `Rc` reclaims acyclic garbage on its own; what it cannot reclaim is a
//! reference cycle (an object whose member points back at it, two arrays
//! holding each other). The collector tracks every object and array in a
//! per-function-scope arena of weak handles, and on demand does a
//! mark-and-sever pass: mark everything reachable from the Job's roots,
//! then break the internal edges of whatever survives unmarked so the
//! ordinary refcounts can finish the job.
//!
//! Severing rather than dropping means a host-held handle to a collected
//! container stays valid — it just sees an emptied container.

use rustc_hash::FxHashSet;

use crate::array::{ArrayRef, ArrayWeak};
use crate::object::{ObjectRef, ObjectWeak};
use crate::value::Value;

/// A tracked container, held weakly so the arena never keeps anything
/// alive by itself.
#[derive(Clone, Debug)]
pub enum GcItem {
    Object(ObjectWeak),
    Array(ArrayWeak),
}

/// The set of containers created while one function scope was innermost.
#[derive(Debug, Default)]
pub struct GcArena {
    items: Vec<GcItem>,
}

impl GcArena {
    pub fn new() -> Self {
        GcArena { items: Vec::new() }
    }

    pub fn track_object(&mut self, obj: &ObjectRef) {
        self.items.push(GcItem::Object(obj.downgrade()));
    }

    pub fn track_array(&mut self, arr: &ArrayRef) {
        self.items.push(GcItem::Array(arr.downgrade()));
    }

    /// Fold another arena into this one (callee scope teardown).
    pub fn merge(&mut self, other: GcArena) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mark from `roots`, sever unmarked survivors, and drop dead weak
    /// handles. Returns how many containers were severed.
    pub fn collect(&mut self, roots: &[Value]) -> usize {
        let marked = mark(roots);
        let mut severed = 0;

        self.items.retain(|item| match item {
            GcItem::Object(weak) => match weak.upgrade() {
                Some(obj) => {
                    if !marked.contains(&obj.ptr_id()) {
                        obj.borrow_mut().sever();
                        severed += 1;
                        // The severed container's own handles are gone;
                        // refcounting reclaims it, so stop tracking.
                        false
                    } else {
                        true
                    }
                }
                None => false,
            },
            GcItem::Array(weak) => match weak.upgrade() {
                Some(arr) => {
                    if !marked.contains(&arr.ptr_id()) {
                        arr.borrow_mut().sever();
                        severed += 1;
                        false
                    } else {
                        true
                    }
                }
                None => false,
            },
        });

        severed
    }
}

/// Iterative reachability walk. Returns the pointer identities of every
/// container reachable from `roots`.
fn mark(roots: &[Value]) -> FxHashSet<usize> {
    let mut marked = FxHashSet::default();
    let mut work: Vec<Value> = roots.to_vec();

    while let Some(value) = work.pop() {
        match value {
            Value::Object(obj) => {
                if marked.insert(obj.ptr_id()) {
                    for (_, var) in obj.borrow().members() {
                        work.push(var.get());
                    }
                }
            }
            Value::Array(arr) => {
                if marked.insert(arr.ptr_id()) {
                    let arr = arr.borrow();
                    for elem in arr.iter() {
                        if let Some(key) = &elem.key {
                            work.push(key.clone());
                        }
                        work.push(elem.var.get());
                    }
                }
            }
            _ => {}
        }
    }

    marked
}
