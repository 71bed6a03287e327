//! Host resource registry.
//!
//! Native functions often hand scripts opaque handles (an open socket,
//! a parsed document). The registry stores the real Rust value against
//! a string name, scoped either to one Job or to the whole process.
//! Job-scoped entries are released, running their free hook, when their
//! Job dies — a misbehaving script cannot leak host state. A taken name
//! is a recoverable conflict, never fatal.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use reed_eval::JobId;

/// Who a registered host object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Job(JobId),
    Global,
}

/// Teardown hook invoked when a resource is cancelled or its Job dies.
pub type FreeFn = Box<dyn FnOnce(Box<dyn Any>)>;

struct Entry {
    scope: ResourceScope,
    data: Box<dyn Any>,
    free: Option<FreeFn>,
}

#[derive(Default)]
struct Inner {
    entries: FxHashMap<String, Entry>,
}

/// Shared registry; clones refer to the same table. Natives capture a
/// clone, the scheduler keeps one for cleanup.
#[derive(Clone, Default)]
pub struct ResourceTable {
    inner: Rc<RefCell<Inner>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under a unique name. Returns false when the name is
    /// already taken.
    pub fn register<T: Any>(
        &self,
        scope: ResourceScope,
        name: &str,
        data: T,
        free: Option<FreeFn>,
    ) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.entries.contains_key(name) {
            return false;
        }
        inner.entries.insert(
            name.to_owned(),
            Entry {
                scope,
                data: Box::new(data),
                free,
            },
        );
        true
    }

    /// Fetch a resource for the duration of `f`. Returns `None` when
    /// the name is unknown or holds a different type.
    pub fn with<T: Any, R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.entries.get_mut(name)?;
        entry.data.downcast_mut::<T>().map(f)
    }

    /// Cancel a registration, running its free hook. Returns false when
    /// the name was unknown.
    pub fn cancel(&self, name: &str) -> bool {
        let entry = self.inner.borrow_mut().entries.remove(name);
        match entry {
            Some(entry) => {
                if let Some(free) = entry.free {
                    free(entry.data);
                }
                true
            }
            None => false,
        }
    }

    /// Release everything scoped to `owner`, running the free hooks.
    /// Returns how many entries were released.
    pub fn free_owned(&self, owner: JobId) -> usize {
        // Hooks run after the borrow ends so they may touch the table.
        let drained: Vec<Entry> = {
            let mut inner = self.inner.borrow_mut();
            let names: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, entry)| entry.scope == ResourceScope::Job(owner))
                .map(|(name, _)| name.clone())
                .collect();
            names
                .iter()
                .filter_map(|name| inner.entries.remove(name))
                .collect()
        };
        let freed = drained.len();
        if freed > 0 {
            debug!(job = %owner, freed, "released job resources");
        }
        for entry in drained {
            if let Some(free) = entry.free {
                free(entry.data);
            }
        }
        freed
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}
