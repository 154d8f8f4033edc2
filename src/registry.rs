//! Process-wide mapping from an aggregate id to its live actor handle.
//!
//! One [`Registry`] is owned per aggregate type by that type's
//! [`Supervisor`](crate::supervisor::Supervisor) — the `(type, id)` pair
//! of `SPEC_FULL.md` §4.3 collapses to just `id` here because the type
//! half is already fixed by which `Supervisor` you're talking to.
//!
//! Lookup-or-insert is atomic: the whole critical section runs under one
//! [`parking_lot::Mutex`] acquisition, so two callers racing to dispatch
//! the first command for an unseen id can never spawn two actors for it
//! (`SPEC_FULL.md` §4.3, §5).

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

/// A concurrent `(id -> handle)` map with atomic lookup-or-insert.
pub struct Registry<Id, Handle> {
    entries: Mutex<HashMap<Id, Handle>>,
}

impl<Id, Handle> Default for Registry<Id, Handle> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<Id, Handle> Registry<Id, Handle>
where
    Id: Eq + Hash + Clone,
    Handle: Clone,
{
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle registered for `id`, if any, without spawning.
    #[must_use]
    pub fn lookup(&self, id: &Id) -> Option<Handle> {
        self.entries.lock().get(id).cloned()
    }

    /// Returns the handle registered for `id`, spawning one with `spawn`
    /// if none exists yet. `spawn` runs inside the lock, so it must not
    /// block or itself try to touch this registry — it should only
    /// construct and start the actor task, returning its handle.
    pub fn lookup_or_spawn<F>(&self, id: Id, spawn: F) -> Handle
    where
        F: FnOnce() -> Handle,
    {
        self.entries
            .lock()
            .entry(id)
            .or_insert_with(spawn)
            .clone()
    }

    /// Removes `id` from the registry, typically called by an actor
    /// tearing itself down (idle shutdown or a fatal conflict).
    pub fn unregister(&self, id: &Id) {
        self.entries.lock().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn lookup_or_spawn_only_spawns_once() {
        let registry: Registry<u32, &'static str> = Registry::new();
        let spawn_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let spawn_count = Arc::clone(&spawn_count);
            registry.lookup_or_spawn(1, || {
                spawn_count.fetch_add(1, Ordering::SeqCst);
                "handle"
            });
        }

        assert_eq!(spawn_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_allows_respawn() {
        let registry: Registry<u32, u32> = Registry::new();

        registry.lookup_or_spawn(1, || 10);
        registry.unregister(&1);
        let handle = registry.lookup_or_spawn(1, || 20);

        assert_eq!(handle, 20);
    }
}
