//! Synchronous observer lists.
//!
//! Both state containers notify their observers on the caller's stack,
//! right after a transition completes. Observers registered with
//! `subscribe_first` run before every ordinary one; within each group the
//! order is registration order.

use std::fmt;
use std::rc::Rc;

/// Handle returned by every `subscribe`/`watch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Rc<dyn Fn(&E)>;

pub struct Observers<E> {
    next_id: u64,
    /// `entries[..leading]` were added with `subscribe_first`.
    leading: usize,
    entries: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            leading: 0,
            entries: Vec::new(),
        }
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn subscribe(&mut self, callback: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.entries.push((id, Rc::new(callback)));
        id
    }

    /// Register a callback that runs ahead of every `subscribe`d one.
    pub(crate) fn subscribe_first(&mut self, callback: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.entries.insert(self.leading, (id, Rc::new(callback)));
        self.leading += 1;
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(pos) = self.entries.iter().position(|(entry, _)| *entry == id) else {
            return false;
        };
        if pos < self.leading {
            self.leading -= 1;
        }
        self.entries.remove(pos);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notify(&self, event: &E) {
        for (_, callback) in &self.entries {
            callback(event);
        }
    }

    /// Clones the callbacks out so they can run after the owner's borrow
    /// has been released.
    pub(crate) fn callbacks(&self) -> Vec<Callback<E>> {
        self.entries.iter().map(|(_, cb)| Rc::clone(cb)).collect()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.entries.len())
            .finish()
    }
}
