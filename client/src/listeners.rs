use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type Listener = Rc<dyn Fn()>;

/// Handle returned by `subscribe`, used to unsubscribe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callbacks run after every state change.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Listener)>>,
}

impl Listeners {
    pub fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) {
        self.entries.borrow_mut().retain(|(entry, _)| *entry != id);
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn notify(&self) {
        // Snapshot first: a listener may subscribe or unsubscribe while
        // running.
        let listeners: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}
