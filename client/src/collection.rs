//! Shapes of cached data that mutations know how to patch.

use std::fmt::{Debug, Display};

/// A cached item with a stable identity.
pub trait Record: Clone + 'static {
    type Id: Copy + PartialEq + Display + Debug + 'static;

    fn id(&self) -> Self::Id;
}

/// A record carrying a per-viewer boolean and a counter that moves with it,
/// like "liked" and the like count.
pub trait Toggle: Record {
    fn toggled(&self) -> bool;

    fn count(&self) -> i64;

    fn set_toggle(&mut self, toggled: bool, count: i64);

    /// Flip the flag, moving the counter by one in the same direction. The
    /// counter never goes negative.
    fn flip(&mut self) {
        let toggled = !self.toggled();
        let count = if toggled {
            self.count() + 1
        } else {
            (self.count() - 1).max(0)
        };
        self.set_toggle(toggled, count);
    }
}

/// Cached data holding records by id: an ordered list, or a single
/// optional record.
pub trait Collection: Default + 'static {
    type Item: Record;

    fn find_mut(
        &mut self,
        id: <Self::Item as Record>::Id,
    ) -> Option<&mut Self::Item>;

    /// Put `item` first, replacing any record with the same id.
    fn insert_front(&mut self, item: Self::Item);

    /// Replace the record with the same id in place, or insert it first.
    fn upsert(&mut self, item: Self::Item);

    /// Returns whether anything was removed.
    fn remove(&mut self, id: <Self::Item as Record>::Id) -> bool;
}

impl<T: Record> Collection for Vec<T> {
    type Item = T;

    fn find_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.iter_mut().find(|item| item.id() == id)
    }

    fn insert_front(&mut self, item: T) {
        let id = item.id();
        self.retain(|existing| existing.id() != id);
        self.insert(0, item);
    }

    fn upsert(&mut self, item: T) {
        match self.find_mut(item.id()) {
            Some(existing) => *existing = item,
            None => self.insert(0, item),
        }
    }

    fn remove(&mut self, id: T::Id) -> bool {
        let before = self.len();
        self.retain(|item| item.id() != id);
        self.len() != before
    }
}

impl<T: Record> Collection for Option<T> {
    type Item = T;

    fn find_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.as_mut().filter(|item| item.id() == id)
    }

    fn insert_front(&mut self, item: T) {
        *self = Some(item);
    }

    fn upsert(&mut self, item: T) {
        *self = Some(item);
    }

    fn remove(&mut self, id: T::Id) -> bool {
        if self.as_ref().is_some_and(|item| item.id() == id) {
            *self = None;
            true
        } else {
            false
        }
    }
}
