//! Dirty-field bookkeeping and upward change propagation.
//!
//! Every attribute bag carries a [`ChangeTracker`]. Recording a change on a bag also
//! notifies its [`Subscribers`]: the bags holding it as a field value. Each of those
//! marks its own field dirty and notifies its own subscribers in turn, so a change deep
//! inside an embedded document dirties the whole path up to the root.
//!
//! Subscriptions are weak. A child never keeps its owners alive.

use indexmap::IndexMap;
use std::{
    fmt,
    rc::{Rc, Weak},
};

use crate::bag::BagCell;

/// Why a field is dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyKind {
    /// The field was given a new value and must be written whole.
    Assigned,
    /// The value is unchanged but something inside it changed.
    Nested,
}

/// Dirty fields of one bag plus the owners to notify.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    dirty: IndexMap<String, DirtyKind>,
    subscribers: Subscribers,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` as dirty. An assignment is never downgraded to a nested change.
    pub fn record(&mut self, field: &str, kind: DirtyKind) {
        match self.dirty.get_mut(field) {
            Some(existing) => {
                if kind == DirtyKind::Assigned {
                    *existing = DirtyKind::Assigned;
                }
            }
            None => {
                self.dirty.insert(field.to_string(), kind);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_field_dirty(&self, field: &str) -> bool {
        self.dirty.contains_key(field)
    }

    /// Dirty fields in the order they were first changed.
    pub fn dirty(&self) -> impl Iterator<Item = (&str, DirtyKind)> {
        self.dirty
            .iter()
            .map(|(field, kind)| (field.as_str(), *kind))
    }

    /// Resets the baseline. Subscriptions are kept.
    pub fn clear(&mut self) {
        self.dirty.clear();
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    pub fn subscribers_mut(&mut self) -> &mut Subscribers {
        &mut self.subscribers
    }
}

struct Subscriber {
    field: String,
    owner: Weak<BagCell>,
}

/// Owners holding a bag or an association as the value of one of their fields.
#[derive(Default)]
pub struct Subscribers {
    entries: Vec<Subscriber>,
}

impl Subscribers {
    /// Registers `owner` under `field`. Registering the same pair twice is a no-op.
    pub(crate) fn subscribe(&mut self, field: &str, owner: Weak<BagCell>) {
        self.entries
            .retain(|entry| entry.owner.strong_count() > 0);

        let exists = self
            .entries
            .iter()
            .any(|entry| entry.field == field && entry.owner.ptr_eq(&owner));

        if !exists {
            self.entries.push(Subscriber { field: field.to_string(), owner });
        }
    }

    /// Removes the registration of `owner` under `field`.
    pub(crate) fn unsubscribe(&mut self, field: &str, owner: &Weak<BagCell>) {
        self.entries
            .retain(|entry| !(entry.field == field && entry.owner.ptr_eq(owner)));
    }

    /// Marks the subscribed field dirty on every live owner.
    ///
    /// An owner that is already mutably borrowed is part of the change currently being
    /// propagated, so it is skipped rather than re-entered.
    pub(crate) fn notify(&self) {
        for entry in &self.entries {
            let Some(owner) = entry.owner.upgrade() else {
                continue;
            };

            match owner.try_borrow_mut() {
                Ok(mut bag) => bag.mark_dirty(&entry.field, DirtyKind::Nested),
                Err(_) => tracing::warn!(
                    field = %entry.field,
                    "owner is busy, change propagation stopped"
                ),
            }
        }
    }

    /// Whether `owner` is subscribed under any field.
    pub fn contains(&self, owner: &Rc<BagCell>) -> bool {
        self.entries
            .iter()
            .any(|entry| std::ptr::eq(entry.owner.as_ptr(), Rc::as_ptr(owner)))
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.owner.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.field))
            .finish()
    }
}
