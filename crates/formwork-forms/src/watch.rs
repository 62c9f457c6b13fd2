//! Value watchers.
//!
//! Callbacks run synchronously after each committed value change, with the
//! full value tree and a [`WatchEvent`] describing the change. Dropping the
//! returned [`Subscription`] removes the callback.

use crate::value::FormValue;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What kind of change produced a [`WatchEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
	/// A bound field received input.
	Change,
	/// `set_value` was called.
	SetValue,
	/// A field array gained, lost or reordered entries.
	ArrayChange,
	/// The session was reset.
	Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
	/// Path of the changed field or array; `None` when every value changed.
	pub name: Option<String>,
	pub kind: WatchKind,
}

type Observer = Rc<dyn Fn(&FormValue, &WatchEvent)>;

#[derive(Default)]
pub(crate) struct ObserverList {
	next_id: u64,
	observers: Vec<(u64, Observer)>,
}

impl ObserverList {
	pub(crate) fn add(&mut self, observer: Observer) -> u64 {
		self.next_id += 1;
		self.observers.push((self.next_id, observer));
		self.next_id
	}

	pub(crate) fn remove(&mut self, id: u64) {
		self.observers.retain(|(candidate, _)| *candidate != id);
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.observers.is_empty()
	}

	pub(crate) fn contains(&self, id: u64) -> bool {
		self.observers.iter().any(|(candidate, _)| *candidate == id)
	}

	/// Clone the callbacks out so none of them runs under a borrow.
	pub(crate) fn snapshot(&self) -> Vec<Observer> {
		self.observers
			.iter()
			.map(|(_, observer)| observer.clone())
			.collect()
	}
}

/// Keeps a watch callback registered until dropped.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
	id: u64,
	list: Weak<RefCell<ObserverList>>,
}

impl Subscription {
	pub(crate) fn new(id: u64, list: &Rc<RefCell<ObserverList>>) -> Self {
		Self {
			id,
			list: Rc::downgrade(list),
		}
	}

	/// Remove the callback now.
	pub fn unsubscribe(self) {}

	/// Whether the callback is still registered with a live session.
	pub fn is_active(&self) -> bool {
		self.list
			.upgrade()
			.is_some_and(|list| list.borrow().contains(self.id))
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(list) = self.list.upgrade() {
			list.borrow_mut().remove(self.id);
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription").field("id", &self.id).finish()
	}
}
