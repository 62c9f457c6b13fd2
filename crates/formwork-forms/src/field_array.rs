//! Field arrays: ordered, dynamically sized groups of entries with stable ids.
//!
//! Entry data is stored by [`EntryId`]; the visible order is a separate list
//! of ids. Paths such as `items.1.number` are resolved through that order, so
//! removing `items.0` renumbers the paths of later entries without moving
//! their data, rules or errors.

use crate::binding::FieldBinding;
use crate::error::{FormError, FormResult};
use crate::path::FieldPath;
use crate::rule::FieldRule;
use crate::session::FormSession;
use crate::value::FormValue;
use crate::watch::WatchKind;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable identity of a field array entry.
///
/// Ids come from a per-session counter and are never reused, not even after
/// a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
	pub(crate) fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for EntryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Serialize for EntryId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// One entry as seen by a renderer: its id and its values.
///
/// Serializes flat, e.g. `{"id": "3", "number": "555"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldArrayEntry {
	pub id: EntryId,
	#[serde(flatten)]
	pub values: BTreeMap<String, FormValue>,
}

/// Storage of one field array inside the session state.
#[derive(Debug, Clone)]
pub(crate) struct ArrayStore {
	entries: HashMap<EntryId, FormValue>,
	order: Vec<EntryId>,
}

impl ArrayStore {
	pub(crate) fn new() -> Self {
		Self {
			entries: HashMap::new(),
			order: Vec::new(),
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.order.len()
	}

	pub(crate) fn ids(&self) -> &[EntryId] {
		&self.order
	}

	pub(crate) fn id_at(&self, index: usize) -> Option<EntryId> {
		self.order.get(index).copied()
	}

	pub(crate) fn position(&self, id: EntryId) -> Option<usize> {
		self.order.iter().position(|candidate| *candidate == id)
	}

	pub(crate) fn entry(&self, id: EntryId) -> Option<&FormValue> {
		self.entries.get(&id)
	}

	pub(crate) fn entry_mut(&mut self, id: EntryId) -> Option<&mut FormValue> {
		self.entries.get_mut(&id)
	}

	/// Place `values` at `index`; `index == len` appends.
	pub(crate) fn insert(&mut self, index: usize, id: EntryId, values: FormValue) {
		self.entries.insert(id, values);
		self.order.insert(index, id);
	}

	pub(crate) fn remove(&mut self, index: usize) -> EntryId {
		let id = self.order.remove(index);
		self.entries.remove(&id);
		id
	}

	pub(crate) fn swap(&mut self, a: usize, b: usize) {
		self.order.swap(a, b);
	}

	pub(crate) fn move_entry(&mut self, from: usize, to: usize) {
		let id = self.order.remove(from);
		self.order.insert(to, id);
	}

	/// Drop every entry and return the previous order.
	pub(crate) fn clear(&mut self) -> Vec<EntryId> {
		self.entries.clear();
		std::mem::take(&mut self.order)
	}

	/// The entries as a list value, in visible order.
	pub(crate) fn project(&self) -> FormValue {
		FormValue::List(
			self.order
				.iter()
				.map(|id| self.entries.get(id).cloned().unwrap_or_default())
				.collect(),
		)
	}

	pub(crate) fn fields(&self) -> Vec<FieldArrayEntry> {
		self.order
			.iter()
			.map(|id| FieldArrayEntry {
				id: *id,
				values: self
					.entries
					.get(id)
					.and_then(FormValue::as_map)
					.cloned()
					.unwrap_or_default(),
			})
			.collect()
	}
}

/// Check that `value` can be an entry of the array at `path`.
pub(crate) fn entry_value(path: &FieldPath, value: FormValue) -> FormResult<FormValue> {
	match value {
		FormValue::Map(_) => Ok(value),
		FormValue::Null => Ok(FormValue::map()),
		_ => Err(FormError::conflict(path, "field array entries must be objects")),
	}
}

/// Split a list value into entry values.
pub(crate) fn entry_values(path: &FieldPath, value: FormValue) -> FormResult<Vec<FormValue>> {
	match value {
		FormValue::Null => Ok(Vec::new()),
		FormValue::List(items) => items
			.into_iter()
			.map(|item| entry_value(path, item))
			.collect(),
		_ => Err(FormError::conflict(path, "a field array must hold a list")),
	}
}

/// Handle to a field array of a [`FormSession`].
///
/// Obtained from [`FormSession::field_array`]. All handles for the same path
/// operate on the same entries.
///
/// # Examples
///
/// ```
/// use formwork_forms::{FormOptions, FormSession, FormValue};
/// use serde_json::json;
///
/// let session = FormSession::new(
///     FormOptions::new().with_default_values(json!({"phNumbers": [{"number": ""}]})),
/// );
/// let numbers = session.field_array("phNumbers").unwrap();
///
/// let first = numbers.ids()[0];
/// let second = numbers.append(json!({"number": "555"})).unwrap();
/// numbers.remove(0).unwrap();
///
/// assert_eq!(numbers.ids(), vec![second]);
/// assert_ne!(first, second);
/// assert_eq!(
///     session.get_value("phNumbers.0.number"),
///     Some(FormValue::from("555"))
/// );
/// ```
#[derive(Clone)]
pub struct FieldArray {
	session: FormSession,
	path: FieldPath,
}

impl FieldArray {
	pub(crate) fn new(session: FormSession, path: FieldPath) -> Self {
		Self { session, path }
	}

	/// Path of the array, e.g. `phNumbers`.
	pub fn name(&self) -> String {
		self.path.to_string()
	}

	pub fn append(&self, entry: impl Into<FormValue>) -> FormResult<EntryId> {
		let index = self.len();
		self.insert(index, entry)
	}

	pub fn prepend(&self, entry: impl Into<FormValue>) -> FormResult<EntryId> {
		self.insert(0, entry)
	}

	/// Insert at `index`, shifting later entries; `index == len` appends.
	pub fn insert(&self, index: usize, entry: impl Into<FormValue>) -> FormResult<EntryId> {
		let entry = entry.into();
		let id = self
			.session
			.with_state_mut(|state| state.insert_entry(&self.path, index, entry))?;
		tracing::debug!(array = %self.path, index, id = %id, "inserted field array entry");
		self.session.notify(Some(self.name()), WatchKind::ArrayChange);
		Ok(id)
	}

	/// Remove the entry at `index` together with its rules, errors and marks.
	pub fn remove(&self, index: usize) -> FormResult<EntryId> {
		let id = self
			.session
			.with_state_mut(|state| state.remove_entry(&self.path, index))?;
		tracing::debug!(array = %self.path, index, id = %id, "removed field array entry");
		self.session.notify(Some(self.name()), WatchKind::ArrayChange);
		Ok(id)
	}

	pub fn swap(&self, a: usize, b: usize) -> FormResult<()> {
		self.session
			.with_state_mut(|state| state.swap_entries(&self.path, a, b))?;
		self.session.notify(Some(self.name()), WatchKind::ArrayChange);
		Ok(())
	}

	/// Move the entry at `from` so that it ends up at `to`.
	pub fn move_entry(&self, from: usize, to: usize) -> FormResult<()> {
		self.session
			.with_state_mut(|state| state.move_entry(&self.path, from, to))?;
		self.session.notify(Some(self.name()), WatchKind::ArrayChange);
		Ok(())
	}

	/// Replace all entries. New entries get fresh ids; rules registered on
	/// entry fields carry over by position.
	pub fn replace<I, V>(&self, entries: I) -> FormResult<Vec<EntryId>>
	where
		I: IntoIterator<Item = V>,
		V: Into<FormValue>,
	{
		let list = FormValue::List(entries.into_iter().map(Into::into).collect());
		let ids = self
			.session
			.with_state_mut(|state| state.replace_entries(&self.path, list))?;
		self.session.notify(Some(self.name()), WatchKind::ArrayChange);
		Ok(ids)
	}

	/// Entries in visible order.
	pub fn fields(&self) -> Vec<FieldArrayEntry> {
		self.session
			.with_state(|state| state.array(&self.path).map(ArrayStore::fields))
			.unwrap_or_default()
	}

	pub fn ids(&self) -> Vec<EntryId> {
		self.session
			.with_state(|state| state.array(&self.path).map(|store| store.ids().to_vec()))
			.unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.session
			.with_state(|state| state.array(&self.path).map(ArrayStore::len))
			.unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Register `field` of the entry currently at `index`, e.g. `number`.
	pub fn register(&self, index: usize, field: &str, rule: FieldRule) -> FormResult<FieldBinding> {
		self.session
			.register(&format!("{}.{}.{}", self.path, index, field), rule)
	}
}

impl fmt::Debug for FieldArray {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldArray")
			.field("path", &self.path)
			.field("ids", &self.ids())
			.finish()
	}
}
