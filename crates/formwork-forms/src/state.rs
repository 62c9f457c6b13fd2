//! Synchronous state behind a [`FormSession`](crate::FormSession).
//!
//! Everything here runs under a single `RefCell` borrow and never awaits or
//! calls user code.

use crate::config::{FormOptions, ResetOptions, ValidationMode};
use crate::error::{FormError, FormResult};
use crate::field_array::{ArrayStore, EntryId, entry_value, entry_values};
use crate::path::{FieldPath, Segment};
use crate::rule::FieldRule;
use crate::status::FormStatus;
use crate::validation::{FieldError, FieldErrors};
use crate::value::FormValue;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Identity of a field.
///
/// Fields inside a field array are keyed by entry id rather than by index so
/// that reordering or removing entries never moves rules or errors onto a
/// different entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum FieldKey {
	Path(FieldPath),
	Entry {
		array: FieldPath,
		id: EntryId,
		rest: Vec<Segment>,
	},
}

/// Where a path points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
	Field(FieldKey),
	ArrayRoot(FieldPath),
}

pub(crate) struct SessionState {
	pub(crate) options: FormOptions,
	pub(crate) defaults: FormValue,
	/// Values outside field arrays; array paths are absent from this tree.
	values: FormValue,
	pub(crate) arrays: BTreeMap<FieldPath, ArrayStore>,
	pub(crate) rules: BTreeMap<FieldKey, FieldRule>,
	pub(crate) errors: BTreeMap<FieldKey, FieldError>,
	pub(crate) touched: BTreeSet<FieldKey>,
	pub(crate) dirty: BTreeSet<FieldKey>,
	generations: HashMap<FieldKey, u64>,
	next_generation: u64,
	next_entry_id: u64,
	pub(crate) validating: usize,
	pub(crate) submitting: bool,
	pub(crate) submitted: bool,
	pub(crate) submit_successful: bool,
	pub(crate) submit_count: u32,
}

impl SessionState {
	pub(crate) fn new(mut options: FormOptions) -> Self {
		let defaults = root_value(std::mem::take(&mut options.default_values));
		options.default_values = defaults.clone();
		Self {
			options,
			values: defaults.clone(),
			defaults,
			arrays: BTreeMap::new(),
			rules: BTreeMap::new(),
			errors: BTreeMap::new(),
			touched: BTreeSet::new(),
			dirty: BTreeSet::new(),
			generations: HashMap::new(),
			next_generation: 0,
			next_entry_id: 0,
			validating: 0,
			submitting: false,
			submitted: false,
			submit_successful: false,
			submit_count: 0,
		}
	}

	// ---- addressing ----

	pub(crate) fn resolve(&self, path: &FieldPath) -> FormResult<Location> {
		for (array, store) in &self.arrays {
			let Some(tail) = path.strip_prefix(array) else {
				continue;
			};
			let Some((first, rest)) = tail.split_first() else {
				return Ok(Location::ArrayRoot(array.clone()));
			};
			let Segment::Index(index) = first else {
				return Err(FormError::conflict(
					path,
					"field array entries are addressed by index",
				));
			};
			let id = store
				.id_at(*index)
				.ok_or_else(|| FormError::IndexOutOfBounds {
					array: array.to_string(),
					index: *index,
					len: store.len(),
				})?;
			return Ok(Location::Field(FieldKey::Entry {
				array: array.clone(),
				id,
				rest: rest.to_vec(),
			}));
		}
		Ok(Location::Field(FieldKey::Path(path.clone())))
	}

	/// Resolve a path that must name a field rather than an array root.
	pub(crate) fn resolve_field(&self, path: &FieldPath) -> FormResult<FieldKey> {
		match self.resolve(path)? {
			Location::Field(key) => Ok(key),
			Location::ArrayRoot(array) => Err(FormError::conflict(
				array,
				"is a field array; address the fields of its entries",
			)),
		}
	}

	/// Current path of `key`, or `None` once its entry has been removed.
	pub(crate) fn current_path(&self, key: &FieldKey) -> Option<FieldPath> {
		match key {
			FieldKey::Path(path) => Some(path.clone()),
			FieldKey::Entry { array, id, rest } => {
				let index = self.arrays.get(array)?.position(*id)?;
				Some(array.index(index).join(rest))
			}
		}
	}

	pub(crate) fn display(&self, key: &FieldKey) -> Option<String> {
		self.current_path(key).map(|path| path.to_string())
	}

	/// Registered keys at or below `path`.
	pub(crate) fn keys_matching(&self, path: &FieldPath) -> Vec<FieldKey> {
		self.rules
			.keys()
			.filter(|key| {
				self.current_path(key)
					.is_some_and(|current| current.starts_with(path))
			})
			.cloned()
			.collect()
	}

	fn entry_missing(array: &FieldPath, id: EntryId) -> FormError {
		FormError::RemovedEntry {
			array: array.to_string(),
			id,
		}
	}

	// ---- values ----

	/// The full value tree, field arrays included.
	pub(crate) fn compose(&self) -> FormValue {
		let mut values = self.values.clone();
		for (path, store) in &self.arrays {
			if let Err(error) = values.set_path(path, store.project()) {
				tracing::warn!(array = %path, error = %error, "field array could not be projected");
			}
		}
		values
	}

	pub(crate) fn value_at(&self, path: &FieldPath) -> Option<FormValue> {
		let crosses_array = self.arrays.keys().any(|array| array.starts_with(path));
		if crosses_array || self.arrays.keys().any(|array| path.starts_with(array)) {
			self.compose().get_path(path).cloned()
		} else {
			self.values.get_path(path).cloned()
		}
	}

	pub(crate) fn read(&self, key: &FieldKey) -> Option<FormValue> {
		match key {
			FieldKey::Path(path) => self.value_at(path),
			FieldKey::Entry { array, id, rest } => self
				.arrays
				.get(array)?
				.entry(*id)?
				.get_segments(rest)
				.cloned(),
		}
	}

	pub(crate) fn write(&mut self, key: &FieldKey, value: FormValue) -> FormResult<()> {
		match key {
			FieldKey::Path(path) => {
				self.guard_array_parents(path)?;
				self.values.set_path(path, value)
			}
			FieldKey::Entry { array, id, rest } => {
				let value = if rest.is_empty() {
					entry_value(array, value)?
				} else {
					value
				};
				let entry = self
					.arrays
					.get_mut(array)
					.and_then(|store| store.entry_mut(*id))
					.ok_or_else(|| Self::entry_missing(array, *id))?;
				entry.set_segments(rest, value)
			}
		}
	}

	/// Reject writes that would replace an object holding a field array.
	fn guard_array_parents(&self, path: &FieldPath) -> FormResult<()> {
		match self.arrays.keys().find(|array| array.starts_with(path)) {
			Some(array) => Err(FormError::conflict(
				path,
				format!("contains the field array {}", array),
			)),
			None => Ok(()),
		}
	}

	fn default_for(&self, key: &FieldKey) -> Option<FormValue> {
		let path = self.current_path(key)?;
		self.defaults.get_path(&path).cloned()
	}

	/// Mark `key` dirty when it differs from its default, clean otherwise.
	pub(crate) fn update_dirty(&mut self, key: &FieldKey) {
		let current = self.read(key).unwrap_or_default();
		let default = self.default_for(key).unwrap_or_default();
		if current == default {
			self.dirty.remove(key);
		} else {
			self.dirty.insert(key.clone());
		}
	}

	/// Values handed to a submit handler: disabled fields are left out.
	pub(crate) fn submission_values(&self) -> FormValue {
		let mut values = self.compose();
		for (key, rule) in &self.rules {
			if !rule.is_disabled() {
				continue;
			}
			if let Some(path) = self.current_path(key) {
				values.remove_segments(path.segments());
			}
		}
		values
	}

	// ---- registration ----

	pub(crate) fn register(&mut self, path: &FieldPath, rule: FieldRule) -> FormResult<FieldKey> {
		let key = self.resolve_field(path)?;
		match &key {
			FieldKey::Path(plain) => {
				self.guard_array_parents(plain)?;
				self.values.check_segments(plain.segments())?;
			}
			FieldKey::Entry { array, id, rest } => {
				if rest.is_empty() {
					return Err(FormError::conflict(
						path,
						"register a field inside the entry, not the entry itself",
					));
				}
				if let Some(entry) = self.arrays.get(array).and_then(|store| store.entry(*id)) {
					entry
						.check_segments(rest)
						.map_err(|_| FormError::conflict(path, "traverses a scalar value"))?;
				}
			}
		}
		if rule.is_disabled() {
			self.errors.remove(&key);
		}
		self.rules.insert(key.clone(), rule);
		Ok(key)
	}

	pub(crate) fn unregister(&mut self, key: &FieldKey) {
		self.rules.remove(key);
		self.forget(key);
	}

	fn forget(&mut self, key: &FieldKey) {
		self.errors.remove(key);
		self.touched.remove(key);
		self.dirty.remove(key);
		self.generations.remove(key);
	}

	// ---- validation bookkeeping ----

	/// Start a new validation generation for `key`.
	pub(crate) fn bump(&mut self, key: &FieldKey) -> u64 {
		self.next_generation += 1;
		self.generations.insert(key.clone(), self.next_generation);
		self.next_generation
	}

	pub(crate) fn is_current(&self, key: &FieldKey, generation: u64) -> bool {
		self.generations.get(key) == Some(&generation)
	}

	pub(crate) fn active_mode(&self) -> ValidationMode {
		if self.submitted {
			self.options.revalidate_mode
		} else {
			self.options.mode
		}
	}

	fn is_active_field(&self, key: &FieldKey) -> bool {
		self.rules.get(key).is_some_and(|rule| !rule.is_disabled())
	}

	pub(crate) fn change_validates(&self, key: &FieldKey) -> bool {
		self.is_active_field(key)
			&& self
				.active_mode()
				.validates_on_change(self.touched.contains(key))
	}

	pub(crate) fn blur_validates(&self, key: &FieldKey) -> bool {
		self.is_active_field(key) && self.active_mode().validates_on_blur()
	}

	pub(crate) fn field_errors(&self) -> FieldErrors {
		self.errors
			.iter()
			.filter_map(|(key, error)| Some((self.display(key)?, error.clone())))
			.collect()
	}

	pub(crate) fn status(&self) -> FormStatus {
		FormStatus {
			is_dirty: self.compose() != self.defaults,
			is_valid: self.errors.is_empty(),
			is_validating: self.validating > 0,
			is_submitting: self.submitting,
			is_submitted: self.submitted,
			is_submit_successful: self.submit_successful,
			submit_count: self.submit_count,
		}
	}

	// ---- field arrays ----

	/// Open the field array at `path`, moving its list out of the value tree.
	pub(crate) fn open_array(&mut self, path: &FieldPath) -> FormResult<()> {
		if self.arrays.contains_key(path) {
			return Ok(());
		}
		if path
			.segments()
			.iter()
			.any(|segment| matches!(segment, Segment::Index(_)))
		{
			return Err(FormError::conflict(
				path,
				"field arrays must be addressed by object keys only",
			));
		}
		if let Some(other) = self
			.arrays
			.keys()
			.find(|other| other.starts_with(path) || path.starts_with(other))
		{
			return Err(FormError::conflict(
				path,
				format!("field arrays cannot nest (overlaps {})", other),
			));
		}
		self.values.check_segments(path.segments())?;

		let current = self.values.get_path(path).cloned().unwrap_or_default();
		let entries = entry_values(path, current)?;
		self.values.remove_segments(path.segments());

		let mut store = ArrayStore::new();
		for (index, values) in entries.into_iter().enumerate() {
			let id = self.allocate_id();
			store.insert(index, id, values);
		}
		self.arrays.insert(path.clone(), store);
		self.ensure_default_list(path);
		self.adopt_plain_keys(path);
		tracing::debug!(array = %path, "opened field array");
		Ok(())
	}

	/// An array missing from the defaults defaults to an empty list, so that
	/// opening it does not make the form dirty.
	fn ensure_default_list(&mut self, path: &FieldPath) {
		if self.defaults.get_path(path).is_some() {
			return;
		}
		let empty = FormValue::List(Vec::new());
		if let Err(error) = self.defaults.set_path(path, empty) {
			tracing::warn!(array = %path, error = %error, "no default list for field array");
		}
	}

	/// Re-key fields registered by plain path under a newly opened array.
	fn adopt_plain_keys(&mut self, array: &FieldPath) {
		self.remap_keys(|state, key| match key {
			FieldKey::Path(path) if path.starts_with(array) => match state.resolve(path) {
				Ok(Location::Field(entry @ FieldKey::Entry { .. })) => Some(entry),
				_ => None,
			},
			other => Some(other.clone()),
		});
	}

	pub(crate) fn array(&self, path: &FieldPath) -> Option<&ArrayStore> {
		self.arrays.get(path)
	}

	fn array_mut(&mut self, path: &FieldPath) -> FormResult<&mut ArrayStore> {
		self.arrays
			.get_mut(path)
			.ok_or_else(|| FormError::UnknownFieldArray(path.to_string()))
	}

	fn allocate_id(&mut self) -> EntryId {
		let id = EntryId::new(self.next_entry_id);
		self.next_entry_id += 1;
		id
	}

	fn check_index(&self, path: &FieldPath, index: usize, len: usize) -> FormResult<()> {
		if index < len {
			Ok(())
		} else {
			Err(FormError::IndexOutOfBounds {
				array: path.to_string(),
				index,
				len,
			})
		}
	}

	pub(crate) fn insert_entry(
		&mut self,
		path: &FieldPath,
		index: usize,
		value: FormValue,
	) -> FormResult<EntryId> {
		let len = self.array_mut(path)?.len();
		// Inserting at `len` appends.
		if index > len {
			return Err(FormError::IndexOutOfBounds {
				array: path.to_string(),
				index,
				len,
			});
		}
		let value = entry_value(path, value)?;
		let id = self.allocate_id();
		self.array_mut(path)?.insert(index, id, value);
		Ok(id)
	}

	pub(crate) fn remove_entry(&mut self, path: &FieldPath, index: usize) -> FormResult<EntryId> {
		let len = self.array_mut(path)?.len();
		self.check_index(path, index, len)?;
		let id = self.array_mut(path)?.remove(index);
		self.remap_keys(|_, key| match key {
			FieldKey::Entry { array, id: owner, .. } if array == path && *owner == id => None,
			other => Some(other.clone()),
		});
		Ok(id)
	}

	pub(crate) fn swap_entries(&mut self, path: &FieldPath, a: usize, b: usize) -> FormResult<()> {
		let len = self.array_mut(path)?.len();
		self.check_index(path, a, len)?;
		self.check_index(path, b, len)?;
		self.array_mut(path)?.swap(a, b);
		Ok(())
	}

	pub(crate) fn move_entry(&mut self, path: &FieldPath, from: usize, to: usize) -> FormResult<()> {
		let len = self.array_mut(path)?.len();
		self.check_index(path, from, len)?;
		self.check_index(path, to, len)?;
		self.array_mut(path)?.move_entry(from, to);
		Ok(())
	}

	/// Replace every entry of the array at `path` with fresh ids.
	///
	/// Rules and touched marks move to the new entry at the same position;
	/// errors and dirty marks of the old entries are dropped.
	pub(crate) fn replace_entries(
		&mut self,
		path: &FieldPath,
		list: FormValue,
	) -> FormResult<Vec<EntryId>> {
		let entries = entry_values(path, list)?;
		let old = self.array_mut(path)?.clear();

		let mut ids = Vec::with_capacity(entries.len());
		for (index, values) in entries.into_iter().enumerate() {
			let id = self.allocate_id();
			self.array_mut(path)?.insert(index, id, values);
			ids.push(id);
		}

		let moved: HashMap<EntryId, EntryId> = old.iter().copied().zip(ids.iter().copied()).collect();
		self.errors.retain(|key, _| !is_entry_of(key, path));
		self.dirty.retain(|key| !is_entry_of(key, path));
		self.remap_keys(|_, key| match key {
			FieldKey::Entry { array, id, rest } if array == path => {
				moved.get(id).map(|new_id| FieldKey::Entry {
					array: array.clone(),
					id: *new_id,
					rest: rest.clone(),
				})
			}
			other => Some(other.clone()),
		});
		Ok(ids)
	}

	/// Rewrite the keys of every per-field collection; `None` drops the key.
	///
	/// Generations are not carried over, so in-flight validations of a
	/// re-keyed field are discarded.
	fn remap_keys<F>(&mut self, remap: F)
	where
		F: Fn(&SessionState, &FieldKey) -> Option<FieldKey>,
	{
		let rules = std::mem::take(&mut self.rules);
		let errors = std::mem::take(&mut self.errors);
		let touched = std::mem::take(&mut self.touched);
		let dirty = std::mem::take(&mut self.dirty);
		let generations = std::mem::take(&mut self.generations);

		self.rules = rules
			.into_iter()
			.filter_map(|(key, rule)| Some((remap(self, &key)?, rule)))
			.collect();
		self.errors = errors
			.into_iter()
			.filter_map(|(key, error)| Some((remap(self, &key)?, error)))
			.collect();
		self.touched = touched
			.into_iter()
			.filter_map(|key| remap(self, &key))
			.collect();
		self.dirty = dirty.into_iter().filter_map(|key| remap(self, &key)).collect();
		self.generations = generations
			.into_iter()
			.filter(|(key, _)| remap(self, key).as_ref() == Some(key))
			.collect();
	}

	// ---- reset ----

	pub(crate) fn reset(&mut self, values: Option<FormValue>, options: ResetOptions) {
		if let Some(values) = values {
			let values = root_value(values);
			if !options.keep_default_values {
				self.defaults = values.clone();
				self.options.default_values = values.clone();
			}
			self.values = values;
		} else {
			self.values = self.defaults.clone();
		}

		if !options.keep_errors {
			self.errors.clear();
		}
		if !options.keep_touched {
			self.touched.clear();
		}
		self.dirty.clear();

		let paths: Vec<FieldPath> = self.arrays.keys().cloned().collect();
		for path in paths {
			let list = self
				.values
				.remove_segments(path.segments())
				.unwrap_or_default();
			let list = match entry_values(&path, list) {
				Ok(entries) => FormValue::List(entries),
				Err(error) => {
					tracing::warn!(array = %path, error = %error, "reset left field array empty");
					FormValue::List(Vec::new())
				}
			};
			if let Err(error) = self.replace_entries(&path, list) {
				tracing::warn!(array = %path, error = %error, "field array could not be reset");
			}
			self.ensure_default_list(&path);
		}

		// In-flight validations belong to the old values.
		let keys: Vec<FieldKey> = self.generations.keys().cloned().collect();
		for key in keys {
			self.bump(&key);
		}

		self.submitted = false;
		self.submit_successful = false;
		if !options.keep_submit_count {
			self.submit_count = 0;
		}
	}
}

fn is_entry_of(key: &FieldKey, path: &FieldPath) -> bool {
	matches!(key, FieldKey::Entry { array, .. } if array == path)
}

/// Session roots are always objects.
fn root_value(values: FormValue) -> FormValue {
	match values {
		FormValue::Map(_) => values,
		FormValue::Null => FormValue::map(),
		other => {
			tracing::warn!(value = ?other, "default values must be an object; starting empty");
			FormValue::map()
		}
	}
}
