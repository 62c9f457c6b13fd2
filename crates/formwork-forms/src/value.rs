//! The value tree held by a form session.

use crate::error::{FormError, FormResult};
use crate::path::{FieldPath, Segment};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// A form value: a leaf or a nested list/object of values.
///
/// Dates serialize as ISO `YYYY-MM-DD` strings. When deserializing, strings
/// always become [`FormValue::Text`]; dates only appear through coercion or
/// explicit construction.
///
/// # Examples
///
/// ```
/// use formwork_forms::FormValue;
/// use serde_json::json;
///
/// let value = FormValue::from(json!({"social": {"twitter": "@jane"}, "age": 30}));
/// assert_eq!(
///     value.get_path(&"social.twitter".parse().unwrap()),
///     Some(&FormValue::from("@jane"))
/// );
/// assert_eq!(value.get("age").and_then(FormValue::as_f64), Some(30.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	Text(String),
	Date(NaiveDate),
	List(Vec<FormValue>),
	Map(BTreeMap<String, FormValue>),
}

impl FormValue {
	/// An empty object.
	pub fn map() -> Self {
		FormValue::Map(BTreeMap::new())
	}

	/// Build an object from key/value pairs.
	pub fn object<K, V, I>(entries: I) -> Self
	where
		K: Into<String>,
		V: Into<FormValue>,
		I: IntoIterator<Item = (K, V)>,
	{
		FormValue::Map(
			entries
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}

	/// Whether the value counts as "not filled in": null, empty text or an
	/// empty list.
	pub fn is_empty(&self) -> bool {
		match self {
			FormValue::Null => true,
			FormValue::Text(text) => text.is_empty(),
			FormValue::List(items) => items.is_empty(),
			_ => false,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, FormValue::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FormValue::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			FormValue::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FormValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_date(&self) -> Option<NaiveDate> {
		match self {
			FormValue::Date(date) => Some(*date),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[FormValue]> {
		match self {
			FormValue::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&BTreeMap<String, FormValue>> {
		match self {
			FormValue::Map(map) => Some(map),
			_ => None,
		}
	}

	/// Whether the value is a leaf rather than a list or object.
	pub fn is_scalar(&self) -> bool {
		!matches!(self, FormValue::List(_) | FormValue::Map(_))
	}

	/// Look up a direct child of an object.
	pub fn get(&self, key: &str) -> Option<&FormValue> {
		self.as_map().and_then(|map| map.get(key))
	}

	/// Look up a nested value.
	pub fn get_path(&self, path: &FieldPath) -> Option<&FormValue> {
		self.get_segments(path.segments())
	}

	pub(crate) fn get_segments(&self, segments: &[Segment]) -> Option<&FormValue> {
		segments
			.iter()
			.try_fold(self, |node, segment| node.child(segment))
	}

	fn child(&self, segment: &Segment) -> Option<&FormValue> {
		match (self, segment) {
			(FormValue::Map(map), Segment::Key(key)) => map.get(key),
			(FormValue::Map(map), Segment::Index(index)) => map.get(&index.to_string()),
			(FormValue::List(items), Segment::Index(index)) => items.get(*index),
			_ => None,
		}
	}

	/// Check that a value could be written at `segments` without replacing a
	/// scalar or a list that is in the way.
	pub(crate) fn check_segments(&self, segments: &[Segment]) -> FormResult<()> {
		let mut node = self;
		for (depth, segment) in segments.iter().enumerate() {
			let next = match (node, segment) {
				(FormValue::Null, _) => return Ok(()),
				(FormValue::List(_), Segment::Key(_)) => {
					return Err(conflict_at(segments, depth, "expected an object but found a list"));
				}
				(FormValue::Map(_) | FormValue::List(_), _) => node.child(segment),
				_ => return Err(conflict_at(segments, depth, "traverses a scalar value")),
			};
			match next {
				Some(child) => node = child,
				None => return Ok(()),
			}
		}
		Ok(())
	}

	/// Write `value` at `segments`, creating intermediate objects and lists.
	pub(crate) fn set_segments(&mut self, segments: &[Segment], value: FormValue) -> FormResult<()> {
		let mut node = self;
		for (depth, segment) in segments.iter().enumerate() {
			node = node
				.child_or_insert(segment)
				.map_err(|reason| conflict_at(segments, depth, reason))?;
		}
		*node = value;
		Ok(())
	}

	/// Write `value` at `path`.
	pub fn set_path(&mut self, path: &FieldPath, value: FormValue) -> FormResult<()> {
		self.set_segments(path.segments(), value)
	}

	fn child_or_insert(&mut self, segment: &Segment) -> Result<&mut FormValue, &'static str> {
		if self.is_null() {
			*self = match segment {
				Segment::Key(_) => FormValue::map(),
				Segment::Index(_) => FormValue::List(Vec::new()),
			};
		}
		match (self, segment) {
			(FormValue::Map(map), Segment::Key(key)) => Ok(map.entry(key.clone()).or_default()),
			(FormValue::Map(map), Segment::Index(index)) => {
				Ok(map.entry(index.to_string()).or_default())
			}
			(FormValue::List(items), Segment::Index(index)) => {
				if items.len() <= *index {
					items.resize(index + 1, FormValue::Null);
				}
				Ok(&mut items[*index])
			}
			(FormValue::List(_), Segment::Key(_)) => Err("expected an object but found a list"),
			_ => Err("traverses a scalar value"),
		}
	}

	/// Remove the value at `segments` from its parent object and return it.
	/// List elements are left in place as `Null` so later positions keep their
	/// index.
	pub(crate) fn remove_segments(&mut self, segments: &[Segment]) -> Option<FormValue> {
		let (last, parents) = segments.split_last()?;
		let mut node = self;
		for segment in parents {
			node = match (node, segment) {
				(FormValue::Map(map), Segment::Key(key)) => map.get_mut(key)?,
				(FormValue::Map(map), Segment::Index(index)) => map.get_mut(&index.to_string())?,
				(FormValue::List(items), Segment::Index(index)) => items.get_mut(*index)?,
				_ => return None,
			};
		}
		match (node, last) {
			(FormValue::Map(map), Segment::Key(key)) => map.remove(key),
			(FormValue::Map(map), Segment::Index(index)) => map.remove(&index.to_string()),
			(FormValue::List(items), Segment::Index(index)) => {
				items.get_mut(*index).map(std::mem::take)
			}
			_ => None,
		}
	}

	/// JSON view handed to validators and used for logging.
	pub fn to_json(&self) -> serde_json::Value {
		use serde_json::Value;

		match self {
			FormValue::Null => Value::Null,
			FormValue::Bool(b) => Value::Bool(*b),
			FormValue::Number(n) => number_to_json(*n),
			FormValue::Text(text) => Value::String(text.clone()),
			FormValue::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
			FormValue::List(items) => Value::Array(items.iter().map(FormValue::to_json).collect()),
			FormValue::Map(map) => Value::Object(
				map.iter()
					.map(|(key, value)| (key.clone(), value.to_json()))
					.collect(),
			),
		}
	}
}

impl Serialize for FormValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

fn number_to_json(n: f64) -> serde_json::Value {
	// Whole numbers go out as integers so `42` does not become `42.0`.
	if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
		serde_json::Value::from(n as i64)
	} else {
		serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
	}
}

fn conflict_at(segments: &[Segment], depth: usize, reason: &str) -> FormError {
	FormError::conflict(FieldPath::render(&segments[..depth.max(1)]), reason)
}

impl From<serde_json::Value> for FormValue {
	fn from(value: serde_json::Value) -> Self {
		use serde_json::Value;

		match value {
			Value::Null => FormValue::Null,
			Value::Bool(b) => FormValue::Bool(b),
			Value::Number(n) => n.as_f64().map_or(FormValue::Null, FormValue::Number),
			Value::String(s) => FormValue::Text(s),
			Value::Array(items) => FormValue::List(items.into_iter().map(Into::into).collect()),
			Value::Object(map) => {
				FormValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
			}
		}
	}
}

impl From<&str> for FormValue {
	fn from(value: &str) -> Self {
		FormValue::Text(value.to_string())
	}
}

impl From<String> for FormValue {
	fn from(value: String) -> Self {
		FormValue::Text(value)
	}
}

impl From<f64> for FormValue {
	fn from(value: f64) -> Self {
		FormValue::Number(value)
	}
}

impl From<i32> for FormValue {
	fn from(value: i32) -> Self {
		FormValue::Number(f64::from(value))
	}
}

impl From<bool> for FormValue {
	fn from(value: bool) -> Self {
		FormValue::Bool(value)
	}
}

impl From<NaiveDate> for FormValue {
	fn from(value: NaiveDate) -> Self {
		FormValue::Date(value)
	}
}

impl<T: Into<FormValue>> From<Vec<T>> for FormValue {
	fn from(values: Vec<T>) -> Self {
		FormValue::List(values.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<FormValue>> From<Option<T>> for FormValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(FormValue::Null, Into::into)
	}
}
