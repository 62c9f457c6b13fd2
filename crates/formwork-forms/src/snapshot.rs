//! Serializable view of a session for devtools and debugging output.

use crate::field_array::FieldArrayEntry;
use crate::rule::{Coercion, Constraint};
use crate::state::SessionState;
use crate::status::FormStatus;
use crate::validation::{FieldError, FieldErrors};
use crate::value::FormValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything a devtools panel shows about a session at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
	pub values: FormValue,
	pub default_values: FormValue,
	pub errors: FieldErrors,
	pub touched: Vec<String>,
	pub dirty: Vec<String>,
	pub status: FormStatus,
	pub fields: Vec<FieldSnapshot>,
	pub field_arrays: BTreeMap<String, Vec<FieldArrayEntry>>,
}

/// One registered field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
	pub name: String,
	pub constraints: Vec<String>,
	pub coercion: Coercion,
	pub disabled: bool,
	pub value: Option<FormValue>,
	pub error: Option<FieldError>,
}

impl SessionSnapshot {
	pub(crate) fn capture(state: &SessionState) -> Self {
		let fields = state
			.rules
			.iter()
			.filter_map(|(key, rule)| {
				Some(FieldSnapshot {
					name: state.display(key)?,
					constraints: rule.constraints().iter().map(Constraint::describe).collect(),
					coercion: rule.coercion(),
					disabled: rule.is_disabled(),
					value: state.read(key),
					error: state.errors.get(key).cloned(),
				})
			})
			.collect();

		Self {
			values: state.compose(),
			default_values: state.defaults.clone(),
			errors: state.field_errors(),
			touched: state.touched.iter().filter_map(|key| state.display(key)).collect(),
			dirty: state.dirty.iter().filter_map(|key| state.display(key)).collect(),
			status: state.status(),
			fields,
			field_arrays: state
				.arrays
				.iter()
				.map(|(path, store)| (path.to_string(), store.fields()))
				.collect(),
		}
	}

	/// Pretty-printed JSON.
	pub fn to_json_pretty(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}
