//! Declarative per-field rules.

use crate::value::FormValue;
use chrono::NaiveDate;
use formwork_validators::{AsyncValidator, Verdict};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Type alias for synchronous named validator functions
pub type SyncCheckFn = Arc<dyn Fn(&FormValue) -> Verdict + Send + Sync>;

/// A single constraint of a [`FieldRule`].
#[derive(Clone)]
pub enum Constraint {
	Required { message: String },
	MinLength { min: usize, message: String },
	MaxLength { max: usize, message: String },
	Min { min: f64, message: String },
	Max { max: f64, message: String },
	Pattern { regex: Regex, message: String },
	/// Synchronous named validator.
	Validate { name: String, check: SyncCheckFn },
	/// Asynchronous named validator.
	ValidateAsync {
		name: String,
		validator: Arc<dyn AsyncValidator>,
	},
	/// The field takes no part in validation or submission.
	Disabled,
}

/// Evaluation stage; constraints run by stage, then in declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
	Required,
	BuiltIn,
	Sync,
	Async,
	Inert,
}

impl Constraint {
	pub(crate) fn stage(&self) -> Stage {
		match self {
			Constraint::Required { .. } => Stage::Required,
			Constraint::MinLength { .. }
			| Constraint::MaxLength { .. }
			| Constraint::Min { .. }
			| Constraint::Max { .. }
			| Constraint::Pattern { .. } => Stage::BuiltIn,
			Constraint::Validate { .. } => Stage::Sync,
			Constraint::ValidateAsync { .. } => Stage::Async,
			Constraint::Disabled => Stage::Inert,
		}
	}

	/// Short description used in devtools snapshots, e.g. `minLength(3)`.
	pub fn describe(&self) -> String {
		match self {
			Constraint::Required { .. } => "required".to_string(),
			Constraint::MinLength { min, .. } => format!("minLength({})", min),
			Constraint::MaxLength { max, .. } => format!("maxLength({})", max),
			Constraint::Min { min, .. } => format!("min({})", min),
			Constraint::Max { max, .. } => format!("max({})", max),
			Constraint::Pattern { regex, .. } => format!("pattern(/{}/)", regex.as_str()),
			Constraint::Validate { name, .. } => format!("validate:{}", name),
			Constraint::ValidateAsync { name, .. } => format!("validate:{} (async)", name),
			Constraint::Disabled => "disabled".to_string(),
		}
	}
}

impl fmt::Debug for Constraint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.describe())
	}
}

/// How raw input is converted before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
	#[default]
	None,
	/// Text is parsed as a number; unparseable text becomes `Null`.
	Number,
	/// Text is parsed as `YYYY-MM-DD`; unparseable text becomes `Null`.
	Date,
}

impl Coercion {
	pub fn apply(self, value: FormValue) -> FormValue {
		let text = match value {
			FormValue::Text(text) => text,
			other => return other,
		};
		match self {
			Coercion::None => FormValue::Text(text),
			Coercion::Number => text
				.trim()
				.parse::<f64>()
				.ok()
				.filter(|n| n.is_finite())
				.map_or(FormValue::Null, FormValue::Number),
			Coercion::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
				.map_or(FormValue::Null, FormValue::Date),
		}
	}
}

/// Validation and input handling for one field.
///
/// # Examples
///
/// ```
/// use formwork_forms::{FieldRule, FormValue};
/// use regex::Regex;
///
/// let rule = FieldRule::new()
///     .required("Email is required")
///     .pattern(
///         Regex::new(r"\S+@\S+\.\S+").unwrap(),
///         "Please enter a valid email address",
///     )
///     .validate("notAdmin", |value: &FormValue| {
///         if value.as_str() == Some("admin@example.com") {
///             Err("Nice try!".to_string())
///         } else {
///             Ok(())
///         }
///     });
///
/// assert_eq!(rule.constraints().len(), 3);
/// assert!(!rule.is_disabled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
	constraints: Vec<Constraint>,
	coercion: Coercion,
}

impl FieldRule {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn required(self, message: impl Into<String>) -> Self {
		self.with_constraint(Constraint::Required {
			message: message.into(),
		})
	}

	/// Mark the field required without a message. The error it reports
	/// carries an empty message.
	pub fn required_flag(self) -> Self {
		self.required("")
	}

	pub fn min_length(self, min: usize, message: impl Into<String>) -> Self {
		self.with_constraint(Constraint::MinLength {
			min,
			message: message.into(),
		})
	}

	pub fn max_length(self, max: usize, message: impl Into<String>) -> Self {
		self.with_constraint(Constraint::MaxLength {
			max,
			message: message.into(),
		})
	}

	pub fn min(self, min: f64, message: impl Into<String>) -> Self {
		self.with_constraint(Constraint::Min {
			min,
			message: message.into(),
		})
	}

	pub fn max(self, max: f64, message: impl Into<String>) -> Self {
		self.with_constraint(Constraint::Max {
			max,
			message: message.into(),
		})
	}

	pub fn pattern(self, regex: Regex, message: impl Into<String>) -> Self {
		self.with_constraint(Constraint::Pattern {
			regex,
			message: message.into(),
		})
	}

	/// Add a synchronous named validator.
	pub fn validate<F>(self, name: impl Into<String>, check: F) -> Self
	where
		F: Fn(&FormValue) -> Verdict + Send + Sync + 'static,
	{
		self.with_constraint(Constraint::Validate {
			name: name.into(),
			check: Arc::new(check),
		})
	}

	/// Add an asynchronous named validator.
	pub fn validate_async(
		self,
		name: impl Into<String>,
		validator: impl AsyncValidator + 'static,
	) -> Self {
		self.validate_async_shared(name, Arc::new(validator))
	}

	/// Add an asynchronous named validator shared with other rules.
	pub fn validate_async_shared(
		self,
		name: impl Into<String>,
		validator: Arc<dyn AsyncValidator>,
	) -> Self {
		self.with_constraint(Constraint::ValidateAsync {
			name: name.into(),
			validator,
		})
	}

	/// Store changes as numbers.
	pub fn value_as_number(mut self) -> Self {
		self.coercion = Coercion::Number;
		self
	}

	/// Store changes as dates.
	pub fn value_as_date(mut self) -> Self {
		self.coercion = Coercion::Date;
		self
	}

	pub fn disabled(mut self, disabled: bool) -> Self {
		self.constraints
			.retain(|c| !matches!(c, Constraint::Disabled));
		if disabled {
			self.constraints.push(Constraint::Disabled);
		}
		self
	}

	pub fn with_constraint(mut self, constraint: Constraint) -> Self {
		self.constraints.push(constraint);
		self
	}

	pub fn constraints(&self) -> &[Constraint] {
		&self.constraints
	}

	pub fn coercion(&self) -> Coercion {
		self.coercion
	}

	pub fn is_disabled(&self) -> bool {
		self.constraints
			.iter()
			.any(|c| matches!(c, Constraint::Disabled))
	}

	/// Constraints in evaluation order.
	pub(crate) fn pipeline(&self) -> Vec<&Constraint> {
		let mut ordered: Vec<&Constraint> = self
			.constraints
			.iter()
			.filter(|c| c.stage() != Stage::Inert)
			.collect();
		// Stable sort keeps declared order within a stage.
		ordered.sort_by_key(|c| c.stage());
		ordered
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn test_pipeline_orders_by_stage_then_declaration() {
		// Arrange
		let rule = FieldRule::new()
			.validate("first", |_| Ok(()))
			.min_length(3, "short")
			.required("required")
			.pattern(Regex::new("a").unwrap(), "pattern")
			.validate("second", |_| Ok(()));

		// Act
		let order: Vec<String> = rule.pipeline().iter().map(|c| c.describe()).collect();

		// Assert
		assert_eq!(
			order,
			vec![
				"required",
				"minLength(3)",
				"pattern(/a/)",
				"validate:first",
				"validate:second"
			]
		);
	}

	#[test]
	fn test_disabled_toggles_a_single_marker() {
		// Act
		let rule = FieldRule::new().disabled(true).disabled(true);
		let enabled = rule.clone().disabled(false);

		// Assert
		assert!(rule.is_disabled());
		assert_eq!(rule.constraints().len(), 1);
		assert!(rule.pipeline().is_empty());
		assert!(!enabled.is_disabled());
	}

	#[rstest]
	#[case(Coercion::Number, FormValue::from("18"), FormValue::Number(18.0))]
	#[case(Coercion::Number, FormValue::from(" 2.5 "), FormValue::Number(2.5))]
	#[case(Coercion::Number, FormValue::from("abc"), FormValue::Null)]
	#[case(Coercion::Number, FormValue::from(""), FormValue::Null)]
	#[case(Coercion::Number, FormValue::from("NaN"), FormValue::Null)]
	#[case(Coercion::Number, FormValue::Number(3.0), FormValue::Number(3.0))]
	#[case(Coercion::Date, FormValue::from("1990-05-17"), FormValue::Date(NaiveDate::from_ymd_opt(1990, 5, 17).unwrap()))]
	#[case(Coercion::Date, FormValue::from("17/05/1990"), FormValue::Null)]
	#[case(Coercion::None, FormValue::from("18"), FormValue::from("18"))]
	fn test_coercion(
		#[case] coercion: Coercion,
		#[case] input: FormValue,
		#[case] expected: FormValue,
	) {
		assert_eq!(coercion.apply(input), expected);
	}
}
