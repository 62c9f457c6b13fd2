//! Dot-delimited field paths such as `social.twitter` or `items.2.number`.

use crate::error::{FormError, FormResult};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
	/// Object key, e.g. `social`.
	Key(String),
	/// List position, e.g. the `0` in `phoneNumbers.0`.
	Index(usize),
}

impl fmt::Display for Segment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Segment::Key(key) => f.write_str(key),
			Segment::Index(index) => write!(f, "{}", index),
		}
	}
}

/// Parsed field path.
///
/// Segments made only of ASCII digits address list positions; every other
/// segment is an object key.
///
/// # Examples
///
/// ```
/// use formwork_forms::{FieldPath, Segment};
///
/// let path: FieldPath = "items.2.number".parse().unwrap();
/// assert_eq!(
///     path.segments(),
///     &[
///         Segment::Key("items".to_string()),
///         Segment::Index(2),
///         Segment::Key("number".to_string()),
///     ]
/// );
/// assert_eq!(path.to_string(), "items.2.number");
///
/// assert!("".parse::<FieldPath>().is_err());
/// assert!("social..twitter".parse::<FieldPath>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
	segments: Vec<Segment>,
}

impl FieldPath {
	pub fn parse(path: &str) -> FormResult<Self> {
		if path.is_empty() {
			return Err(invalid(path, "path is empty"));
		}

		let segments = path
			.split('.')
			.map(|raw| parse_segment(path, raw))
			.collect::<FormResult<Vec<_>>>()?;
		Ok(Self { segments })
	}

	pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
		Self { segments }
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// The segments following `prefix`, if this path starts with it.
	pub fn strip_prefix(&self, prefix: &FieldPath) -> Option<&[Segment]> {
		self.segments.strip_prefix(prefix.segments.as_slice())
	}

	pub fn starts_with(&self, prefix: &FieldPath) -> bool {
		self.segments.starts_with(&prefix.segments)
	}

	/// This path extended by `tail`.
	pub fn join(&self, tail: &[Segment]) -> FieldPath {
		let mut segments = self.segments.clone();
		segments.extend_from_slice(tail);
		Self { segments }
	}

	/// This path extended by a list position.
	pub fn index(&self, index: usize) -> FieldPath {
		self.join(&[Segment::Index(index)])
	}

	/// Render `segments` the same way [`FieldPath`] displays.
	pub(crate) fn render(segments: &[Segment]) -> String {
		segments
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join(".")
	}
}

fn parse_segment(path: &str, raw: &str) -> FormResult<Segment> {
	if raw.is_empty() {
		return Err(invalid(path, "path contains an empty segment"));
	}
	if raw.bytes().all(|b| b.is_ascii_digit()) {
		return raw
			.parse::<usize>()
			.map(Segment::Index)
			.map_err(|_| invalid(path, "list index is too large"));
	}
	Ok(Segment::Key(raw.to_string()))
}

fn invalid(path: &str, reason: &str) -> FormError {
	FormError::InvalidPath {
		path: path.to_string(),
		reason: reason.to_string(),
	}
}

impl FromStr for FieldPath {
	type Err = FormError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&Self::render(&self.segments))
	}
}

impl Serialize for FieldPath {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}
