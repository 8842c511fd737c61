//! Attribute name normalization and validated target names

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{AttrProbeError, Result};

/// Conventional suffix carried by attribute class names.
pub const ATTRIBUTE_SUFFIX: &str = "Attribute";

/// Canonical single-line form of an attribute name as written.
///
/// Identifiers never contain whitespace, so every whitespace character
/// (including line breaks inside a dotted name) is dropped.
pub fn normalize_name(raw: &str) -> Cow<'_, str> {
    if raw.chars().any(char::is_whitespace) {
        Cow::Owned(raw.chars().filter(|c| !c.is_whitespace()).collect())
    } else {
        Cow::Borrowed(raw)
    }
}

/// Split a qualified name on `::` or `.` into segments.
pub fn split_path(path: &str) -> Vec<String> {
    let separator = if path.contains("::") { "::" } else { "." };
    path.split(separator).map(str::to_string).collect()
}

fn reject_whitespace(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AttrProbeError::InvalidArgument(format!("{} is empty", kind)));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(AttrProbeError::InvalidArgument(format!(
            "{} `{}` contains whitespace",
            kind, name
        )));
    }
    Ok(())
}

/// Short attribute name used by the syntactic matcher (e.g. `DataContract`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortName {
    name: String,
    suffixed: String,
}

impl ShortName {
    /// Validate and wrap a short name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the name is blank or contains whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        reject_whitespace("short attribute name", &name)?;
        let suffixed = format!("{}{}", name, ATTRIBUTE_SUFFIX);
        Ok(Self { name, suffixed })
    }

    /// The name as given.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The name with the `Attribute` suffix appended.
    pub fn suffixed(&self) -> &str {
        &self.suffixed
    }

    /// Whether a normalized written name spells this attribute.
    pub fn matches(&self, normalized: &str) -> bool {
        normalized == self.name || normalized == self.suffixed
    }
}

impl FromStr for ShortName {
    type Err = AttrProbeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fully qualified attribute type name used by the semantic matcher.
///
/// Accepts `.` or `::` separated input:
/// `System.Runtime.Serialization.DataContractAttribute`, `serde::Serialize`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    segments: Vec<String>,
}

impl QualifiedName {
    /// Validate and split a qualified name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the name is blank, contains whitespace,
    /// has an empty segment or mixes separators.
    pub fn new(name: &str) -> Result<Self> {
        reject_whitespace("qualified attribute name", name)?;
        let segments = split_path(name);
        if segments.iter().any(String::is_empty) {
            return Err(AttrProbeError::InvalidArgument(format!(
                "qualified attribute name `{}` has an empty segment",
                name
            )));
        }
        if segments.iter().any(|s| s.contains(['.', ':'])) {
            return Err(AttrProbeError::InvalidArgument(format!(
                "qualified attribute name `{}` mixes `.` and `::` separators",
                name
            )));
        }
        Ok(Self { segments })
    }

    /// Namespace and type segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment.
    pub fn type_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether `other` names exactly the same segments.
    pub fn matches_segments<S: AsRef<str>>(&self, other: &[S]) -> bool {
        self.segments.len() == other.len()
            && self
                .segments
                .iter()
                .zip(other)
                .all(|(a, b)| a == b.as_ref())
    }
}

impl FromStr for QualifiedName {
    type Err = AttrProbeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
