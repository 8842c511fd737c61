//! Referenced libraries: type metadata a compilation can bind against

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::names::split_path;
use crate::syntax::DeclKind;

/// One type exported by a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryType {
    /// Namespace, `.` or `::` separated (empty for the global namespace)
    #[serde(default)]
    pub namespace: String,

    /// Simple name
    pub name: String,

    /// Declaration kind
    #[serde(default)]
    pub kind: DeclKind,

    /// Fully qualified base type, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl LibraryType {
    /// Namespace split into segments.
    pub fn namespace_segments(&self) -> Vec<String> {
        if self.namespace.is_empty() {
            Vec::new()
        } else {
            split_path(&self.namespace)
        }
    }

    /// Base type split into segments.
    pub fn base_segments(&self) -> Option<Vec<String>> {
        self.base.as_deref().map(split_path)
    }
}

/// A referenced library.
///
/// # Example
///
/// ```
/// use attrprobe::Library;
///
/// let lib = Library::from_json(r#"{
///     "name": "Acme.Annotations",
///     "types": [
///         { "namespace": "Acme", "name": "AuditedAttribute", "base": "System.Attribute" }
///     ]
/// }"#).unwrap();
/// assert_eq!(lib.types.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Library name, reported as the origin of its types
    pub name: String,

    /// Exported types
    #[serde(default)]
    pub types: Vec<LibraryType>,
}

impl Library {
    /// An empty library.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// Add a class deriving from `base`.
    pub fn with_class(self, namespace: &str, name: &str, base: Option<&str>) -> Self {
        self.with_type(namespace, name, DeclKind::Class, base)
    }

    /// Add a type of any kind.
    pub fn with_type(
        mut self,
        namespace: &str,
        name: &str,
        kind: DeclKind,
        base: Option<&str>,
    ) -> Self {
        self.types.push(LibraryType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            base: base.map(str::to_string),
        });
        self
    }

    /// Load a library from a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns `Manifest` if the JSON does not describe a library.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns `Manifest` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Core runtime types: `System.Object`, `System.Attribute` and common attributes.
    pub fn system_core() -> Self {
        Self::new("System.Runtime")
            .with_class("System", "Object", None)
            .with_class("System", "Attribute", Some("System.Object"))
            .with_class("System", "AttributeUsageAttribute", Some("System.Attribute"))
            .with_class("System", "SerializableAttribute", Some("System.Attribute"))
            .with_class("System", "ObsoleteAttribute", Some("System.Attribute"))
            .with_class("System", "FlagsAttribute", Some("System.Attribute"))
            .with_class("System", "Exception", Some("System.Object"))
            .with_type("System", "IDisposable", DeclKind::Interface, None)
            .with_class(
                "System.Diagnostics",
                "DebuggerDisplayAttribute",
                Some("System.Attribute"),
            )
    }

    /// Data contract serialization attributes.
    pub fn system_serialization() -> Self {
        let ns = "System.Runtime.Serialization";
        Self::new("System.Runtime.Serialization")
            .with_class(ns, "DataContractAttribute", Some("System.Attribute"))
            .with_class(ns, "DataMemberAttribute", Some("System.Attribute"))
            .with_class(ns, "IgnoreDataMemberAttribute", Some("System.Attribute"))
            .with_class(ns, "EnumMemberAttribute", Some("System.Attribute"))
            .with_class(ns, "KnownTypeAttribute", Some("System.Attribute"))
    }
}
