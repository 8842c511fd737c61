//! Analysis configuration

/// Default file name used in locations when the caller gives none.
pub const DEFAULT_FILE_NAME: &str = "<input>";

/// Configuration shared by parsing and compilation.
///
/// Passed to every provider call; controls how locations are labelled,
/// how deep declarations may nest and how strictly warnings are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisContext {
    /// File name reported in source locations
    pub file_name: String,

    /// Name given to the compilation being built
    pub assembly_name: String,

    /// Maximum nesting of namespaces and types (stack overflow protection)
    pub max_nesting_depth: usize,

    /// Whether warnings count as errors when checking a compilation
    pub warnings_as_errors: bool,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            assembly_name: "attrprobe".to_string(),
            max_nesting_depth: 64,
            warnings_as_errors: false,
        }
    }
}

impl AnalysisContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file name reported in locations.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Set the compilation name.
    pub fn with_assembly_name(mut self, assembly_name: impl Into<String>) -> Self {
        self.assembly_name = assembly_name.into();
        self
    }

    /// Set a custom nesting depth limit.
    pub fn with_max_nesting_depth(mut self, max_depth: usize) -> Self {
        self.max_nesting_depth = max_depth;
        self
    }

    /// Treat warnings as errors.
    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }
}
