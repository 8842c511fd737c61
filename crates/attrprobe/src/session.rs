//! Provider registry and scoped sessions
//!
//! A [`ProviderRegistry`] owns the available compilation providers. Work is
//! done through a [`Session`], a lease on one provider that is released when
//! the session is dropped, on every exit path. A provider cannot be
//! unregistered while leases on it are alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::compilation::Compilation;
use crate::context::AnalysisContext;
use crate::error::{AttrProbeError, Result};
use crate::frontend::CompilationProvider;
use crate::frontends::{CSharpFrontend, RustFrontend};
use crate::library::Library;
use crate::matcher::{SemanticAttributeMatcher, SyntacticAttributeMatcher};
use crate::names::{QualifiedName, ShortName};
use crate::syntax::{SyntaxTree, TypeDecl};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Registry of compilation providers, keyed by provider name.
///
/// # Example
///
/// ```
/// use attrprobe::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_default_providers();
/// {
///     let session = registry.acquire("C#").unwrap();
///     assert_eq!(registry.active_sessions("C#"), 1);
///     assert_eq!(session.provider().file_extension(), "cs");
/// }
/// assert_eq!(registry.active_sessions("C#"), 0);
/// ```
pub struct ProviderRegistry {
    providers: DashMap<String, Arc<dyn CompilationProvider>>,
    leases: Arc<DashMap<String, usize>>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
            leases: Arc::new(DashMap::new()),
        }
    }

    /// A registry holding the C# and Rust frontends.
    pub fn with_default_providers() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(CSharpFrontend::new()));
        registry.register(Arc::new(RustFrontend::new()));
        registry
    }

    /// Register a provider under its name, replacing any previous one.
    pub fn register(&self, provider: Arc<dyn CompilationProvider>) {
        let name = provider.name().to_string();
        debug!(provider = %name, "registered compilation provider");
        self.providers.insert(name, provider);
    }

    /// Remove a provider.
    ///
    /// # Errors
    ///
    /// Returns `ProviderInUse` while sessions on the provider are alive and
    /// `UnknownProvider` if nothing is registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<Arc<dyn CompilationProvider>> {
        match self.leases.entry(name.to_string()) {
            Entry::Occupied(entry) if *entry.get() > 0 => Err(AttrProbeError::ProviderInUse {
                name: name.to_string(),
                leases: *entry.get(),
            }),
            entry => {
                let removed = self.providers.remove(name);
                if let Entry::Occupied(entry) = entry {
                    entry.remove();
                }
                removed
                    .map(|(_, provider)| provider)
                    .ok_or_else(|| AttrProbeError::UnknownProvider(name.to_string()))
            }
        }
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of live sessions on a provider.
    pub fn active_sessions(&self, name: &str) -> usize {
        self.leases.get(name).map_or(0, |count| *count)
    }

    /// Lease the provider registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProvider` if nothing is registered under `name`.
    pub fn acquire(&self, name: &str) -> Result<Session> {
        // Take the lease before looking the provider up so a concurrent
        // `unregister` either sees it or has already removed the provider.
        *self.leases.entry(name.to_string()).or_insert(0) += 1;

        let provider = self.providers.get(name).map(|entry| Arc::clone(entry.value()));
        let Some(provider) = provider else {
            if let Some(mut count) = self.leases.get_mut(name) {
                *count = count.saturating_sub(1);
            }
            return Err(AttrProbeError::UnknownProvider(name.to_string()));
        };

        let session = Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            provider,
            leases: Arc::clone(&self.leases),
            context: AnalysisContext::default(),
        };
        debug!(session = session.id, provider = %name, "session acquired");
        Ok(session)
    }

    /// Lease the provider handling files with this extension (`cs`, `.rs`).
    ///
    /// # Errors
    ///
    /// Returns `UnknownProvider` if no provider claims the extension.
    pub fn acquire_for_extension(&self, extension: &str) -> Result<Session> {
        let extension = extension.trim_start_matches('.');
        let name = self
            .providers
            .iter()
            .find(|entry| entry.value().file_extension() == extension)
            .map(|entry| entry.key().clone());
        match name {
            Some(name) => self.acquire(&name),
            None => Err(AttrProbeError::UnknownProvider(format!(".{}", extension))),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

/// A lease on one compilation provider.
///
/// Dropping the session releases the lease.
pub struct Session {
    id: u64,
    name: String,
    provider: Arc<dyn CompilationProvider>,
    leases: Arc<DashMap<String, usize>>,
    context: AnalysisContext,
}

impl Session {
    /// Use `context` for every subsequent parse and compile.
    pub fn with_context(mut self, context: AnalysisContext) -> Self {
        self.context = context;
        self
    }

    /// Process-unique session number.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The leased provider.
    pub fn provider(&self) -> &dyn CompilationProvider {
        self.provider.as_ref()
    }

    /// Options applied to parses and compilations.
    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Parse source text.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the provider rejects the source.
    pub fn parse(&self, source: &str) -> Result<Arc<SyntaxTree>> {
        Ok(Arc::new(self.provider.parse(source, &self.context)?))
    }

    /// Bind a tree against referenced libraries.
    pub fn compile(&self, tree: Arc<SyntaxTree>, references: &[Library]) -> Compilation {
        self.provider.compile(tree, references, &self.context)
    }

    /// Parse and compile, failing on error diagnostics.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed source and `CompilationFailed` when
    /// binding reports errors.
    pub fn analyze(&self, source: &str, references: &[Library]) -> Result<Compilation> {
        let tree = self.parse(source)?;
        let compilation = self.compile(tree, references);
        compilation.ensure_success()?;
        Ok(compilation)
    }

    /// Syntactic match on the declaration at `path` (`Ns.Outer.Inner`, `a::B`).
    ///
    /// # Errors
    ///
    /// Returns `DeclarationNotFound` when no declaration has that path.
    pub fn syntactic_match(&self, tree: &SyntaxTree, path: &str, target: &ShortName) -> Result<bool> {
        let declaration = find_declaration(tree, path)?;
        Ok(SyntacticAttributeMatcher::new().matches(declaration, target))
    }

    /// Semantic match on the declaration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `CompilationFailed` if the compilation has error diagnostics,
    /// `DeclarationNotFound` for an unknown path and `SymbolNotFound` if the
    /// declaration was not bound.
    pub fn semantic_match(
        &self,
        compilation: &Compilation,
        path: &str,
        target: &QualifiedName,
    ) -> Result<bool> {
        let model = compilation.checked_semantic_model()?;
        let declaration = find_declaration(compilation.syntax_tree(), path)?;
        let symbol = model
            .resolve_declared_symbol(declaration)
            .ok_or_else(|| AttrProbeError::SymbolNotFound(path.to_string()))?;
        Ok(SemanticAttributeMatcher::new().matches(symbol, target))
    }

    /// Every diagnostic of `compilation`, in the provider's style.
    pub fn format_diagnostics(&self, compilation: &Compilation, source: &str) -> Vec<String> {
        compilation
            .diagnostics()
            .iter()
            .map(|diagnostic| self.provider.format_diagnostic(diagnostic, source))
            .collect()
    }
}

fn find_declaration<'t>(tree: &'t SyntaxTree, path: &str) -> Result<&'t TypeDecl> {
    tree.find_type_path(path)
        .ok_or_else(|| AttrProbeError::DeclarationNotFound(path.to_string()))
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut count) = self.leases.get_mut(&self.name) {
            *count = count.saturating_sub(1);
        }
        debug!(session = self.id, provider = %self.name, "session released");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("provider", &self.name)
            .field("context", &self.context)
            .finish()
    }
}
