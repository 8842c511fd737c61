//! End-to-end attribute presence scenarios over the C# provider

use std::sync::Arc;

use attrprobe::frontends::CSharpFrontend;
use attrprobe::*;
use pretty_assertions::assert_eq;

const DATA_CONTRACT: &str = "System.Runtime.Serialization.DataContractAttribute";

fn references() -> Vec<Library> {
    vec![Library::system_core(), Library::system_serialization()]
}

fn compile(source: &str, references: &[Library]) -> anyhow::Result<Compilation> {
    let frontend = CSharpFrontend::new();
    let ctx = AnalysisContext::new().with_file_name("Scenario.cs");
    let tree = Arc::new(frontend.parse(source, &ctx)?);
    Ok(frontend.compile(tree, references, &ctx))
}

fn syntactic(compilation: &Compilation, decl: &str, target: &str) -> anyhow::Result<bool> {
    let decl = compilation
        .syntax_tree()
        .find_type_path(decl)
        .ok_or_else(|| anyhow::anyhow!("no declaration `{}`", decl))?;
    Ok(SyntacticAttributeMatcher::new().matches_str(decl, target)?)
}

fn semantic(compilation: &Compilation, decl: &str, target: &str) -> anyhow::Result<bool> {
    let decl = compilation
        .syntax_tree()
        .find_type_path(decl)
        .ok_or_else(|| anyhow::anyhow!("no declaration `{}`", decl))?;
    let symbol = compilation
        .semantic_model()
        .resolve_declared_symbol(decl)
        .ok_or_else(|| anyhow::anyhow!("no symbol for `{}`", decl.name))?;
    Ok(SemanticAttributeMatcher::new().matches_str(symbol, target)?)
}

// ═══════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scenario_framework_attribute() -> anyhow::Result<()> {
    let compilation = compile(
        "using System.Runtime.Serialization;\n[DataContract] class C {}",
        &references(),
    )?;
    compilation.ensure_success()?;
    assert!(syntactic(&compilation, "C", "DataContract")?);
    assert!(semantic(&compilation, "C", DATA_CONTRACT)?);
    Ok(())
}

#[test]
fn test_scenario_user_defined_lookalike() -> anyhow::Result<()> {
    let source = "using System;\nclass DataContract : Attribute {}\n[DataContract] class C {}";
    let compilation = compile(source, &references())?;
    compilation.ensure_success()?;

    assert!(syntactic(&compilation, "C", "DataContract")?);
    assert!(!semantic(&compilation, "C", DATA_CONTRACT)?);
    // The usage binds to the user's class instead
    assert!(semantic(&compilation, "C", "DataContract")?);
    Ok(())
}

#[test]
fn test_scenario_user_defined_lookalike_without_using() -> anyhow::Result<()> {
    let source = "class DataContract : Attribute {}\n[DataContract] class C {}";
    let compilation = compile(source, &references())?;
    let codes: Vec<_> = compilation.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![DiagnosticCode::UnresolvedBaseType]);
    assert!(compilation.ensure_success().is_err());

    assert!(syntactic(&compilation, "C", "DataContract")?);
    assert!(!semantic(&compilation, "C", DATA_CONTRACT)?);
    // An unknown base chain does not stop the usage from binding
    assert!(semantic(&compilation, "C", "DataContract")?);
    Ok(())
}

#[test]
fn test_scenario_no_attributes() -> anyhow::Result<()> {
    let compilation = compile("class C {}", &references())?;
    compilation.ensure_success()?;
    for target in ["DataContract", "Serializable", "Obsolete"] {
        assert!(!syntactic(&compilation, "C", target)?);
    }
    for target in [DATA_CONTRACT, "System.SerializableAttribute"] {
        assert!(!semantic(&compilation, "C", target)?);
    }
    Ok(())
}

#[test]
fn test_scenario_suffixed_spelling() -> anyhow::Result<()> {
    let compilation = compile(
        "using System.Runtime.Serialization;\n[DataContractAttribute] class C {}",
        &references(),
    )?;
    compilation.ensure_success()?;
    assert!(syntactic(&compilation, "C", "DataContract")?);
    assert!(syntactic(&compilation, "C", "DataContractAttribute")?);
    assert!(semantic(&compilation, "C", DATA_CONTRACT)?);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Boundaries
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_reference_boundary() -> anyhow::Result<()> {
    let compilation = compile(
        "using System.Runtime.Serialization;\n[DataContract] class C {}",
        &[Library::system_core()],
    )?;

    assert!(syntactic(&compilation, "C", "DataContract")?);
    assert!(!semantic(&compilation, "C", DATA_CONTRACT)?);

    let unresolved: Vec<_> = compilation
        .errors()
        .filter(|d| d.code == DiagnosticCode::UnresolvedAttribute)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].message.contains("`DataContract`"));
    assert_eq!(
        unresolved[0].location,
        Some(SourceLocation::new("Scenario.cs", 2, 2))
    );
    assert!(matches!(
        compilation.checked_semantic_model(),
        Err(AttrProbeError::CompilationFailed { .. })
    ));
    Ok(())
}

#[test]
fn test_qualified_usage_without_import() -> anyhow::Result<()> {
    let compilation = compile(
        "[System.Runtime.Serialization.DataContract]\nclass C {}",
        &references(),
    )?;
    compilation.ensure_success()?;
    // Qualified spellings are not short names
    assert!(!syntactic(&compilation, "C", "DataContract")?);
    assert!(semantic(&compilation, "C", DATA_CONTRACT)?);
    Ok(())
}

#[test]
fn test_multiline_qualified_usage() -> anyhow::Result<()> {
    let source = "[System.Runtime\n    .Serialization\n    .DataContract]\nclass C {}";
    let compilation = compile(source, &references())?;
    compilation.ensure_success()?;
    assert!(syntactic(
        &compilation,
        "C",
        "System.Runtime.Serialization.DataContract"
    )?);
    assert!(semantic(&compilation, "C", DATA_CONTRACT)?);
    Ok(())
}

#[test]
fn test_nested_declarations_are_independent() -> anyhow::Result<()> {
    let source = r#"
        using System.Runtime.Serialization;
        namespace Shop
        {
            public class Outer
            {
                [DataContract]
                public class Inner {}
            }
        }
    "#;
    let compilation = compile(source, &references())?;
    compilation.ensure_success()?;
    assert!(!syntactic(&compilation, "Shop.Outer", "DataContract")?);
    assert!(!semantic(&compilation, "Shop.Outer", DATA_CONTRACT)?);
    assert!(syntactic(&compilation, "Shop.Outer.Inner", "DataContract")?);
    assert!(semantic(&compilation, "Shop.Outer.Inner", DATA_CONTRACT)?);

    let inner = compilation
        .syntax_tree()
        .find_type_path("Shop.Outer.Inner")
        .and_then(|decl| compilation.semantic_model().resolve_declared_symbol(decl))
        .map(TypeSymbol::fully_qualified_name);
    assert_eq!(inner.as_deref(), Some("Shop.Outer.Inner"));
    Ok(())
}

#[test]
fn test_semantic_target_requires_suffix() -> anyhow::Result<()> {
    let compilation = compile(
        "using System.Runtime.Serialization;\n[DataContract] class C {}",
        &references(),
    )?;
    assert!(!semantic(
        &compilation,
        "C",
        "System.Runtime.Serialization.DataContract"
    )?);
    Ok(())
}

#[test]
fn test_matching_is_idempotent() -> anyhow::Result<()> {
    let compilation = compile(
        "using System.Runtime.Serialization;\n[DataContract, Serializable] class C {}",
        &references(),
    )?;
    let first = (
        syntactic(&compilation, "C", "DataContract")?,
        semantic(&compilation, "C", DATA_CONTRACT)?,
    );
    for _ in 0..3 {
        let again = (
            syntactic(&compilation, "C", "DataContract")?,
            semantic(&compilation, "C", DATA_CONTRACT)?,
        );
        assert_eq!(first, again);
    }
    Ok(())
}

#[test]
fn test_compilation_shared_across_threads() -> anyhow::Result<()> {
    let compilation = Arc::new(compile(
        "using System.Runtime.Serialization;\n[DataContract] class C {}",
        &references(),
    )?);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let compilation = Arc::clone(&compilation);
            std::thread::spawn(move || semantic(&compilation, "C", DATA_CONTRACT).ok())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().ok().flatten(), Some(true));
    }
    Ok(())
}
