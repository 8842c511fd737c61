//! Compilation providers for attrprobe
//!
//! This module contains implementations of the `CompilationProvider` trait
//! for the languages attrprobe can analyze.

pub mod csharp;
pub mod rust;

pub use csharp::{CSharpFrontend, CSHARP_RULES};
pub use rust::{RustFrontend, RUST_RULES};
