//! LCOD compiler
//!
//! Compiles LCOD documents (YAML component trees) into Svelte components,
//! resolving every referenced component to its definition in a `palette`
//! directory.

pub mod codegen;
pub mod document;
pub mod driver;
pub mod error;
pub mod instrument;
pub mod mirror;
pub mod resolve;

pub use driver::{compile, Compiler, CompileOptions, CompileOutput};
pub use error::{CompileError, Result};
pub use codegen::{CodeGenerator, ImportTable};
pub use document::{Document, Node};
pub use instrument::{AssignedId, IdGenerator, InstrumentationMode, SequentialIdGenerator, UlidGenerator};
pub use mirror::OutputMirror;
pub use resolve::{ComponentResolver, SearchPlan};
