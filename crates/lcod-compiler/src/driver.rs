//! Compiler driver that orchestrates the compilation pipeline

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use crate::codegen::CodeGenerator;
use crate::document::Document;
use crate::error::{CompileError, Result};
use crate::instrument::{AssignedId, IdGenerator, InstrumentationMode, UlidGenerator};
use crate::mirror::{OutputMirror, DEFAULT_MIRROR_DIR};
use crate::resolve::ComponentResolver;

/// Compilation output structure
#[derive(Debug)]
pub struct CompileOutput {
    /// Path of the compiled document (the reference point for resolution)
    pub source_file: PathBuf,
    /// Generated Svelte component
    pub code: String,
    /// Resolved imports, in the order they appear in `code`
    pub imports: Vec<(String, PathBuf)>,
    /// Identities generated for nodes without a `uuid` (identity mode);
    /// the host is expected to write them back into the document
    pub assigned_ids: Vec<AssignedId>,
    /// Pending mirror write, when `persist_output` is enabled
    pub mirror: Option<JoinHandle<()>>,
}

/// Options for compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Mirror every compiled document under `mirror_dir`
    pub persist_output: bool,
    /// Boundary markers to emit
    pub instrumentation: InstrumentationMode,
    /// Root of the mirror tree (defaults to `.lcod/transpiled`)
    pub mirror_dir: PathBuf,
    /// Mirror paths are made relative to this (defaults to the working directory)
    pub project_root: Option<PathBuf>,
    /// Source of fresh ids in identity mode
    pub id_generator: Arc<dyn IdGenerator>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            persist_output: false,
            instrumentation: InstrumentationMode::None,
            mirror_dir: PathBuf::from(DEFAULT_MIRROR_DIR),
            project_root: None,
            id_generator: Arc::new(UlidGenerator),
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist_output(mut self, persist: bool) -> Self {
        self.persist_output = persist;
        self
    }

    pub fn instrumentation(mut self, mode: InstrumentationMode) -> Self {
        self.instrumentation = mode;
        self
    }

    pub fn mirror_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mirror_dir = dir.into();
        self
    }

    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = generator;
        self
    }
}

/// The LCOD compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with the given options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `source`, resolving components relative to `document_path`.
    ///
    /// Parse and resolution failures abort the whole compile. Mirror failures
    /// never surface here.
    pub async fn compile(&self, source: &str, document_path: impl AsRef<Path>) -> Result<CompileOutput> {
        let document_path = document_path.as_ref();

        let document = Document::parse(source, document_path)?;
        let resolver = ComponentResolver::new(document_path);

        let mut generator = CodeGenerator::new(
            self.options.instrumentation,
            Arc::clone(&self.options.id_generator),
        );
        let code = generator.generate(&document, &resolver).await?;

        tracing::debug!(
            "compiled {}: {} imports, {} bytes",
            document_path.display(),
            generator.imports().len(),
            code.len()
        );

        let mirror = self.options.persist_output.then(|| {
            OutputMirror::new(&self.options.mirror_dir, self.options.project_root.clone())
                .spawn_write(document_path, code.clone())
        });

        let imports = generator
            .imports()
            .iter()
            .map(|(name, path)| (name.to_string(), path.to_path_buf()))
            .collect();

        Ok(CompileOutput {
            source_file: document_path.to_path_buf(),
            code,
            imports,
            assigned_ids: generator.assigned_ids().to_vec(),
            mirror,
        })
    }

    /// Read and compile the document at `path`.
    pub async fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompileOutput> {
        let path = path.as_ref();
        let source = read_source(path).await?;
        self.compile(&source, path).await
    }
}

/// Compile `source` with a one-off compiler.
pub async fn compile(source: &str, document_path: impl AsRef<Path>, options: &CompileOptions) -> Result<CompileOutput> {
    Compiler::new(options.clone()).compile(source, document_path).await
}

async fn read_source(path: &Path) -> Result<String> {
    if !tokio::fs::try_exists(path).await? {
        return Err(CompileError::FileNotFound(path.to_path_buf()));
    }

    tokio::fs::read_to_string(path).await.map_err(CompileError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_options_builder() {
        let opts = CompileOptions::new()
            .persist_output(true)
            .instrumentation(InstrumentationMode::Path)
            .mirror_dir("./mirror")
            .project_root("/proj");

        assert!(opts.persist_output);
        assert_eq!(opts.instrumentation, InstrumentationMode::Path);
        assert_eq!(opts.mirror_dir, PathBuf::from("./mirror"));
        assert_eq!(opts.project_root, Some(PathBuf::from("/proj")));
    }

    #[test]
    fn test_compile_options_defaults() {
        let opts = CompileOptions::default();
        assert!(!opts.persist_output);
        assert_eq!(opts.instrumentation, InstrumentationMode::None);
        assert_eq!(opts.mirror_dir, PathBuf::from(".lcod/transpiled"));
        assert_eq!(opts.project_root, None);
    }

    #[tokio::test]
    async fn test_compile_file_missing() {
        let err = Compiler::default()
            .compile_file("/definitely/not/here.lcod")
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_parse_error_propagates() {
        let err = Compiler::default()
            .compile("content: [", "page.lcod")
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
