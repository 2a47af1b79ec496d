//! Debug mirror of compiled output
//!
//! Writes each compiled document to `<mirror dir>/<path relative to the
//! project>` with a `.svelte` extension, so the generated markup can be
//! inspected. Writes are detached tasks and their failures are only logged.

use std::path::{Component, Path, PathBuf};
use tokio::task::JoinHandle;
use crate::error::{CompileError, Result};
use crate::resolve::{is_composite_root, normalize};

/// Default location of the mirror, relative to the working directory.
pub const DEFAULT_MIRROR_DIR: &str = ".lcod/transpiled";

#[derive(Debug, Clone)]
pub struct OutputMirror {
    base: PathBuf,
    /// `None` means the process working directory, looked up per write.
    project_root: Option<PathBuf>,
}

impl OutputMirror {
    pub fn new(base: impl Into<PathBuf>, project_root: Option<PathBuf>) -> Self {
        Self {
            base: base.into(),
            project_root,
        }
    }

    /// Where the mirror of `document` is written.
    ///
    /// `src/palette/Card.lcod/Comp.svelte` mirrors to `src/palette/Card.svelte`;
    /// any other `.lcod` document keeps its name with a `.svelte` extension.
    pub fn target_for(&self, document: &Path) -> PathBuf {
        let document = normalize(document);
        let root = self
            .project_root
            .clone()
            .or_else(|| std::env::current_dir().ok());

        let relative = match &root {
            Some(root) if document.is_absolute() => document.strip_prefix(root).unwrap_or(document.as_path()),
            _ => document.as_path(),
        };

        // Never escape the mirror directory.
        let mut relative: PathBuf = relative
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        if is_composite_root(&relative) {
            if let Some(composite) = relative.parent() {
                relative = composite.with_extension("svelte");
            }
        } else if relative.extension().is_some_and(|ext| ext == "lcod") {
            relative.set_extension("svelte");
        }

        self.base.join(relative)
    }

    /// Start writing `code` as the mirror of `document` without waiting for it.
    ///
    /// Must be called from within a tokio runtime. The returned handle may be
    /// dropped; the task keeps running.
    pub fn spawn_write(&self, document: &Path, code: String) -> JoinHandle<()> {
        let target = self.target_for(document);
        tokio::spawn(async move {
            match write_mirror(&target, &code).await {
                Ok(()) => tracing::debug!("mirrored {} bytes to {}", code.len(), target.display()),
                Err(e) => tracing::warn!("{}", e),
            }
        })
    }
}

async fn write_mirror(target: &Path, code: &str) -> Result<()> {
    let persist_error = |source| CompileError::Persist {
        path: target.to_path_buf(),
        source,
    };

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(persist_error)?;
    }
    tokio::fs::write(target, code).await.map_err(persist_error)
}
