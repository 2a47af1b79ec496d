//! Error types for the LCOD compiler

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file}: {message}")]
    Parse { file: PathBuf, message: String },

    #[error("Component {component} not found (referenced from {from})")]
    ComponentNotFound { component: String, from: PathBuf },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Only ever reported through the log; see `mirror`.
    #[error("Failed to write transpiled mirror {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CompileError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn component_not_found(component: impl Into<String>, from: impl Into<PathBuf>) -> Self {
        CompileError::ComponentNotFound {
            component: component.into(),
            from: from.into(),
        }
    }
}
