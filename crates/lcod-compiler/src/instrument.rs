//! Boundary instrumentation for external tooling.
//!
//! When enabled, every emitted node is wrapped in a pair of HTML comments
//! (`start-<id>` / `end-<id>`) so an editor can map regions of the rendered
//! page back to nodes of the source document. Two addressing modes exist:
//!
//! - [`InstrumentationMode::Path`]: `<content hash>/<structural path>`. Stable
//!   across recompiles of unchanged text.
//! - [`InstrumentationMode::Identity`]: the node's own `uuid`, or a fresh id
//!   from the configured [`IdGenerator`] which the host persists back into the
//!   document.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// Which boundary markers (if any) to emit around generated nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InstrumentationMode {
    /// No markers.
    #[default]
    None,
    /// Markers addressed by content hash plus structural path.
    Path,
    /// Markers addressed by per-node identity.
    Identity,
}

/// Source of fresh node identities for [`InstrumentationMode::Identity`].
pub trait IdGenerator: fmt::Debug + Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator: one ULID per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> String {
        Ulid::new().to_string()
    }
}

/// Deterministic generator producing `<prefix>0`, `<prefix>1`, ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

/// An identity handed out during compilation for a node that had none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedId {
    /// Structural path of the node (see [`NodePath`]).
    pub path: String,
    pub id: String,
}

/// Structural address of a node within its document.
///
/// Segments are separated by `/`: a node's index within its sequence, and
/// `:<slot>` for the slot a child sequence belongs to. The `default` slot is
/// addressed like any other, so `0/:default/1` is the second direct child of
/// the first top-level node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: usize) -> Self {
        if self.0.is_empty() {
            NodePath(index.to_string())
        } else {
            NodePath(format!("{}/{}", self.0, index))
        }
    }

    pub fn slot(&self, name: &str) -> Self {
        NodePath(format!("{}/:{}", self.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-bit rolling hash of the document text, printed in base 36.
///
/// `h = h * 31 + unit` over UTF-16 code units with wrapping arithmetic; the
/// result is read as unsigned. Editor tooling computes the same value on its
/// side, so the algorithm must not change.
pub fn content_hash(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit)));
    to_base36(hash as u32)
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Boundary ids end up inside a JS string literal and an HTML comment.
pub fn is_valid_boundary_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn start_marker(id: &str) -> String {
    format!("{{@html '<!-- start-{} -->'}}", id)
}

pub fn end_marker(id: &str) -> String {
    format!("{{@html '<!-- end-{} -->'}}", id)
}
