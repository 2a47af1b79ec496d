//! Component resolution
//!
//! Finds the file defining a component by searching `palette` directories:
//! - a composite root (`<X>.lcod/Comp.svelte`) first searches its own
//!   `<X>.lcod/palette`
//! - inside a palette, `<Name>.lcod` is preferred over `<Name>.svelte`
//! - otherwise the search climbs two directory levels at a time and looks
//!   for a sibling `palette`, until the palette directly under the search
//!   root has been tried

use std::path::{Component, Path, PathBuf};
use crate::error::{CompileError, Result};

/// Directory name marking a component registry.
pub const PALETTE_DIR: &str = "palette";

/// Definition file extensions, in lookup order.
pub const DEFINITION_EXTENSIONS: [&str; 2] = ["lcod", "svelte"];

/// File name of a composite component's entry point inside `<X>.lcod/`.
pub const COMPOSITE_ROOT_MARKER: &str = "Comp.svelte";

/// Resolves component names relative to one referencing document.
#[derive(Debug, Clone)]
pub struct ComponentResolver {
    document: PathBuf,
}

impl ComponentResolver {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
        }
    }

    /// The document that references the components being resolved.
    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Candidate definition files for `component`, in probe order.
    pub fn search_plan(&self, component: &str) -> SearchPlan {
        SearchPlan::new(component, &self.document)
    }

    /// Resolve `component` to the first readable candidate of its search plan.
    pub async fn resolve(&self, component: &str) -> Result<PathBuf> {
        for candidate in self.search_plan(component) {
            if is_readable(&candidate).await {
                tracing::debug!("resolved {} -> {}", component, candidate.display());
                return Ok(candidate);
            }
            tracing::trace!("no {} at {}", component, candidate.display());
        }

        Err(CompileError::component_not_found(component, &self.document))
    }
}

/// A definition is either a file or a composite `<Name>.lcod/` directory.
async fn is_readable(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::read_dir(path).await.is_ok(),
        Ok(_) => tokio::fs::File::open(path).await.is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
enum SearchState {
    /// At a composite root marker file; its own palette comes next.
    AtMarkerRoot(PathBuf),
    /// Inside a palette, about to try `DEFINITION_EXTENSIONS[next]`.
    AtPalette { dir: PathBuf, next: usize },
    /// Climbing two levels from this path to the next palette.
    Ascending(PathBuf),
    Failed,
}

/// Iterator over the candidate files for one component.
///
/// Purely path-based: it never touches the file system, and it always
/// terminates because each ascent strictly shortens the path and never
/// climbs past the search root.
#[derive(Debug, Clone)]
pub struct SearchPlan {
    component: String,
    /// Leading root or `..` segments of the document path.
    root: PathBuf,
    state: SearchState,
}

impl SearchPlan {
    fn new(component: &str, document: &Path) -> Self {
        let document = normalize(document);
        let root = search_root(&document);

        let state = if is_composite_root(&document) {
            SearchState::AtMarkerRoot(document)
        } else if document.file_name().is_some_and(|name| name == PALETTE_DIR) {
            SearchState::AtPalette { dir: document, next: 0 }
        } else {
            SearchState::Ascending(document)
        };

        Self {
            component: component.to_string(),
            root,
            state,
        }
    }
}

impl Iterator for SearchPlan {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match std::mem::replace(&mut self.state, SearchState::Failed) {
                SearchState::AtMarkerRoot(marker) => {
                    let composite = marker.parent().map(Path::to_path_buf).unwrap_or_default();
                    self.state = SearchState::AtPalette {
                        dir: composite.join(PALETTE_DIR),
                        next: 0,
                    };
                }
                SearchState::AtPalette { dir, next } => {
                    if let Some(ext) = DEFINITION_EXTENSIONS.get(next) {
                        let candidate = dir.join(format!("{}.{}", self.component, ext));
                        self.state = SearchState::AtPalette { dir, next: next + 1 };
                        return Some(candidate);
                    }
                    if dir.parent().is_some_and(|parent| parent != self.root) {
                        self.state = SearchState::Ascending(dir);
                    }
                }
                SearchState::Ascending(from) => {
                    self.state = SearchState::AtPalette {
                        dir: ascend_two(&from, &self.root).join(PALETTE_DIR),
                        next: 0,
                    };
                }
                SearchState::Failed => return None,
            }
        }
    }
}

pub(crate) fn is_composite_root(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == COMPOSITE_ROOT_MARKER)
        && path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| dir.to_string_lossy().ends_with(".lcod"))
}

/// The part of a normalized path the search never climbs above: the
/// filesystem root for absolute paths, otherwise the leading `..` segments
/// (empty for paths below the working directory).
fn search_root(path: &Path) -> PathBuf {
    path.components()
        .take_while(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        .collect()
}

fn ascend_two(path: &Path, root: &Path) -> PathBuf {
    let mut up = path.to_path_buf();
    for _ in 0..2 {
        if up == root || !up.pop() {
            break;
        }
    }
    up
}

/// Lexically resolve `.` and `..` without touching the file system.
/// Leading `..` segments of relative paths are kept.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Render a resolved path for an import declaration.
pub fn import_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/") // Normalize path separators
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(component: &str, document: &str) -> Vec<String> {
        ComponentResolver::new(document)
            .search_plan(component)
            .map(|p| import_path(&p))
            .collect()
    }

    #[test]
    fn test_composite_root_searches_own_palette_first() {
        let candidates = plan("Button", "src/palette/Card.lcod/Comp.svelte");
        assert_eq!(
            candidates,
            [
                "src/palette/Card.lcod/palette/Button.lcod",
                "src/palette/Card.lcod/palette/Button.svelte",
                "src/palette/palette/Button.lcod",
                "src/palette/palette/Button.svelte",
                "src/palette/Button.lcod",
                "src/palette/Button.svelte",
                "palette/Button.lcod",
                "palette/Button.svelte",
            ]
        );
    }

    #[test]
    fn test_plain_document_looks_for_sibling_palette() {
        let candidates = plan("Nav", "src/routes/index.lcod");
        assert_eq!(
            candidates,
            [
                "src/palette/Nav.lcod",
                "src/palette/Nav.svelte",
                "palette/Nav.lcod",
                "palette/Nav.svelte",
            ]
        );
    }

    #[test]
    fn test_absolute_paths_stop_at_filesystem_root() {
        let candidates = plan("Nav", "/home/app/src/routes/index.lcod");
        assert_eq!(
            candidates,
            [
                "/home/app/src/palette/Nav.lcod",
                "/home/app/src/palette/Nav.svelte",
                "/home/app/palette/Nav.lcod",
                "/home/app/palette/Nav.svelte",
                "/home/palette/Nav.lcod",
                "/home/palette/Nav.svelte",
                "/palette/Nav.lcod",
                "/palette/Nav.svelte",
            ]
        );
    }

    #[test]
    fn test_palette_directory_as_reference() {
        let candidates = plan("A", "lib/palette");
        assert_eq!(
            candidates,
            ["lib/palette/A.lcod", "lib/palette/A.svelte", "palette/A.lcod", "palette/A.svelte"]
        );
    }

    #[test]
    fn test_shallow_documents_terminate() {
        assert_eq!(plan("A", "index.lcod"), ["palette/A.lcod", "palette/A.svelte"]);
        assert_eq!(plan("A", "/index.lcod"), ["/palette/A.lcod", "/palette/A.svelte"]);
        assert_eq!(plan("A", ""), ["palette/A.lcod", "palette/A.svelte"]);
    }

    #[test]
    fn test_dot_segments_are_normalized() {
        assert_eq!(
            plan("A", "./src/routes/../pages/x.lcod"),
            ["src/palette/A.lcod", "src/palette/A.svelte", "palette/A.lcod", "palette/A.svelte"]
        );
    }

    #[test]
    fn test_leading_parent_segments_bound_the_search() {
        assert_eq!(
            plan("A", "../app/src/routes/page.lcod"),
            [
                "../app/src/palette/A.lcod",
                "../app/src/palette/A.svelte",
                "../app/palette/A.lcod",
                "../app/palette/A.svelte",
                "../palette/A.lcod",
                "../palette/A.svelte",
            ]
        );
        assert_eq!(plan("A", "../../page.lcod"), ["../../palette/A.lcod", "../../palette/A.svelte"]);
        assert_eq!(
            plan("A", "../X.lcod/Comp.svelte"),
            ["../X.lcod/palette/A.lcod", "../X.lcod/palette/A.svelte", "../palette/A.lcod", "../palette/A.svelte"]
        );
    }

    #[test]
    fn test_composite_marker_requires_lcod_directory() {
        let candidates = plan("A", "src/widgets/Comp.svelte");
        assert_eq!(candidates[0], "src/palette/A.lcod");
    }

    #[tokio::test]
    async fn test_resolve_prefers_lcod_over_svelte() {
        let dir = tempfile::tempdir().expect("tempdir");
        let palette = dir.path().join("src/palette");
        std::fs::create_dir_all(&palette).expect("mkdir");
        std::fs::write(palette.join("Greeting.lcod"), "content: []\n").expect("write");
        std::fs::write(palette.join("Greeting.svelte"), "<p>hi</p>\n").expect("write");
        std::fs::write(palette.join("Plain.svelte"), "<p>plain</p>\n").expect("write");

        let resolver = ComponentResolver::new(dir.path().join("src/routes/page.lcod"));
        assert_eq!(resolver.resolve("Greeting").await.expect("resolve"), palette.join("Greeting.lcod"));
        assert_eq!(resolver.resolve("Plain").await.expect("resolve"), palette.join("Plain.svelte"));
    }

    #[tokio::test]
    async fn test_resolve_composite_directory_before_svelte_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let palette = dir.path().join("src/palette");
        std::fs::create_dir_all(palette.join("Card.lcod")).expect("mkdir");
        std::fs::write(palette.join("Card.lcod/Comp.svelte"), "<div />\n").expect("write");
        std::fs::write(palette.join("Card.svelte"), "<div />\n").expect("write");

        let resolver = ComponentResolver::new(dir.path().join("src/routes/index.lcod"));
        assert_eq!(resolver.resolve("Card").await.expect("resolve"), palette.join("Card.lcod"));
    }

    #[tokio::test]
    async fn test_resolve_missing_component() {
        let dir = tempfile::tempdir().expect("tempdir");
        let document = dir.path().join("src/routes/page.lcod");
        let err = ComponentResolver::new(&document)
            .resolve("Nope")
            .await
            .unwrap_err();
        match err {
            CompileError::ComponentNotFound { component, from } => {
                assert_eq!(component, "Nope");
                assert_eq!(from, document);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
