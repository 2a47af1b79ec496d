//! Code generation module
//!
//! Transforms a parsed LCOD document into a Svelte component: a `<script>`
//! header importing every referenced component once, followed by the
//! markup for the tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use indexmap::{IndexMap, IndexSet};
use crate::document::{Document, Node, DEFAULT_SLOT};
use crate::error::Result;
use crate::instrument::{end_marker, start_marker, AssignedId, IdGenerator, InstrumentationMode, NodePath};
use crate::resolve::{import_path, ComponentResolver};

const INDENT: &str = "  ";

/// Resolved imports of one document, in first-seen (pre-order) order.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: IndexMap<String, PathBuf>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every distinct component of `document`, one at a time.
    ///
    /// Stops at the first component that cannot be resolved.
    pub async fn collect(document: &Document, resolver: &ComponentResolver) -> Result<Self> {
        let mut names = IndexSet::new();
        collect_names(&document.content, &mut names);

        let mut table = Self::new();
        for name in names {
            let path = resolver.resolve(name).await?;
            table.insert(name, path);
        }
        Ok(table)
    }

    /// Record `component` unless it is already known. Returns whether it was new.
    pub fn insert(&mut self, component: impl Into<String>, path: impl Into<PathBuf>) -> bool {
        let component = component.into();
        if self.entries.contains_key(&component) {
            return false;
        }
        self.entries.insert(component, path.into());
        true
    }

    pub fn get(&self, component: &str) -> Option<&Path> {
        self.entries.get(component).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_names<'a>(nodes: &'a [Node], names: &mut IndexSet<&'a str>) {
    for node in nodes {
        names.insert(node.component.as_str());
        if let Some(slots) = &node.slots {
            for children in slots.values() {
                collect_names(children, names);
            }
        }
    }
}

/// Svelte code generator
pub struct CodeGenerator {
    /// Indentation level for pretty-printing
    indent: usize,
    /// Body buffer
    output: String,
    mode: InstrumentationMode,
    ids: Arc<dyn IdGenerator>,
    /// Identities handed out to nodes that had none (identity mode only)
    assigned: Vec<AssignedId>,
    imports: ImportTable,
}

impl CodeGenerator {
    pub fn new(mode: InstrumentationMode, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            indent: 0,
            output: String::new(),
            mode,
            ids,
            assigned: Vec::new(),
            imports: ImportTable::new(),
        }
    }

    /// Identities generated during the last `generate`/`render` call.
    pub fn assigned_ids(&self) -> &[AssignedId] {
        &self.assigned
    }

    /// Imports used by the last `generate`/`render` call.
    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    /// Resolve the document's components and render it.
    ///
    /// Nothing is rendered unless every component resolves.
    pub async fn generate(&mut self, document: &Document, resolver: &ComponentResolver) -> Result<String> {
        let imports = ImportTable::collect(document, resolver).await?;
        Ok(self.render(document, imports))
    }

    /// Render `document` against an already resolved import table.
    pub fn render(&mut self, document: &Document, imports: ImportTable) -> String {
        self.indent = 1;
        self.output.clear();
        self.assigned.clear();

        self.generate_nodes(&document.content, &NodePath::root(), document.content_hash());

        let mut code = String::from("<script>\n");
        for (name, path) in imports.iter() {
            code.push_str(&format!("import {} from \"{}\";\n", name, import_path(path)));
        }
        code.push_str("</script>\n");
        code.push_str(&self.output);
        code.push('\n');

        self.output.clear();
        self.imports = imports;
        code
    }

    fn generate_nodes(&mut self, nodes: &[Node], parent: &NodePath, hash: &str) {
        for (index, node) in nodes.iter().enumerate() {
            self.generate_node(node, &parent.child(index), hash);
        }
    }

    fn generate_node(&mut self, node: &Node, path: &NodePath, hash: &str) {
        let boundary = self.boundary_id(node, path, hash);
        if let Some(id) = &boundary {
            self.line(&start_marker(id));
        }

        let attributes = render_attributes(node);
        match &node.slots {
            None => self.line(&format!("<{}{} />", node.component, attributes)),
            Some(slots) => {
                self.line(&format!("<{}{}>", node.component, attributes));
                self.indent += 1;
                for (name, children) in slots {
                    let slot_path = path.slot(name);
                    if name == DEFAULT_SLOT {
                        self.generate_nodes(children, &slot_path, hash);
                    } else {
                        self.line(&format!("<svelte:fragment slot=\"{}\">", escape_attribute(name)));
                        self.indent += 1;
                        self.generate_nodes(children, &slot_path, hash);
                        self.indent -= 1;
                        self.line("</svelte:fragment>");
                    }
                }
                self.indent -= 1;
                self.line(&format!("</{}>", node.component));
            }
        }

        if let Some(id) = &boundary {
            self.line(&end_marker(id));
        }
    }

    fn boundary_id(&mut self, node: &Node, path: &NodePath, hash: &str) -> Option<String> {
        match self.mode {
            InstrumentationMode::None => None,
            InstrumentationMode::Path => Some(format!("{}/{}", hash, path)),
            InstrumentationMode::Identity => Some(match &node.uuid {
                Some(id) => id.clone(),
                None => {
                    let id = self.ids.next_id();
                    self.assigned.push(AssignedId {
                        path: path.to_string(),
                        id: id.clone(),
                    });
                    id
                }
            }),
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }
}

fn render_attributes(node: &Node) -> String {
    node.properties
        .iter()
        .map(|(key, value)| format!(" {}=\"{}\"", key, escape_attribute(value)))
        .collect()
}

/// Escape a literal for a double-quoted Svelte attribute.
///
/// `{` would otherwise open an expression.
pub fn escape_attribute(value: &str) -> String {
    value.replace('"', "&quot;").replace('{', "&#123;")
}
