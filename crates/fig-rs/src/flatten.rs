//! Field-tree flattening.
//!
//! A record is walked once, depth-first in declaration order, into an arena
//! of [`Field`]s. Each field keeps a back-reference to its parent and the step
//! that reaches it (member index, element index or map key), so the binding
//! engine can re-resolve a mutable handle to any field from the root without
//! holding more than one live borrow at a time.

use crate::node::{self, Kind, Node};
use crate::tag::Tag;

/// How a field is reached from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Root,
    Member(usize),
    Index(usize),
    Key(String),
}

/// One node of the flattened tree.
#[derive(Debug, Clone)]
pub struct Field {
    /// Full path from the root, e.g. `spec.containers[0].name`.
    pub path: String,
    /// Parsed annotation; element and entry nodes carry an empty one.
    pub tag: Tag,
    /// Declared kind, before optionals are dereferenced.
    pub kind: Kind,
    pub type_name: &'static str,
    parent: Option<usize>,
    step: Step,
    /// Path handed down to children; equals the parent's for squashed records.
    prefix: String,
    bindable: bool,
}

impl Field {
    /// Whether the binding engine processes this node.
    ///
    /// Sequence elements are only containers: their members are bound, the
    /// elements themselves are not.
    pub fn is_bindable(&self) -> bool {
        self.bindable
    }
}

/// Arena of every field reachable from a root record.
#[derive(Debug, Clone)]
pub struct FieldTree {
    nodes: Vec<Field>,
}

impl FieldTree {
    /// Flatten `root`, reading alternate names from the `tag_key` annotation.
    ///
    /// Existing sequence elements and map entries are walked; nothing is
    /// instantiated. Absent optionals are leaves.
    pub fn flatten(root: &dyn Node, tag_key: &str) -> FieldTree {
        let mut tree = FieldTree {
            nodes: vec![Field {
                path: String::new(),
                tag: Tag::default(),
                kind: root.kind(),
                type_name: root.type_name(),
                parent: None,
                step: Step::Root,
                prefix: String::new(),
                bindable: false,
            }],
        };
        tree.walk(root, 0, tag_key);
        tree
    }

    /// Bindable fields in traversal order, with their arena index.
    pub fn fields(&self) -> impl Iterator<Item = (usize, &Field)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, field)| field.bindable)
    }

    /// Paths of the bindable fields in traversal order.
    pub fn paths(&self) -> Vec<&str> {
        self.fields().map(|(_, field)| field.path.as_str()).collect()
    }

    /// Number of bindable fields.
    pub fn len(&self) -> usize {
        self.fields().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node at arena index `index`.
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.nodes.get(index)
    }

    /// Resolve a mutable handle to the field at `index`, starting at `root`.
    ///
    /// Present optionals along the way and on the field itself are
    /// dereferenced. `None` when the tree no longer matches the value, e.g.
    /// after a container was replaced with fewer elements.
    pub(crate) fn resolve_mut<'a>(
        &self,
        root: &'a mut dyn Node,
        index: usize,
    ) -> Option<&'a mut dyn Node> {
        let mut steps = Vec::new();
        let mut cursor = Some(index);
        while let Some(at) = cursor {
            let field = self.nodes.get(at)?;
            steps.push(&field.step);
            cursor = field.parent;
        }

        let mut current = root;
        for step in steps.into_iter().rev() {
            current = match step {
                Step::Root => current,
                Step::Member(member) => node::deref_mut(current)?
                    .as_record_mut()?
                    .field_mut(*member)?,
                Step::Index(element) => node::deref_mut(current)?
                    .as_sequence_mut()?
                    .element_mut(*element)?,
                Step::Key(key) => node::deref_mut(current)?.as_mapping_mut()?.entry_mut(key)?,
            };
        }
        node::deref_mut(current)
    }

    fn push(
        &mut self,
        parent: usize,
        step: Step,
        segment: &str,
        tag: Tag,
        value: &dyn Node,
        bindable: bool,
    ) -> usize {
        let mut path = self.nodes[parent].prefix.clone();
        push_segment(&mut path, segment);
        let prefix = if tag.squash {
            self.nodes[parent].prefix.clone()
        } else {
            path.clone()
        };
        self.nodes.push(Field {
            path,
            tag,
            kind: value.kind(),
            type_name: value.type_name(),
            parent: Some(parent),
            step,
            prefix,
            bindable,
        });
        self.nodes.len() - 1
    }

    fn walk(&mut self, value: &dyn Node, parent: usize, tag_key: &str) {
        let value = node::deref(value);

        if let Some(record) = value.as_record() {
            for (idx, def) in record.fields().iter().enumerate() {
                if !def.is_visible() {
                    continue;
                }
                let Some(child) = record.field(idx) else {
                    continue;
                };
                let tag = Tag::parse(def.tag, tag_key);
                let name = if tag.name.is_empty() {
                    def.name.to_string()
                } else {
                    tag.name.clone()
                };
                let at = self.push(parent, Step::Member(idx), &name, tag, child, true);
                self.walk(child, at, tag_key);
            }
        } else if let Some(sequence) = value.as_sequence() {
            if !sequence.element_kind().is_traversable() {
                return;
            }
            for idx in 0..sequence.len() {
                let Some(element) = sequence.element(idx) else {
                    continue;
                };
                let segment = format!("[{idx}]");
                let at = self.push(
                    parent,
                    Step::Index(idx),
                    &segment,
                    Tag::default(),
                    element,
                    false,
                );
                self.walk(element, at, tag_key);
            }
        } else if let Some(mapping) = value.as_mapping() {
            for key in mapping.keys() {
                let Some(entry) = mapping.entry(&key) else {
                    continue;
                };
                let segment = format!("[{key}]");
                let at = self.push(parent, Step::Key(key), &segment, Tag::default(), entry, true);
                self.walk(entry, at, tag_key);
            }
        }
    }
}

/// Append one path segment: names are dot-joined, `[..]` indexers attach
/// directly, empty segments are skipped.
pub(crate) fn push_segment(path: &mut String, segment: &str) {
    if segment.is_empty() {
        return;
    }
    if !path.is_empty() && !segment.starts_with('[') {
        path.push('.');
    }
    path.push_str(segment);
}
