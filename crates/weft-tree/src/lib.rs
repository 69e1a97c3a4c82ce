//! Ordered output tree for the weft templating engine.
//!
//! The tree is the mutable structure templates render into: elements with
//! attributes, properties, style maps and event listeners, text nodes, and
//! boundary markers that delimit ranges owned by individual bindings. Nodes
//! live in an arena and are addressed by stable ids; the engine only ever
//! talks to the narrow range surface (`insert_before`, `remove_between`,
//! `move_range_before`, child iteration), so the same contract could be
//! backed by any ordered-tree representation.
//!
//! Every mutating call bumps a counter, which is how tests assert that a
//! render applied exactly the mutations it was supposed to and no more.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::rc::Rc;
use std::sync::Arc;

/// Unique identifier for a node in the tree.
///
/// Ids stay valid until the node is removed; removed slots are never
/// reused, so a stale id can only resolve to nothing, not to an unrelated
/// node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An event delivered to listeners on an element.
#[derive(Debug, Clone)]
pub struct Event {
    name: Arc<str>,
    detail: Option<Arc<str>>,
}

impl Event {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            detail: None,
        }
    }

    pub fn with_detail(name: impl Into<Arc<str>>, detail: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

/// An event handler attached to an element.
///
/// Handlers are compared by identity: two listeners are the same only if
/// they are clones of one `Listener`.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn same(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Listener")
    }
}

/// A value assigned directly onto an element's property map, bypassing
/// attribute serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(Arc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Element payload: tag plus the four binding surfaces.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: Arc<str>,
    pub attributes: IndexMap<Arc<str>, String>,
    pub properties: IndexMap<Arc<str>, PropertyValue>,
    pub styles: IndexMap<Arc<str>, String>,
    pub listeners: Vec<(Arc<str>, Listener)>,
}

/// The kinds of nodes the tree holds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    /// Invisible boundary node delimiting a range owned by one binding.
    Marker,
    /// Transient container for not-yet-inserted subtrees.
    Fragment,
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena-backed ordered tree of output nodes.
pub struct Tree {
    nodes: Vec<Option<NodeData>>,
    mutations: u64,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            mutations: 0,
        }
    }

    /// Number of structural and content mutations applied so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        }));
        id
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())?.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index())?.as_mut()
    }

    // === Construction ===

    pub fn create_element(&mut self, tag: impl Into<Arc<str>>) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag: tag.into(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            styles: IndexMap::new(),
            listeners: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_marker(&mut self) -> NodeId {
        self.alloc(NodeKind::Marker)
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    /// Deep-copy a subtree from another tree into this one. The copied root
    /// is detached; listeners and properties are carried over.
    pub fn import(&mut self, source: &Tree, node: NodeId) -> Option<NodeId> {
        let data = source.node(node)?;
        let copy = self.alloc(data.kind.clone());
        let children = data.children.clone();
        for child in children {
            if let Some(imported) = self.import(source, child) {
                self.append(copy, imported);
            }
        }
        Some(copy)
    }

    // === Inspection ===

    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn is_marker(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Marker))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(&el.tag),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        let children = &self.node(parent)?.children;
        let position = children.iter().position(|&c| c == id)?;
        children.get(position + 1).copied()
    }

    // === Structure ===

    /// Insert a detached node into `parent`'s children, before `reference`
    /// (or at the end when `reference` is `None` or not a child of
    /// `parent`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.node(child).is_none() {
            return;
        }
        debug_assert!(
            self.node(child).is_some_and(|n| n.parent.is_none()),
            "insert_before requires a detached child"
        );
        let position =
            reference.and_then(|r| self.node(parent)?.children.iter().position(|&c| c == r));
        let Some(parent_data) = self.node_mut(parent) else {
            return;
        };
        match position {
            Some(index) => parent_data.children.insert(index, child),
            None => parent_data.children.push(child),
        }
        if let Some(child_data) = self.node_mut(child) {
            child_data.parent = Some(parent);
        }
        self.mutations += 1;
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Remove a node from its parent without destroying it.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_data) = self.node_mut(parent) {
            parent_data.children.retain(|&c| c != id);
        }
        if let Some(data) = self.node_mut(id) {
            data.parent = None;
        }
        self.mutations += 1;
    }

    /// Detach and return all children of `parent`, preserving order.
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = match self.node_mut(parent) {
            Some(data) => std::mem::take(&mut data.children),
            None => return Vec::new(),
        };
        for &child in &children {
            if let Some(data) = self.node_mut(child) {
                data.parent = None;
            }
            self.mutations += 1;
        }
        children
    }

    /// Remove a node and its whole subtree. Slots are tombstoned, never
    /// reused.
    pub fn remove_subtree(&mut self, id: NodeId) {
        if self.node(id).is_none() {
            return;
        }
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            if let Some(parent_data) = self.node_mut(parent) {
                parent_data.children.retain(|&c| c != id);
            }
        }
        self.tombstone(id);
        self.mutations += 1;
    }

    fn tombstone(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(id.index()).and_then(Option::take) {
            Some(data) => data.children,
            None => return,
        };
        for child in children {
            self.tombstone(child);
        }
    }

    /// Remove every node strictly between two sibling markers.
    pub fn remove_between(&mut self, start: NodeId, end: NodeId) {
        while let Some(next) = self.next_sibling(start) {
            if next == end {
                break;
            }
            self.remove_subtree(next);
        }
    }

    /// Relocate the inclusive sibling range `first..=last` in front of
    /// `anchor`, preserving the range's internal order and every node's
    /// subtree.
    pub fn move_range_before(&mut self, first: NodeId, last: NodeId, anchor: NodeId) {
        let Some(parent) = self.node(anchor).and_then(|n| n.parent) else {
            return;
        };
        let mut range: SmallVec<[NodeId; 8]> = SmallVec::new();
        let mut current = Some(first);
        while let Some(id) = current {
            range.push(id);
            if id == last {
                break;
            }
            current = self.next_sibling(id);
        }
        for id in range {
            self.detach(id);
            self.insert_before(parent, id, Some(anchor));
        }
    }

    // === Element content ===

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<Arc<str>>, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.attributes.insert(name.into(), value.into());
            self.mutations += 1;
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            if el.attributes.shift_remove(name).is_some() {
                self.mutations += 1;
            }
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attributes.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, id: NodeId, name: impl Into<Arc<str>>, value: PropertyValue) {
        if let Some(el) = self.element_mut(id) {
            el.properties.insert(name.into(), value);
            self.mutations += 1;
        }
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&PropertyValue> {
        self.element(id)?.properties.get(name)
    }

    pub fn set_style(&mut self, id: NodeId, name: impl Into<Arc<str>>, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.styles.insert(name.into(), value.into());
            self.mutations += 1;
        }
    }

    pub fn style(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.styles.get(name).map(String::as_str)
    }

    pub fn add_listener(&mut self, id: NodeId, name: impl Into<Arc<str>>, listener: Listener) {
        if let Some(el) = self.element_mut(id) {
            el.listeners.push((name.into(), listener));
            self.mutations += 1;
        }
    }

    pub fn remove_listener(&mut self, id: NodeId, name: &str, listener: &Listener) {
        if let Some(el) = self.element_mut(id) {
            let before = el.listeners.len();
            el.listeners
                .retain(|(n, l)| !(n.as_ref() == name && l.same(listener)));
            if el.listeners.len() != before {
                self.mutations += 1;
            }
        }
    }

    pub fn listener_count(&self, id: NodeId, name: &str) -> usize {
        self.element(id)
            .map(|el| el.listeners.iter().filter(|(n, _)| n.as_ref() == name).count())
            .unwrap_or(0)
    }

    /// Invoke every listener registered on `id` for the event's name.
    pub fn dispatch(&self, id: NodeId, event: &Event) {
        let matching: SmallVec<[Listener; 4]> = match self.element(id) {
            Some(el) => el
                .listeners
                .iter()
                .filter(|(n, _)| n.as_ref() == event.name())
                .map(|(_, l)| l.clone())
                .collect(),
            None => return,
        };
        for listener in matching {
            listener.call(event);
        }
    }

    // === Text ===

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(data) = self.node_mut(id) {
            if let NodeKind::Text(current) = &mut data.kind {
                *current = text.into();
                self.mutations += 1;
            }
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of a whole subtree; markers contribute nothing.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    /// Concatenated text of the nodes strictly between two sibling markers.
    pub fn range_text(&self, start: NodeId, end: NodeId) -> String {
        let mut out = String::new();
        let mut current = self.next_sibling(start);
        while let Some(id) = current {
            if id == end {
                break;
            }
            self.collect_text(id, &mut out);
            current = self.next_sibling(id);
        }
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) | Some(NodeKind::Fragment) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// All elements with the given tag in the subtree under `root`, in
    /// document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(root, tag, &mut out);
        out
    }

    fn collect_elements(&self, id: NodeId, tag: &str, out: &mut Vec<NodeId>) {
        if self.tag(id) == Some(tag) {
            out.push(id);
        }
        for &child in self.children(id) {
            self.collect_elements(child, tag, out);
        }
    }

    /// Markup-like dump of a subtree, for readable test failures. Markers
    /// are invisible; properties and listeners are not shown.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                if !el.styles.is_empty() {
                    out.push_str(" style=\"");
                    for (i, (name, value)) in el.styles.iter().enumerate() {
                        if i > 0 {
                            out.push(' ');
                        }
                        out.push_str(name);
                        out.push_str(": ");
                        out.push_str(value);
                        out.push(';');
                    }
                    out.push('"');
                }
                out.push('>');
                for &child in self.children(id) {
                    self.dump_into(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            Some(NodeKind::Fragment) => {
                for &child in self.children(id) {
                    self.dump_into(child, out);
                }
            }
            _ => {}
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
