//! Template model: static structure, dynamic values, and identity.
//!
//! A `Template` pairs an immutable static structure with the ordered list
//! of dynamic values rendered into it. Structures are compared by a
//! content-derived `StructureId`; holding the structure in an `Arc` per
//! call site makes the comparison a pointer-cheap hit while independently
//! built identical structures still unify.

use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;
use weft_tree::NodeId;

/// Opaque key identifying one entry of a keyed arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Text(Arc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(value) => write!(f, "{value}"),
            Key::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.into())
    }
}

/// Callback bound to a `ref` slot; invoked with the bound node's id.
#[derive(Clone)]
pub struct NodeCallback(Rc<dyn Fn(NodeId)>);

impl NodeCallback {
    pub fn new(callback: impl Fn(NodeId) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn call(&self, node: NodeId) {
        (self.0)(node)
    }

    pub fn same(&self, other: &NodeCallback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeCallback")
    }
}

/// Shared style-property mapping bound to a `style` slot.
///
/// Compared by pointer identity; per-key diffing happens in the style
/// updater.
#[derive(Debug, Clone)]
pub struct StyleMap(Arc<indexmap::IndexMap<Arc<str>, Arc<str>>>);

impl StyleMap {
    pub fn new(
        entries: impl IntoIterator<Item = (impl Into<Arc<str>>, impl Into<Arc<str>>)>,
    ) -> Self {
        Self(Arc::new(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        ))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_ref(), v.as_ref()))
    }

    pub fn same(&self, other: &StyleMap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The shape class a content hole resolves to, fixed at first bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleShape {
    Text,
    Template,
    Sequence,
    Arrangement,
}

impl fmt::Display for HoleShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HoleShape::Text => "text",
            HoleShape::Template => "template",
            HoleShape::Sequence => "sequence",
            HoleShape::Arrangement => "arrangement",
        })
    }
}

/// A dynamic value occupying one slot of a template.
#[derive(Debug, Clone)]
pub enum Value {
    Text(Arc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Listener(weft_tree::Listener),
    Callback(NodeCallback),
    Style(StyleMap),
    Template(Template),
    Sequence(Arc<[Template]>),
    Arrangement(Arc<[(Key, Template)]>),
}

impl Value {
    pub fn text(value: impl Into<Arc<str>>) -> Self {
        Value::Text(value.into())
    }

    pub fn listener(handler: impl Fn(&weft_tree::Event) + 'static) -> Self {
        Value::Listener(weft_tree::Listener::new(handler))
    }

    pub fn callback(callback: impl Fn(NodeId) + 'static) -> Self {
        Value::Callback(NodeCallback::new(callback))
    }

    pub fn style(
        entries: impl IntoIterator<Item = (impl Into<Arc<str>>, impl Into<Arc<str>>)>,
    ) -> Self {
        Value::Style(StyleMap::new(entries))
    }

    pub fn sequence(templates: impl IntoIterator<Item = Template>) -> Self {
        Value::Sequence(templates.into_iter().collect())
    }

    pub fn arrangement(entries: impl IntoIterator<Item = (Key, Template)>) -> Self {
        Value::Arrangement(entries.into_iter().collect())
    }

    /// Reference/primitive equality: primitives compare by value, text by
    /// content, shared aggregates and callbacks by pointer identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Listener(a), Value::Listener(b)) => a.same(b),
            (Value::Callback(a), Value::Callback(b)) => a.same(b),
            (Value::Style(a), Value::Style(b)) => a.same(b),
            (Value::Template(a), Value::Template(b)) => a.same(b),
            (Value::Sequence(a), Value::Sequence(b)) => Arc::ptr_eq(a, b),
            (Value::Arrangement(a), Value::Arrangement(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The shape class this value gives a content hole.
    pub fn shape(&self) -> HoleShape {
        match self {
            Value::Arrangement(_) => HoleShape::Arrangement,
            Value::Sequence(_) => HoleShape::Sequence,
            Value::Template(_) => HoleShape::Template,
            _ => HoleShape::Text,
        }
    }

    /// Textual coercion used by attribute and text bindings.
    pub fn to_text(&self) -> Arc<str> {
        match self {
            Value::Text(value) => value.clone(),
            Value::Int(value) => value.to_string().into(),
            Value::Float(value) => value.to_string().into(),
            Value::Bool(value) => (if *value { "true" } else { "false" }).into(),
            Value::Listener(_) => "[listener]".into(),
            Value::Callback(_) => "[callback]".into(),
            Value::Style(_) => "[style]".into(),
            Value::Template(_) => "[template]".into(),
            Value::Sequence(_) => "[sequence]".into(),
            Value::Arrangement(_) => "[arrangement]".into(),
        }
    }

    /// Truthiness coercion used by toggle bindings.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Text(value) => !value.is_empty(),
            _ => true,
        }
    }

    /// Short name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Listener(_) => "listener",
            Value::Callback(_) => "callback",
            Value::Style(_) => "style",
            Value::Template(_) => "template",
            Value::Sequence(_) => "sequence",
            Value::Arrangement(_) => "arrangement",
        }
    }
}

/// A dynamic-attribute position: either literal text or a value slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Static(Arc<str>),
    Slot(usize),
}

/// One node of a template's static structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Markup {
    Element {
        tag: Arc<str>,
        attributes: Vec<(Arc<str>, AttrValue)>,
        children: Vec<Markup>,
    },
    Text(Arc<str>),
    /// Content hole carrying its value-slot index.
    Hole(usize),
}

impl Markup {
    pub fn element(tag: impl Into<Arc<str>>) -> Self {
        Markup::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(value: impl Into<Arc<str>>) -> Self {
        Markup::Text(value.into())
    }

    pub fn hole(index: usize) -> Self {
        Markup::Hole(index)
    }

    /// Static attribute.
    pub fn attr(mut self, name: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        if let Markup::Element { attributes, .. } = &mut self {
            attributes.push((name.into(), AttrValue::Static(value.into())));
        } else {
            debug_assert!(false, "attr on a non-element markup node");
        }
        self
    }

    /// Attribute bound to a value slot; the name carries the binding
    /// syntax (`@name`, `name?`, `.name`, `ref`, `style`, plain).
    pub fn attr_slot(mut self, name: impl Into<Arc<str>>, index: usize) -> Self {
        if let Markup::Element { attributes, .. } = &mut self {
            attributes.push((name.into(), AttrValue::Slot(index)));
        } else {
            debug_assert!(false, "attr_slot on a non-element markup node");
        }
        self
    }

    pub fn child(mut self, node: Markup) -> Self {
        if let Markup::Element { children, .. } = &mut self {
            children.push(node);
        } else {
            debug_assert!(false, "child on a non-element markup node");
        }
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Markup>) -> Self {
        if let Markup::Element { children, .. } = &mut self {
            children.extend(nodes);
        } else {
            debug_assert!(false, "children on a non-element markup node");
        }
        self
    }

    fn max_slot(&self, current: &mut Option<usize>) {
        match self {
            Markup::Element {
                attributes,
                children,
                ..
            } => {
                for (_, value) in attributes {
                    if let AttrValue::Slot(index) = value {
                        *current = Some(current.map_or(*index, |m| m.max(*index)));
                    }
                }
                for child in children {
                    child.max_slot(current);
                }
            }
            Markup::Hole(index) => {
                *current = Some(current.map_or(*index, |m| m.max(*index)));
            }
            Markup::Text(_) => {}
        }
    }
}

/// Identity of a static structure; equal ids guarantee an identical
/// instruction layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructureId(pub u64);

/// Immutable static structure of a template.
#[derive(Debug)]
pub struct Structure {
    roots: Vec<Markup>,
    id: StructureId,
    value_slots: usize,
}

impl Structure {
    /// Build a structure from its root markup nodes. The id is a content
    /// hash of everything static, so two independently built identical
    /// structures share one skeleton.
    pub fn new(roots: impl Into<Vec<Markup>>) -> Arc<Self> {
        let roots = roots.into();
        let mut hasher = FxHasher::default();
        roots.hash(&mut hasher);
        let id = StructureId(hasher.finish());

        let mut max = None;
        for root in &roots {
            root.max_slot(&mut max);
        }
        Arc::new(Self {
            roots,
            id,
            value_slots: max.map_or(0, |m| m + 1),
        })
    }

    pub fn id(&self) -> StructureId {
        self.id
    }

    pub fn roots(&self) -> &[Markup] {
        &self.roots
    }

    /// Number of value slots the structure declares.
    pub fn value_slots(&self) -> usize {
        self.value_slots
    }
}

/// Immutable value carrier: a structure plus one value per slot. A new
/// render always constructs a new template; nested-template identity is
/// pointer identity.
#[derive(Debug, Clone)]
pub struct Template {
    structure: Arc<Structure>,
    values: Arc<[Value]>,
}

impl Template {
    pub fn new(structure: &Arc<Structure>, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            structure: structure.clone(),
            values: values.into_iter().collect(),
        }
    }

    pub fn structure(&self) -> &Arc<Structure> {
        &self.structure
    }

    pub fn structure_id(&self) -> StructureId {
        self.structure.id
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn same(&self, other: &Template) -> bool {
        Arc::ptr_eq(&self.structure, &other.structure) && Arc::ptr_eq(&self.values, &other.values)
    }
}
