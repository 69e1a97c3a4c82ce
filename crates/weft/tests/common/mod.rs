//! Shared test harness: a tree with a single render target plus
//! convenience accessors for driving and inspecting renders.

#![allow(dead_code)]

use weft::{Event, NodeId, RenderError, Renderer, Template, Tree};

pub struct TestPage {
    pub tree: Tree,
    pub renderer: Renderer,
    pub root: NodeId,
}

impl TestPage {
    pub fn new() -> Self {
        let mut tree = Tree::new();
        let root = tree.create_element("app");
        Self {
            tree,
            renderer: Renderer::new(),
            root,
        }
    }

    pub fn render(&mut self, template: &Template) {
        if let Err(error) = self.try_render(template) {
            panic!("render failed: {error}");
        }
    }

    pub fn try_render(&mut self, template: &Template) -> Result<(), RenderError> {
        self.renderer.render(&mut self.tree, self.root, template)
    }

    /// Concatenated text of everything rendered into the target.
    pub fn text(&self) -> String {
        self.tree.subtree_text(self.root)
    }

    pub fn dump(&self) -> String {
        self.tree.dump(self.root)
    }

    pub fn mutations(&self) -> u64 {
        self.tree.mutation_count()
    }

    /// First rendered element with the given tag; panics when absent.
    pub fn element(&self, tag: &str) -> NodeId {
        let found = self.tree.elements_by_tag(self.root, tag);
        assert!(!found.is_empty(), "no <{tag}> element rendered");
        found[0]
    }

    pub fn elements(&self, tag: &str) -> Vec<NodeId> {
        self.tree.elements_by_tag(self.root, tag)
    }

    pub fn dispatch(&mut self, node: NodeId, event: &Event) {
        self.tree.dispatch(node, event);
    }

    pub fn click(&mut self, node: NodeId) {
        self.dispatch(node, &Event::new("click"));
    }
}
