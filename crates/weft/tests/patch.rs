//! Mount/patch engine tests: idempotence, value-only diffing, structural
//! replacement, and the per-kind updater semantics.

mod common;

use common::TestPage;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use weft::{
    ContractError, Markup, PropertyValue, RenderError, Structure, Template, Value,
};

fn note_structure() -> Arc<Structure> {
    Structure::new(vec![
        Markup::element("p").attr_slot("class", 0).child(Markup::hole(1)),
    ])
}

#[test]
fn renders_static_structure_and_values() {
    let mut page = TestPage::new();
    let structure = note_structure();
    page.render(&Template::new(
        &structure,
        [Value::text("note"), Value::text("hello")],
    ));

    assert_eq!(page.text(), "hello");
    let p = page.element("p");
    assert_eq!(page.tree.attribute(p, "class"), Some("note"));
    assert_eq!(page.dump(), "<app><p class=\"note\">hello</p></app>");
}

#[test]
fn identical_rerender_applies_no_mutations() {
    let mut page = TestPage::new();
    let structure = note_structure();
    let template = Template::new(&structure, [Value::text("note"), Value::text("hello")]);
    page.render(&template);

    let before = page.mutations();
    page.render(&template.clone());
    assert_eq!(page.mutations(), before);

    // A brand-new template whose values compare the same is also a no-op.
    let rebuilt = Template::new(&structure, [Value::text("note"), Value::text("hello")]);
    page.render(&rebuilt);
    assert_eq!(page.mutations(), before);
}

#[test]
fn value_diff_touches_only_the_changed_slot() {
    let mut page = TestPage::new();
    let structure = Structure::new(vec![
        Markup::element("p")
            .attr_slot("class", 0)
            .attr_slot("title", 1)
            .child(Markup::hole(2)),
    ]);
    page.render(&Template::new(
        &structure,
        [Value::text("a"), Value::text("b"), Value::text("body")],
    ));
    let p = page.element("p");

    let before = page.mutations();
    page.render(&Template::new(
        &structure,
        [Value::text("a"), Value::text("b2"), Value::text("body")],
    ));

    assert_eq!(page.mutations(), before + 1);
    assert_eq!(page.tree.attribute(p, "class"), Some("a"));
    assert_eq!(page.tree.attribute(p, "title"), Some("b2"));
    assert_eq!(page.text(), "body");
}

#[test]
fn structural_change_rebuilds_the_subtree() {
    let mut page = TestPage::new();
    let paragraph = Structure::new(vec![Markup::element("p").child(Markup::hole(0))]);
    let heading = Structure::new(vec![Markup::element("h1").child(Markup::hole(0))]);

    page.render(&Template::new(&paragraph, [Value::text("x")]));
    let p = page.element("p");

    // Same structure: the element survives re-render.
    page.render(&Template::new(&paragraph, [Value::text("y")]));
    assert_eq!(page.element("p"), p);

    // Different structure with the same values: discard and rebuild.
    page.render(&Template::new(&heading, [Value::text("y")]));
    assert!(!page.tree.is_live(p));
    assert_eq!(page.elements("p").len(), 0);
    assert_eq!(page.text(), "y");
    page.element("h1");
}

#[test]
fn toggle_controls_attribute_presence() {
    let mut page = TestPage::new();
    let structure = Structure::new(vec![Markup::element("input").attr_slot("disabled?", 0)]);

    page.render(&Template::new(&structure, [Value::Bool(true)]));
    let input = page.element("input");
    assert_eq!(page.tree.attribute(input, "disabled"), Some(""));

    page.render(&Template::new(&structure, [Value::Bool(false)]));
    assert_eq!(page.tree.attribute(input, "disabled"), None);
}

#[test]
fn event_updater_swaps_listeners() {
    let mut page = TestPage::new();
    let structure = Structure::new(vec![Markup::element("button").attr_slot("@click", 0)]);

    let first_hits = Rc::new(Cell::new(0));
    let counted = first_hits.clone();
    let first = Value::listener(move |_| counted.set(counted.get() + 1));

    page.render(&Template::new(&structure, [first.clone()]));
    let button = page.element("button");
    page.click(button);
    assert_eq!(first_hits.get(), 1);

    // Same listener identity: nothing re-attaches.
    page.render(&Template::new(&structure, [first.clone()]));
    assert_eq!(page.tree.listener_count(button, "click"), 1);

    // New identity: the old listener is gone before the new one attaches.
    let second_hits = Rc::new(Cell::new(0));
    let counted = second_hits.clone();
    let second = Value::listener(move |_| counted.set(counted.get() + 1));
    page.render(&Template::new(&structure, [second]));
    assert_eq!(page.tree.listener_count(button, "click"), 1);

    page.click(button);
    assert_eq!(first_hits.get(), 1);
    assert_eq!(second_hits.get(), 1);
}

#[test]
fn property_bypasses_attribute_serialization() {
    let mut page = TestPage::new();
    let structure = Structure::new(vec![Markup::element("input").attr_slot(".value", 0)]);

    page.render(&Template::new(&structure, [Value::text("draft")]));
    let input = page.element("input");
    assert_eq!(
        page.tree.property(input, "value"),
        Some(&PropertyValue::Text("draft".into()))
    );
    assert_eq!(page.tree.attribute(input, "value"), None);

    page.render(&Template::new(&structure, [Value::Int(42)]));
    assert_eq!(page.tree.property(input, "value"), Some(&PropertyValue::Int(42)));
}

#[test]
fn reference_runs_once_per_callback_identity() {
    let mut page = TestPage::new();
    let structure = Structure::new(vec![Markup::element("div").attr_slot("ref", 0)]);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let callback = Value::callback(move |node| sink.borrow_mut().push(node));

    page.render(&Template::new(&structure, [callback.clone()]));
    page.render(&Template::new(&structure, [callback.clone()]));
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0], page.element("div"));

    let sink = seen.clone();
    page.render(&Template::new(
        &structure,
        [Value::callback(move |node| sink.borrow_mut().push(node))],
    ));
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn style_applies_changed_keys_and_keeps_stale_ones() {
    let mut page = TestPage::new();
    let structure = Structure::new(vec![Markup::element("div").attr_slot("style", 0)]);

    page.render(&Template::new(
        &structure,
        [Value::style([("color", "red"), ("width", "10px")])],
    ));
    let div = page.element("div");
    assert_eq!(page.tree.style(div, "color"), Some("red"));
    assert_eq!(page.tree.style(div, "width"), Some("10px"));

    page.render(&Template::new(&structure, [Value::style([("color", "blue")])]));
    assert_eq!(page.tree.style(div, "color"), Some("blue"));
    // Documented behavior: keys absent from the new mapping are not
    // cleared.
    assert_eq!(page.tree.style(div, "width"), Some("10px"));
}

#[test]
fn nested_template_patches_in_place() {
    let mut page = TestPage::new();
    let inner = Structure::new(vec![Markup::element("span").child(Markup::hole(0))]);
    let outer = Structure::new(vec![Markup::element("div").child(Markup::hole(0))]);

    let make = |text: &str| {
        Template::new(
            &outer,
            [Value::Template(Template::new(&inner, [Value::text(text)]))],
        )
    };

    page.render(&make("one"));
    let span = page.element("span");
    assert_eq!(page.text(), "one");

    page.render(&make("two"));
    assert_eq!(page.element("span"), span);
    assert_eq!(page.text(), "two");
}

#[test]
fn content_hole_shape_change_is_a_contract_error() {
    let mut page = TestPage::new();
    let inner = Structure::new(vec![Markup::element("span").child(Markup::hole(0))]);
    let outer = Structure::new(vec![Markup::element("p").child(Markup::hole(0))]);

    page.render(&Template::new(&outer, [Value::text("plain")]));

    let nested = Template::new(&inner, [Value::text("x")]);
    let result = page.try_render(&Template::new(&outer, [Value::Template(nested)]));
    assert!(matches!(
        result,
        Err(RenderError::Contract(ContractError::ShapeChanged { .. }))
    ));
}

#[test]
fn renderer_caches_skeletons_per_structure() {
    let mut page = TestPage::new();
    let structure = note_structure();

    page.render(&Template::new(&structure, [Value::text("a"), Value::text("b")]));
    assert_eq!(page.renderer.cache().len(), 1);

    // Structurally identical but independently built: same skeleton.
    let rebuilt = note_structure();
    page.render(&Template::new(&rebuilt, [Value::text("a"), Value::text("b")]));
    assert_eq!(page.renderer.cache().len(), 1);
}
