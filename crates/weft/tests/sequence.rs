//! Unkeyed sequence reconciliation: positional alignment with tail
//! growth and shrinkage.

mod common;

use common::TestPage;
use std::sync::Arc;
use weft::{Markup, Structure, Template, Value};

fn list_structure() -> Arc<Structure> {
    Structure::new(vec![Markup::element("ul").child(Markup::hole(0))])
}

fn item_structure() -> Arc<Structure> {
    Structure::new(vec![Markup::element("li").child(Markup::hole(0))])
}

fn numbered(item: &Arc<Structure>, count: usize) -> Value {
    Value::sequence((0..count).map(|n| Template::new(item, [Value::text(n.to_string())])))
}

#[test]
fn shrink_removes_trailing_ranges() {
    let mut page = TestPage::new();
    let list = list_structure();
    let item = item_structure();

    page.render(&Template::new(&list, [numbered(&item, 5)]));
    assert_eq!(page.text(), "01234");
    let before = page.elements("li");
    assert_eq!(before.len(), 5);

    page.render(&Template::new(&list, [numbered(&item, 2)]));
    assert_eq!(page.text(), "01");

    // The first two positions are diffed in place, the trailing three
    // are gone.
    let after = page.elements("li");
    assert_eq!(after, &before[..2]);
    for &removed in &before[2..] {
        assert!(!page.tree.is_live(removed));
    }
}

#[test]
fn grow_appends_fresh_ranges() {
    let mut page = TestPage::new();
    let list = list_structure();
    let item = item_structure();

    page.render(&Template::new(&list, [numbered(&item, 2)]));
    let before = page.elements("li");

    page.render(&Template::new(&list, [numbered(&item, 5)]));
    assert_eq!(page.text(), "01234");

    let after = page.elements("li");
    assert_eq!(after.len(), 5);
    assert_eq!(&after[..2], before.as_slice());
}

#[test]
fn clears_on_empty() {
    let mut page = TestPage::new();
    let list = list_structure();
    let item = item_structure();

    page.render(&Template::new(&list, [numbered(&item, 3)]));
    page.render(&Template::new(&list, [Value::sequence([])]));
    assert_eq!(page.text(), "");
    assert_eq!(page.elements("li").len(), 0);

    page.render(&Template::new(&list, [numbered(&item, 1)]));
    assert_eq!(page.text(), "0");
}

#[test]
fn positions_diff_independently() {
    let mut page = TestPage::new();
    let list = list_structure();
    let item = item_structure();
    let quote = Structure::new(vec![Markup::element("blockquote").child(Markup::hole(0))]);

    let mixed = |first: &Arc<Structure>| {
        Value::sequence([
            Template::new(first, [Value::text("head")]),
            Template::new(&item, [Value::text("tail")]),
        ])
    };

    page.render(&Template::new(&list, [mixed(&item)]));
    let lis = page.elements("li");
    assert_eq!(lis.len(), 2);

    // Position 0 switches structure and rebuilds; position 1 is
    // untouched.
    page.render(&Template::new(&list, [mixed(&quote)]));
    assert_eq!(page.elements("blockquote").len(), 1);
    let after = page.elements("li");
    assert_eq!(after, &lis[1..]);
    assert_eq!(page.text(), "headtail");
}
