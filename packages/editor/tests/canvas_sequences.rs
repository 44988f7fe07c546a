//! Tests for longer editing sequences on a canvas built from real templates
//!
//! This tests:
//! - Insert + move + settings + remove chains
//! - Undo/redo through snapshot history
//! - Rendered markup and serialized schema after the chain

use pagecraft_editor::{
    render_canvas, serialize, BlockInstance, Canvas, History, Mutation, PageSchema, SlotRef,
};
use pagecraft_markup::{prepare_template, PreparedTemplate, Sanitizer, Settings};
use pretty_assertions::assert_eq;

fn template(name: &str, raw: &str) -> PreparedTemplate {
    prepare_template(name, raw, &Sanitizer::default())
}

fn heading() -> PreparedTemplate {
    template(
        "heading",
        r#"<h2>{text}</h2><template data-settings-schema><input name="text" value="Title"></template>"#,
    )
}

fn columns() -> PreparedTemplate {
    template(
        "columns",
        r#"<div class="cols"><div data-area="left"></div><div data-area="right"></div></div>"#,
    )
}

fn insert(canvas: &mut Canvas, slot: SlotRef, index: usize, template: &PreparedTemplate) -> u64 {
    let id = canvas.ids().next_id();
    let block = BlockInstance::from_template(id, template, None);
    canvas
        .apply(Mutation::InsertBlock { slot, index, block })
        .unwrap()
        .block_id
}

fn settings(pairs: &[(&str, &str)]) -> Settings {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_build_render_and_serialize() {
    let mut canvas = Canvas::new();
    let cols = insert(&mut canvas, SlotRef::root(), 0, &columns());
    let h = insert(&mut canvas, SlotRef::area(cols, "right"), 0, &heading());

    canvas
        .apply(Mutation::ApplySettings {
            block_id: h,
            settings: settings(&[("text", "Hello & welcome")]),
        })
        .unwrap();

    assert_eq!(
        render_canvas(&canvas),
        format!(
            r#"<div class="cols" data-block-id="{cols}"><div data-area="left"></div><div data-area="right"><h2 data-block-id="{h}">Hello &amp; welcome</h2></div></div>"#
        )
    );

    let schema = serialize(&canvas);
    let json = schema.to_json().unwrap();
    assert_eq!(
        json,
        r#"{"version":1,"blocks":[{"template":"columns","settings":{},"areas":[[],[{"template":"heading","settings":{"text":"Hello & welcome"},"areas":[]}]]}]}"#
    );
    assert_eq!(PageSchema::from_json(&json).unwrap(), schema);
}

#[test]
fn test_move_then_remove_sequence() {
    let mut canvas = Canvas::new();
    let cols = insert(&mut canvas, SlotRef::root(), 0, &columns());
    let h = insert(&mut canvas, SlotRef::root(), 1, &heading());

    // Move heading into the left column
    canvas
        .apply(Mutation::MoveBlock {
            block_id: h,
            target: SlotRef::area(cols, "left"),
            index: 0,
        })
        .unwrap();
    assert_eq!(canvas.blocks().len(), 1);
    assert_eq!(canvas.locate(h), Some((SlotRef::area(cols, "left"), 0)));

    // Removing the columns takes the heading with it
    canvas.apply(Mutation::RemoveBlock { block_id: cols }).unwrap();
    assert!(canvas.find(h).is_none());
    assert!(canvas.is_empty());
    assert_eq!(canvas.revision(), 4);
}

#[test]
fn test_undo_redo_through_history() {
    let mut canvas = Canvas::new();
    let mut history = History::new(canvas.snapshot(), canvas.revision());

    let a = insert(&mut canvas, SlotRef::root(), 0, &heading());
    history.record(canvas.snapshot(), canvas.revision());
    let e1 = canvas.snapshot();

    insert(&mut canvas, SlotRef::root(), 1, &heading());
    history.record(canvas.snapshot(), canvas.revision());
    let e2 = canvas.snapshot();

    canvas
        .apply(Mutation::ApplySettings {
            block_id: a,
            settings: settings(&[("text", "changed")]),
        })
        .unwrap();
    history.record(canvas.snapshot(), canvas.revision());

    let restored = history.undo().cloned().unwrap();
    canvas.restore(&restored);
    let restored = history.undo().cloned().unwrap();
    canvas.restore(&restored);
    assert_eq!(canvas.snapshot(), e1);

    let restored = history.redo().cloned().unwrap();
    canvas.restore(&restored);
    assert_eq!(canvas.snapshot(), e2);

    // Restores do not count as new edits
    assert!(!history.is_behind(canvas.revision()));

    // A fresh edit after undo discards the redo branch
    let restored = history.undo().cloned().unwrap();
    canvas.restore(&restored);
    canvas.apply(Mutation::DuplicateBlock { block_id: a }).unwrap();
    assert!(history.is_behind(canvas.revision()));
    history.record(canvas.snapshot(), canvas.revision());
    assert!(!history.can_redo());
}

#[test]
fn test_duplicate_nested_gets_fresh_ids() {
    let mut canvas = Canvas::new();
    let cols = insert(&mut canvas, SlotRef::root(), 0, &columns());
    let h = insert(&mut canvas, SlotRef::area(cols, "left"), 0, &heading());

    let copy = canvas
        .apply(Mutation::DuplicateBlock { block_id: cols })
        .unwrap()
        .block_id;

    let mut ids = Vec::new();
    canvas.walk(&mut |b| ids.push(b.id));
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();

    assert_eq!(ids.len(), 4);
    assert_eq!(unique.len(), 4);
    assert_eq!(canvas.blocks()[1].id, copy);
    assert_ne!(canvas.blocks()[1].areas[0].blocks[0].id, h);
}
