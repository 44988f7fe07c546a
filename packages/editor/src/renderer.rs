//! # Settings Renderer
//!
//! Re-derives a block's visible markup from its original template and
//! its current settings:
//!
//! 1. Toggle elements are shown or hidden from their setting
//! 2. `{name}` placeholders are substituted (missing → empty string)
//! 3. The settings-schema fragment is stripped
//! 4. Attributes whose substituted values fail the URL or style checks
//!    are dropped
//! 5. Drop areas are filled with the children's rendered markup
//! 6. The root element gets its `data-block-id` marker
//!
//! Rendering is a pure function of the block, so it is idempotent.

use crate::block::{BlockInstance, DropArea};
use crate::canvas::Canvas;
use pagecraft_markup::{
    annotate_root, apply_toggles, fill_areas, scrub_attribute_values, strip_schema_fragments,
    substitute_placeholders,
};

/// Markup for a block without its children
pub fn render_own(block: &BlockInstance) -> String {
    let toggled = apply_toggles(&block.original_markup, &block.settings);
    let substituted = substitute_placeholders(&toggled, &block.settings);
    scrub_attribute_values(&strip_schema_fragments(&substituted))
}

/// Markup for a block and everything nested in it
pub fn render_block(block: &BlockInstance) -> String {
    let own = render_own(block);
    let filled = fill_areas(&own, |name| block.area(name).map(render_area));
    annotate_root(&filled, block.id)
}

/// Concatenated markup of every block in an area
pub fn render_area(area: &DropArea) -> String {
    area.blocks.iter().map(render_block).collect()
}

/// Markup of the whole page
pub fn render_canvas(canvas: &Canvas) -> String {
    render_area(canvas.root())
}
