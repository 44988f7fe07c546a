//! # Pagecraft Markup
//!
//! Pure markup handling for block templates: lexing, sanitizing,
//! settings-schema extraction and the text-level transforms the
//! settings renderer is built from. No I/O happens here.

pub mod fragment;
pub mod render;
pub mod sanitizer;
pub mod template;
pub mod tokenizer;

pub use fragment::{
    split_schema_fragment, strip_schema_fragments, FieldKind, SettingField, SettingsSchema,
    SplitTemplate,
};
pub use render::{
    annotate_root, apply_toggles, drop_area_names, extract_urls, fill_areas, placeholder_names,
    scan_block_ids, scrub_attribute_values, substitute_placeholders,
};
pub use sanitizer::{
    attribute_value_is_safe, is_safe_style, is_safe_url, sanitize, Sanitizer, SanitizerPolicy,
};
pub use template::{prepare_template, revision_hash, PreparedTemplate};
pub use tokenizer::{tokenize, Attribute, StartTag, Token};

/// Settings dictionary of a block: string keys to string values
pub type Settings = std::collections::BTreeMap<String, String>;
