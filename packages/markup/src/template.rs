//! Template preparation: raw fetched markup → cleaned, sanitized template
//!
//! ```text
//! raw markup ─┬─ settings-schema fragment ──→ SettingsSchema
//!             └─ body ── clean ── sanitize ──→ cleaned_markup
//!                                   ↓
//!                    crc32(cleaned_markup, schema) → revision_hash
//! ```

use crate::fragment::{split_schema_fragment, SettingsSchema};
use crate::render::{drop_area_names, placeholder_names};
use crate::sanitizer::Sanitizer;
use crc32fast::Hasher;

/// A template ready to be instantiated on the canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTemplate {
    pub template_ref: String,
    /// Sanitized body without the settings-schema fragment
    pub cleaned_markup: String,
    /// The raw settings-schema fragment
    pub settings_schema_markup: String,
    pub schema: SettingsSchema,
    /// Names of the drop areas declared by the body, in document order
    pub areas: Vec<String>,
    pub revision_hash: String,
}

impl PreparedTemplate {
    /// Placeholders in the body that no settings field provides a value for
    pub fn unbound_placeholders(&self) -> Vec<String> {
        placeholder_names(&self.cleaned_markup)
            .into_iter()
            .filter(|name| self.schema.field(name).is_none())
            .collect()
    }
}

/// Split, clean, sanitize and fingerprint fetched template markup
pub fn prepare_template(template_ref: &str, raw: &str, sanitizer: &Sanitizer) -> PreparedTemplate {
    let normalized = clean(raw);
    let split = split_schema_fragment(&normalized);
    let cleaned_markup = sanitizer.sanitize(split.body.trim());
    let schema = SettingsSchema::parse(&split.schema_markup);
    let areas = drop_area_names(&cleaned_markup);
    let revision_hash = revision_hash(&cleaned_markup, &split.schema_markup);

    PreparedTemplate {
        template_ref: template_ref.to_string(),
        cleaned_markup,
        settings_schema_markup: split.schema_markup,
        schema,
        areas,
        revision_hash,
    }
}

/// Deterministic fingerprint of a template's content
pub fn revision_hash(cleaned_markup: &str, settings_schema_markup: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(cleaned_markup.as_bytes());
    hasher.update(&[0]);
    hasher.update(settings_schema_markup.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Normalize line endings and drop a leading byte-order mark
fn clean(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = "\u{feff}<div class=\"card\" onclick=\"x()\">\r\n  <h2>{title}</h2>\r\n  <div data-area=\"body\"></div>\r\n  <template data-settings-schema><input name=\"title\" value=\"Card\"></template>\r\n</div>\r\n";

    #[test]
    fn test_prepare_template() {
        let template = prepare_template("card", CARD, &Sanitizer::default());

        assert_eq!(template.template_ref, "card");
        assert!(!template.cleaned_markup.contains("onclick"));
        assert!(!template.cleaned_markup.contains("data-settings-schema"));
        assert!(!template.cleaned_markup.contains('\r'));
        assert!(template.settings_schema_markup.contains("name=\"title\""));
        assert_eq!(template.schema.defaults().get("title").map(String::as_str), Some("Card"));
        assert_eq!(template.areas, vec!["body".to_string()]);
    }

    #[test]
    fn test_unbound_placeholders() {
        let raw = r#"<p>{title} {subtitle} {title}</p><template data-settings-schema><input name="title"></template>"#;
        let template = prepare_template("intro", raw, &Sanitizer::default());
        assert_eq!(template.unbound_placeholders(), vec!["subtitle".to_string()]);
        assert!(prepare_template("card", CARD, &Sanitizer::default())
            .unbound_placeholders()
            .is_empty());
    }

    #[test]
    fn test_revision_hash_is_deterministic() {
        let a = prepare_template("card", CARD, &Sanitizer::default());
        let b = prepare_template("card", CARD, &Sanitizer::default());
        assert_eq!(a.revision_hash, b.revision_hash);
        assert_eq!(a.revision_hash.len(), 8);
    }

    #[test]
    fn test_revision_hash_separates_fields() {
        assert_ne!(revision_hash("ab", "c"), revision_hash("a", "bc"));
        assert_ne!(revision_hash("<p>a</p>", ""), revision_hash("<p>b</p>", ""));
    }
}
