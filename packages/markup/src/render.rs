//! Markup-level transforms used when rendering a block from its settings.
//!
//! Conventions understood here:
//! - `{name}` placeholders, replaced by the escaped setting value
//! - `data-toggle="setting" data-match="value"` conditional elements
//! - `data-area="name"` drop areas filled with child markup
//! - `data-block-id="N"` markers on the root element of a rendered block

use crate::sanitizer::attribute_value_is_safe;
use crate::tokenizer::{end_tag_name, escape_text, tokenize, StartTag, Token};
use crate::Settings;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::OnceLock;

pub const AREA_ATTRIBUTE: &str = "data-area";
pub const BLOCK_ID_ATTRIBUTE: &str = "data-block-id";
pub const TOGGLE_ATTRIBUTE: &str = "data-toggle";
pub const MATCH_ATTRIBUTE: &str = "data-match";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.-]*)\}").expect("placeholder pattern is valid")
    })
}

/// Replace every `{name}` with the escaped value of `settings[name]`.
/// Missing settings substitute the empty string.
pub fn substitute_placeholders(markup: &str, settings: &Settings) -> String {
    placeholder_pattern()
        .replace_all(markup, |caps: &Captures| {
            settings
                .get(&caps[1])
                .map(|value| escape_text(value))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Drop attributes whose values fail the sanitizer's URL and style checks.
/// Tags that keep all their attributes are left byte-for-byte as they were.
pub fn scrub_attribute_values(markup: &str) -> String {
    rewrite_start_tags(markup, |tag| {
        let before = tag.attributes.len();
        tag.attributes
            .retain(|attr| attribute_value_is_safe(&attr.name, attr.value.as_deref().unwrap_or("")));
        tag.attributes.len() != before
    })
}

/// Names of every placeholder used in `markup`, in first-use order
pub fn placeholder_names(markup: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholder_pattern()
        .captures_iter(markup)
        .map(|caps| caps[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Show toggle elements whose `data-match` equals the current setting
/// value and hide the rest with the `hidden` attribute.
pub fn apply_toggles(markup: &str, settings: &Settings) -> String {
    rewrite_start_tags(markup, |tag| {
        let Some(setting) = tag.attr(TOGGLE_ATTRIBUTE) else {
            return false;
        };
        let current = settings.get(setting).map(String::as_str).unwrap_or("");
        let expected = tag.attr(MATCH_ATTRIBUTE).unwrap_or("");
        if current == expected {
            tag.remove_attr("hidden");
        } else {
            tag.set_attr("hidden", None);
        }
        true
    })
}

/// Put a `data-block-id` marker on the first element of `markup`.
/// Markup without any element is wrapped in a `div`.
pub fn annotate_root(markup: &str, block_id: u64) -> String {
    let mut annotated = false;
    let out = rewrite_start_tags(markup, |tag| {
        if annotated {
            return false;
        }
        annotated = true;
        tag.set_attr(BLOCK_ID_ATTRIBUTE, Some(block_id.to_string()));
        true
    });

    if annotated {
        out
    } else {
        format!("<div {}=\"{}\">{}</div>", BLOCK_ID_ATTRIBUTE, block_id, markup)
    }
}

/// Replace the content of every `data-area` element with `fill(name)`.
/// Areas for which `fill` returns `None` keep their template content.
pub fn fill_areas<F>(markup: &str, mut fill: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let tokens = tokenize(markup);
    let mut out = String::with_capacity(markup.len());
    let mut i = 0;

    while i < tokens.len() {
        let (token, _) = &tokens[i];
        i += 1;

        let Token::StartTag(raw) = token else {
            out.push_str(token.as_str());
            continue;
        };
        out.push_str(raw);

        let tag = StartTag::parse(raw);
        let Some(area) = tag.attr(AREA_ATTRIBUTE) else {
            continue;
        };
        let Some(content) = fill(area) else {
            continue;
        };
        out.push_str(&content);

        if !tag.opens_scope() {
            continue;
        }

        // Skip the template's own content up to the matching end tag
        let mut depth = 1usize;
        while i < tokens.len() {
            match &tokens[i].0 {
                Token::StartTag(inner) => {
                    let inner = StartTag::parse(inner);
                    if inner.name == tag.name && inner.opens_scope() {
                        depth += 1;
                    }
                }
                Token::EndTag(inner) if end_tag_name(inner) == tag.name => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    out
}

/// Names of the drop areas declared in `markup`, in document order
pub fn drop_area_names(markup: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    start_tags(markup)
        .filter_map(|tag| tag.attr(AREA_ATTRIBUTE).map(str::to_string))
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

/// Every `data-block-id` marker found in `markup`
pub fn scan_block_ids(markup: &str) -> Vec<u64> {
    start_tags(markup)
        .filter_map(|tag| tag.attr(BLOCK_ID_ATTRIBUTE).and_then(|v| v.trim().parse().ok()))
        .collect()
}

/// Link and asset targets (`href`, `src`, `srcset`) in document order
pub fn extract_urls(markup: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for tag in start_tags(markup) {
        for attr in &tag.attributes {
            let Some(value) = attr.value.as_deref() else {
                continue;
            };
            let candidates: Vec<&str> = match attr.name.as_str() {
                "href" | "src" | "poster" => vec![value.trim()],
                "srcset" => value
                    .split(',')
                    .filter_map(|c| c.split_whitespace().next())
                    .collect(),
                _ => continue,
            };
            for url in candidates {
                if !url.is_empty() && seen.insert(url.to_string()) {
                    urls.push(url.to_string());
                }
            }
        }
    }
    urls
}

fn start_tags(markup: &str) -> impl Iterator<Item = StartTag> + '_ {
    tokenize(markup).into_iter().filter_map(|(token, _)| match token {
        Token::StartTag(raw) => Some(StartTag::parse(raw)),
        _ => None,
    })
}

/// Re-emit markup, letting `edit` rewrite start tags. Tags for which
/// `edit` returns false are copied through untouched.
fn rewrite_start_tags<F>(markup: &str, mut edit: F) -> String
where
    F: FnMut(&mut StartTag) -> bool,
{
    let mut out = String::with_capacity(markup.len() + 32);
    for (token, _) in tokenize(markup) {
        match token {
            Token::StartTag(raw) => {
                let mut tag = StartTag::parse(raw);
                if edit(&mut tag) {
                    out.push_str(&tag.to_markup());
                } else {
                    out.push_str(raw);
                }
            }
            other => out.push_str(other.as_str()),
        }
    }
    out
}
