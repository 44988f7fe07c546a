//! # Markup Sanitizer
//!
//! Restricts untrusted template markup to an allow-list before it can
//! reach the canvas.
//!
//! - Disallowed elements are unwrapped: the tags go, the children stay.
//! - Disallowed attributes are dropped, `on*` handlers always.
//! - `style` values carrying script-like content are dropped.
//! - URL attributes must match a safe scheme pattern.
//!
//! Sanitizing never fails. The worst case is that content is removed.

use crate::tokenizer::{end_tag_name, escape_text, tokenize, StartTag, Token};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Elements kept by the default policy
pub const DEFAULT_ALLOWED_ELEMENTS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "blockquote", "br", "button",
    "caption", "cite", "code", "col", "colgroup", "dd", "del", "details", "div", "dl", "dt",
    "em", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "i", "img", "input", "ins", "label", "legend", "li", "main", "mark",
    "nav", "ol", "optgroup", "option", "p", "picture", "pre", "q", "s", "section", "select",
    "small", "source", "span", "strong", "sub", "summary", "sup", "table", "tbody", "td",
    "textarea", "tfoot", "th", "thead", "time", "tr", "u", "ul", "video",
];

/// Attributes kept by the default policy (besides `data-*` and `aria-*`)
pub const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &[
    "action", "align", "alt", "autoplay", "background", "checked", "cite", "class", "cols",
    "colspan", "controls", "datetime", "disabled", "for", "height", "hidden", "href", "id",
    "label", "lang", "loading", "loop", "max", "maxlength", "method", "min", "multiple",
    "muted", "name", "open", "placeholder", "poster", "readonly", "rel", "required", "role",
    "rows", "rowspan", "scope", "selected", "sizes", "src", "srcset", "step", "style",
    "tabindex", "target", "title", "type", "value", "width",
];

/// Attributes whose value is a URL
pub const URL_ATTRIBUTES: &[&str] = &[
    "action",
    "background",
    "cite",
    "formaction",
    "href",
    "poster",
    "src",
];

const SCRIPT_LIKE_STYLE: &[&str] = &[
    "javascript:",
    "vbscript:",
    "expression(",
    "behavior:",
    "-moz-binding",
    "@import",
];

fn safe_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?:https?|mailto|tel|ftp):|#|/|\./|\.\./|[^:/?#]*(?:[/?#]|$)|data:image/(?:png|gif|jpe?g|webp);base64,[a-z0-9+/]+=*$)",
        )
        .expect("safe url pattern is valid")
    })
}

/// Allow-lists driving the sanitizer
#[derive(Debug, Clone)]
pub struct SanitizerPolicy {
    pub allowed_elements: HashSet<String>,
    pub allowed_attributes: HashSet<String>,
    /// Keep `data-*` attributes
    pub allow_data_attributes: bool,
    /// Keep `aria-*` attributes
    pub allow_aria_attributes: bool,
}

impl Default for SanitizerPolicy {
    fn default() -> Self {
        Self {
            allowed_elements: DEFAULT_ALLOWED_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            allowed_attributes: DEFAULT_ALLOWED_ATTRIBUTES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allow_data_attributes: true,
            allow_aria_attributes: true,
        }
    }
}

impl SanitizerPolicy {
    pub fn allow_element(mut self, name: &str) -> Self {
        self.allowed_elements.insert(name.to_ascii_lowercase());
        self
    }

    pub fn deny_element(mut self, name: &str) -> Self {
        self.allowed_elements.remove(&name.to_ascii_lowercase());
        self
    }

    pub fn allow_attribute(mut self, name: &str) -> Self {
        self.allowed_attributes.insert(name.to_ascii_lowercase());
        self
    }

    fn attribute_allowed(&self, name: &str) -> bool {
        if name.starts_with("on") {
            return false;
        }
        self.allowed_attributes.contains(name)
            || (self.allow_data_attributes && name.starts_with("data-"))
            || (self.allow_aria_attributes && name.starts_with("aria-"))
    }
}

/// Allow-list sanitizer
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: SanitizerPolicy,
}

impl Sanitizer {
    pub fn new(policy: SanitizerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SanitizerPolicy {
        &self.policy
    }

    /// Sanitize markup. Total: always returns markup.
    pub fn sanitize(&self, markup: &str) -> String {
        let mut out = String::with_capacity(markup.len());
        // Allowed elements currently open, innermost last
        let mut open: Vec<String> = Vec::new();

        for (token, _) in tokenize(markup) {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Stray(raw) => out.push_str(&escape_text(raw)),
                Token::Declaration(_) => {}
                Token::StartTag(raw) => {
                    let mut tag = StartTag::parse(raw);
                    if !self.policy.allowed_elements.contains(&tag.name) {
                        continue;
                    }
                    self.filter_attributes(&mut tag);
                    out.push_str(&tag.to_markup());
                    if tag.opens_scope() {
                        open.push(tag.name);
                    }
                }
                Token::EndTag(raw) => {
                    let name = end_tag_name(raw);
                    if let Some(depth) = open.iter().rposition(|n| *n == name) {
                        // Close anything left open inside it first
                        while open.len() > depth {
                            if let Some(inner) = open.pop() {
                                out.push_str("</");
                                out.push_str(&inner);
                                out.push('>');
                            }
                        }
                    }
                }
            }
        }

        while let Some(name) = open.pop() {
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }

        out
    }

    fn filter_attributes(&self, tag: &mut StartTag) {
        tag.attributes.retain(|attr| {
            if !self.policy.attribute_allowed(&attr.name) {
                return false;
            }
            attribute_value_is_safe(&attr.name, attr.value.as_deref().unwrap_or(""))
        });
    }
}

/// Sanitize with the default policy
pub fn sanitize(markup: &str) -> String {
    Sanitizer::default().sanitize(markup)
}

/// Whether the value of attribute `name` passes the URL and style checks.
/// Attributes that carry neither are always safe.
pub fn attribute_value_is_safe(name: &str, value: &str) -> bool {
    if name == "style" {
        return is_safe_style(value);
    }
    if URL_ATTRIBUTES.contains(&name) {
        return is_safe_url(value);
    }
    if name == "srcset" {
        return value
            .split(',')
            .filter_map(|candidate| candidate.split_whitespace().next())
            .all(is_safe_url);
    }
    true
}

/// Whether a URL attribute value matches the safe-scheme pattern
pub fn is_safe_url(value: &str) -> bool {
    let normalized = normalize_for_check(value);
    safe_url_pattern().is_match(&normalized)
}

/// Whether an inline style value is free of script-like content
pub fn is_safe_style(value: &str) -> bool {
    let normalized = normalize_for_check(value).to_ascii_lowercase();
    let unescaped = normalized.replace('\\', "");
    !SCRIPT_LIKE_STYLE
        .iter()
        .any(|needle| normalized.contains(needle) || unescaped.contains(needle))
}

/// Decode character references and drop whitespace/control characters,
/// so `jav&#x61;script:` and `java\tscript:` are seen for what they are.
fn normalize_for_check(value: &str) -> String {
    decode_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect()
}

/// Decode numeric character references and the handful of named ones
/// that matter for scheme detection.
pub fn decode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let end = after
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .unwrap_or(after.len());
        let body = &after[..end];
        let consumed = if after[end..].starts_with(';') { end + 1 } else { end };

        let decoded = if let Some(num) = body.strip_prefix('#') {
            let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                num.parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
        } else {
            match body.to_ascii_lowercase().as_str() {
                "colon" => Some(':'),
                "tab" => Some('\t'),
                "newline" => Some('\n'),
                "lpar" => Some('('),
                "rpar" => Some(')'),
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => None,
            }
        };

        match decoded {
            Some(c) if !body.is_empty() => {
                out.push(c);
                rest = &after[consumed..];
            }
            _ => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
