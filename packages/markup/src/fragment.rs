//! # Settings-schema fragments
//!
//! A template embeds the description of its configurable fields in an
//! element carrying `data-settings-schema`:
//!
//! ```html
//! <section class="hero">
//!   <h1>{title}</h1>
//!   <template data-settings-schema>
//!     <input name="title" value="Welcome" data-label="Heading">
//!     <select name="theme">
//!       <option value="light" selected>Light</option>
//!       <option value="dark">Dark</option>
//!     </select>
//!     <input type="checkbox" name="show_cta" value="yes" checked>
//!   </template>
//! </section>
//! ```
//!
//! The fragment is cut out of the template body before sanitizing and is
//! stripped again from every render.

use crate::tokenizer::{end_tag_name, tokenize, StartTag, Token};
use crate::Settings;
use serde::{Deserialize, Serialize};

/// Attribute marking the settings-schema element
pub const SCHEMA_ATTRIBUTE: &str = "data-settings-schema";

/// Template body split from its settings-schema fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitTemplate {
    pub body: String,
    /// Outer markup of the first schema element, empty if there is none
    pub schema_markup: String,
}

/// Cut the first settings-schema element out of `markup`
pub fn split_schema_fragment(markup: &str) -> SplitTemplate {
    match find_schema_range(markup) {
        Some(range) => {
            let mut body = String::with_capacity(markup.len() - range.len());
            body.push_str(&markup[..range.start]);
            body.push_str(&markup[range.end..]);
            SplitTemplate {
                body,
                schema_markup: markup[range].to_string(),
            }
        }
        None => SplitTemplate {
            body: markup.to_string(),
            schema_markup: String::new(),
        },
    }
}

/// Remove every settings-schema element from `markup`
pub fn strip_schema_fragments(markup: &str) -> String {
    let mut current = markup.to_string();
    while let Some(range) = find_schema_range(&current) {
        current.replace_range(range, "");
    }
    current
}

/// Byte range of the first schema element, end tag included
fn find_schema_range(markup: &str) -> Option<std::ops::Range<usize>> {
    let tokens = tokenize(markup);
    let mut iter = tokens.iter();

    let (start, name) = loop {
        let (token, span) = iter.next()?;
        if let Token::StartTag(raw) = token {
            let tag = StartTag::parse(raw);
            if tag.has_attr(SCHEMA_ATTRIBUTE) {
                if !tag.opens_scope() {
                    return Some(span.clone());
                }
                break (span.start, tag.name);
            }
        }
    };

    // Only elements named like the schema element can close it
    let mut depth = 1usize;
    for (token, span) in iter {
        match token {
            Token::StartTag(raw) => {
                let tag = StartTag::parse(raw);
                if tag.name == name && tag.opens_scope() {
                    depth += 1;
                }
            }
            Token::EndTag(raw) if end_tag_name(raw) == name => {
                depth -= 1;
                if depth == 0 {
                    return Some(start..span.end);
                }
            }
            _ => {}
        }
    }

    // Unterminated: the fragment runs to the end
    Some(start..markup.len())
}

/// Kind of a configurable field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    TextArea,
    Select { options: Vec<String> },
    Toggle { on_value: String },
}

/// One configurable field declared by a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingField {
    pub name: String,
    pub kind: FieldKind,
    pub label: Option<String>,
    pub default: String,
}

/// Fields declared by a settings-schema fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSchema {
    pub fields: Vec<SettingField>,
}

impl SettingsSchema {
    /// Parse the fields out of a schema fragment
    pub fn parse(schema_markup: &str) -> Self {
        let mut fields: Vec<SettingField> = Vec::new();
        let mut select: Option<SelectState> = None;
        let mut textarea: Option<(SettingField, String)> = None;
        let mut option: Option<OptionState> = None;

        for (token, _) in tokenize(schema_markup) {
            match token {
                Token::StartTag(raw) => {
                    let tag = StartTag::parse(raw);
                    match tag.name.as_str() {
                        "input" => {
                            if let Some(field) = input_field(&tag) {
                                push_field(&mut fields, field);
                            }
                        }
                        "textarea" => {
                            if let Some(name) = field_name(&tag) {
                                let field = SettingField {
                                    name,
                                    kind: FieldKind::TextArea,
                                    label: field_label(&tag),
                                    default: String::new(),
                                };
                                textarea = Some((field, String::new()));
                            }
                        }
                        "select" => {
                            select = field_name(&tag).map(|name| SelectState {
                                name,
                                label: field_label(&tag),
                                options: Vec::new(),
                                selected: None,
                            });
                        }
                        "option" if select.is_some() => {
                            option = Some(OptionState {
                                value: tag.attr("value").map(str::to_string),
                                selected: tag.has_attr("selected"),
                                text: String::new(),
                            });
                        }
                        _ => {}
                    }
                }
                Token::Text(text) => {
                    if let Some((_, buffer)) = textarea.as_mut() {
                        buffer.push_str(text);
                    } else if let Some(opt) = option.as_mut() {
                        opt.text.push_str(text);
                    }
                }
                Token::EndTag(raw) => match end_tag_name(raw).as_str() {
                    "textarea" => {
                        if let Some((mut field, buffer)) = textarea.take() {
                            field.default = buffer;
                            push_field(&mut fields, field);
                        }
                    }
                    "option" => {
                        if let (Some(opt), Some(state)) = (option.take(), select.as_mut()) {
                            state.push(opt);
                        }
                    }
                    "select" => {
                        if let Some(mut state) = select.take() {
                            if let Some(opt) = option.take() {
                                state.push(opt);
                            }
                            push_field(&mut fields, state.into_field());
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Tolerate unterminated elements
        if let Some((mut field, buffer)) = textarea.take() {
            field.default = buffer;
            push_field(&mut fields, field);
        }
        if let Some(mut state) = select.take() {
            if let Some(opt) = option.take() {
                state.push(opt);
            }
            push_field(&mut fields, state.into_field());
        }

        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&SettingField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Default value of every declared field
    pub fn defaults(&self) -> Settings {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

struct SelectState {
    name: String,
    label: Option<String>,
    options: Vec<String>,
    selected: Option<String>,
}

struct OptionState {
    value: Option<String>,
    selected: bool,
    text: String,
}

impl SelectState {
    fn push(&mut self, opt: OptionState) {
        let value = opt.value.unwrap_or_else(|| opt.text.trim().to_string());
        if opt.selected && self.selected.is_none() {
            self.selected = Some(value.clone());
        }
        self.options.push(value);
    }

    fn into_field(self) -> SettingField {
        let default = self
            .selected
            .or_else(|| self.options.first().cloned())
            .unwrap_or_default();
        SettingField {
            name: self.name,
            kind: FieldKind::Select {
                options: self.options,
            },
            label: self.label,
            default,
        }
    }
}

fn field_name(tag: &StartTag) -> Option<String> {
    tag.attr("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn field_label(tag: &StartTag) -> Option<String> {
    tag.attr("data-label")
        .or_else(|| tag.attr("title"))
        .map(str::to_string)
}

fn input_field(tag: &StartTag) -> Option<SettingField> {
    let name = field_name(tag)?;
    let input_type = tag.attr("type").unwrap_or("text").to_ascii_lowercase();
    let (kind, default) = if input_type == "checkbox" {
        let on_value = tag.attr("value").unwrap_or("on").to_string();
        let default = if tag.has_attr("checked") {
            on_value.clone()
        } else {
            String::new()
        };
        (FieldKind::Toggle { on_value }, default)
    } else {
        (
            FieldKind::Text,
            tag.attr("value").unwrap_or("").to_string(),
        )
    };
    Some(SettingField {
        name,
        kind,
        label: field_label(tag),
        default,
    })
}

// A later declaration of the same name replaces the earlier one
fn push_field(fields: &mut Vec<SettingField>, field: SettingField) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}
