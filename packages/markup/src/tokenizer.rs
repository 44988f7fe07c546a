use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Raw lexemes recognised by the markup lexer
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Lexeme<'src> {
    // Comments, doctypes and processing instructions
    #[regex(r"<[!?][^>]*>", |lex| lex.slice())]
    Declaration(&'src str),

    // Start tags, quoted attribute values may contain '>'
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9:_-]*([^>"']|"[^"]*"|'[^']*')*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_-]*[^>]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Token types for template markup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'src> {
    /// `<!-- ... -->`, `<!DOCTYPE ...>` or `<? ... ?>`
    Declaration(&'src str),

    /// `<tag attr="value">`, raw slice including brackets
    StartTag(&'src str),

    /// `</tag>`, raw slice including brackets
    EndTag(&'src str),

    /// Character data between tags
    Text(&'src str),

    /// Input the lexer could not classify, such as a lone `<`
    Stray(&'src str),
}

impl<'src> Token<'src> {
    /// The source slice this token was produced from
    pub fn as_str(&self) -> &'src str {
        match self {
            Token::Declaration(s)
            | Token::StartTag(s)
            | Token::EndTag(s)
            | Token::Text(s)
            | Token::Stray(s) => s,
        }
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Declaration(s) => write!(f, "declaration {}", s),
            Token::StartTag(s) => write!(f, "start tag {}", s),
            Token::EndTag(s) => write!(f, "end tag {}", s),
            Token::Text(s) => write!(f, "text {:?}", s),
            Token::Stray(s) => write!(f, "stray {:?}", s),
        }
    }
}

/// Tokenize markup. Never fails: unrecognised input becomes [`Token::Stray`].
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    let lexer = Lexeme::lexer(source);
    lexer
        .spanned()
        .map(|(result, span)| {
            let token = match result {
                Ok(Lexeme::Declaration(s)) => Token::Declaration(s),
                Ok(Lexeme::StartTag(s)) => Token::StartTag(s),
                Ok(Lexeme::EndTag(s)) => Token::EndTag(s),
                Ok(Lexeme::Text(s)) => Token::Text(s),
                Err(()) => Token::Stray(&source[span.clone()]),
            };
            (token, span)
        })
        .collect()
}

/// A single attribute on a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lower-cased attribute name
    pub name: String,
    /// Raw value (character references are kept as written)
    pub value: Option<String>,
}

/// A parsed start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lower-cased element name
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

/// Elements that never have content or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

impl StartTag {
    /// Parse the raw slice of a [`Token::StartTag`]
    pub fn parse(raw: &str) -> Self {
        let inner = raw
            .strip_prefix('<')
            .unwrap_or(raw)
            .strip_suffix('>')
            .unwrap_or(raw);
        let bytes = inner.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() && !is_tag_boundary(bytes[pos]) {
            pos += 1;
        }
        let name = inner[..pos].to_ascii_lowercase();

        let mut attributes: Vec<Attribute> = Vec::new();
        let mut self_closing = false;

        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                break;
            }
            if bytes[pos] == b'/' {
                pos += 1;
                if pos >= bytes.len() {
                    self_closing = true;
                }
                continue;
            }

            let name_start = pos;
            while pos < bytes.len() && !is_attr_name_end(bytes[pos]) {
                pos += 1;
            }
            if pos == name_start {
                // '=' with no name in front of it
                pos += 1;
                continue;
            }
            let attr_name = inner[name_start..pos].to_ascii_lowercase();

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            let value = if pos < bytes.len() && bytes[pos] == b'=' {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                Some(read_value(inner, &mut pos))
            } else {
                None
            };

            // First occurrence wins, as in browsers
            if !attributes.iter().any(|a| a.name == attr_name) {
                attributes.push(Attribute {
                    name: attr_name,
                    value,
                });
            }
        }

        Self {
            name,
            attributes,
            self_closing,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn set_attr(&mut self, name: &str, value: Option<String>) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }

    /// Whether this element opens a scope that a matching end tag closes
    pub fn opens_scope(&self) -> bool {
        !self.self_closing && !is_void(&self.name)
    }

    /// Serialize back to markup with double-quoted, escaped values
    pub fn to_markup(&self) -> String {
        let mut out = String::with_capacity(16 + self.attributes.len() * 16);
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            if let Some(value) = &attr.value {
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
        }
        if self.self_closing {
            out.push_str(" /");
        }
        out.push('>');
        out
    }
}

/// Lower-cased element name of an end tag slice
pub fn end_tag_name(raw: &str) -> String {
    let inner = raw.trim_start_matches("</");
    let end = inner
        .bytes()
        .position(is_tag_boundary)
        .unwrap_or(inner.len());
    inner[..end].to_ascii_lowercase()
}

fn is_tag_boundary(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn is_attr_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'=' || b == b'/' || b == b'>'
}

fn read_value(inner: &str, pos: &mut usize) -> String {
    let bytes = inner.as_bytes();
    if *pos >= bytes.len() {
        return String::new();
    }
    let quote = bytes[*pos];
    if quote == b'"' || quote == b'\'' {
        let start = *pos + 1;
        let end = inner[start..]
            .find(quote as char)
            .map(|i| start + i)
            .unwrap_or(inner.len());
        *pos = (end + 1).min(inner.len());
        inner[start..end].to_string()
    } else {
        let start = *pos;
        while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        inner[start..*pos].to_string()
    }
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape character data
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
