#![forbid(unsafe_code)]

//! A small CSS selector subset for locating containers.
//!
//! Supported: type selectors (`div`, `*`), `#id`, `.class`, `[attr]`,
//! `[attr=value]` (value optionally quoted), compounds of those
//! (`h1.title#main`), and comma-separated lists. Combinators and
//! pseudo-classes are rejected with [`SelectorError::Unsupported`].
//!
//! Matching is done against any [`ElementView`], so hosts only need to expose
//! tag names and attributes.

use std::fmt;

/// Read-only view of an element, as needed for selector matching.
pub trait ElementView {
    /// Lowercase tag name.
    fn tag(&self) -> &str;

    /// Attribute value, if present.
    fn attribute(&self, name: &str) -> Option<&str>;

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }
}

/// Selector parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Selector text is empty or contains an empty list entry.
    Empty,
    /// Unexpected character at a byte offset.
    Unexpected {
        selector: String,
        position: usize,
        found: char,
    },
    /// Syntax outside the supported subset.
    Unsupported {
        selector: String,
        reason: &'static str,
    },
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::Unexpected {
                selector,
                position,
                found,
            } => write!(
                f,
                "unexpected {found:?} at offset {position} in selector {selector:?}"
            ),
            Self::Unsupported { selector, reason } => {
                write!(f, "unsupported selector {selector:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    simple: Vec<Simple>,
}

impl Compound {
    fn matches<E: ElementView + ?Sized>(&self, element: &E) -> bool {
        if let Some(tag) = &self.tag
            && !element.tag().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        self.simple.iter().all(|simple| matches_simple(simple, element))
    }
}

fn matches_simple<E: ElementView + ?Sized>(simple: &Simple, element: &E) -> bool {
    match simple {
        Simple::Id(id) => element.attribute("id") == Some(id.as_str()),
        Simple::Class(class) => element.has_class(class),
        Simple::Attr { name, value: None } => element.attribute(name).is_some(),
        Simple::Attr {
            name,
            value: Some(value),
        } => element.attribute(name) == Some(value.as_str()),
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Parse selector text.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut alternatives = Vec::new();
        let mut offset = source.len() - source.trim_start().len();
        for part in trimmed.split(',') {
            let lead = part.len() - part.trim_start().len();
            alternatives.push(parse_compound(source, part.trim(), offset + lead)?);
            offset += part.len() + 1;
        }
        Ok(Self {
            source: trimmed.to_string(),
            alternatives,
        })
    }

    /// The selector text as written (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether any alternative matches `element`.
    pub fn matches<E: ElementView + ?Sized>(&self, element: &E) -> bool {
        self.alternatives.iter().any(|c| c.matches(element))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn parse_compound(full: &str, part: &str, base: usize) -> Result<Compound, SelectorError> {
    if part.is_empty() {
        return Err(SelectorError::Empty);
    }
    let unexpected = |pos: usize, found: char| SelectorError::Unexpected {
        selector: full.to_string(),
        position: base + pos,
        found,
    };
    let mut compound = Compound::default();
    let mut chars = part.char_indices().peekable();

    // Optional leading type selector.
    if let Some(&(_, c)) = chars.peek() {
        if c == '*' {
            chars.next();
        } else if is_ident_char(c) {
            let ident = take_ident(&mut chars);
            compound.tag = Some(ident.to_ascii_lowercase());
        }
    }

    while let Some((pos, c)) = chars.next() {
        match c {
            '#' | '.' => {
                let ident = take_ident(&mut chars);
                if ident.is_empty() {
                    let (p, f) = chars.peek().copied().unwrap_or((part.len(), c));
                    return Err(unexpected(p, f));
                }
                compound.simple.push(if c == '#' {
                    Simple::Id(ident)
                } else {
                    Simple::Class(ident)
                });
            }
            '[' => {
                let rest = &part[pos + 1..];
                let Some(close) = rest.find(']') else {
                    return Err(unexpected(pos, c));
                };
                let body = &rest[..close];
                let (name, value) = match body.split_once('=') {
                    Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
                    None => (body.trim(), None),
                };
                if name.is_empty() || !name.chars().all(is_ident_char) {
                    return Err(unexpected(pos, c));
                }
                compound.simple.push(Simple::Attr {
                    name: name.to_string(),
                    value: value.map(str::to_string),
                });
                // Skip past the closing bracket.
                while let Some((p, _)) = chars.peek().copied() {
                    if p > pos + close + 1 {
                        break;
                    }
                    chars.next();
                }
            }
            ' ' | '>' | '+' | '~' => {
                return Err(SelectorError::Unsupported {
                    selector: full.to_string(),
                    reason: "combinators are not supported",
                });
            }
            ':' => {
                return Err(SelectorError::Unsupported {
                    selector: full.to_string(),
                    reason: "pseudo-classes are not supported",
                });
            }
            other => return Err(unexpected(pos, other)),
        }
    }
    Ok(compound)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
