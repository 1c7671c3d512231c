//! Structural XML tokens and name normalization
//!
//! The decoder splits every qualified name into a `(space, local)` pair so
//! that elements can be identified independently of how they were written.
//! Before a token is encoded again the pair is folded back into the single
//! `prefix:local` form the document used, see [`normalize`].

use crate::error::{FillError, FillResult};
use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::Event;
use std::borrow::Cow;
use std::fmt;

/// An XML name split at its prefix separator
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace prefix, empty for unprefixed names
    pub space: String,
    pub local: String,
}

impl QName {
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Split a raw `prefix:local` name
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((space, local)) => Self::new(space, local),
            None => Self::new("", raw),
        }
    }

    /// Fold the prefix back into the local part: `("w", "t")` becomes `("", "w:t")`.
    ///
    /// Unprefixed names are returned as they are.
    pub fn normalized(&self) -> QName {
        if self.space.is_empty() {
            return self.clone();
        }
        QName {
            space: String::new(),
            local: format!("{}:{}", self.space, self.local),
        }
    }

    pub fn is_normalized(&self) -> bool {
        self.space.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{}:{}", self.space, self.local)
        }
    }
}

/// An attribute with its value kept exactly as escaped in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: Vec<u8>,
}

impl Attribute {
    pub fn new(name: QName, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Opening tag, including the self-closing `<a/>` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

impl StartTag {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            self_closing: false,
        }
    }

    pub fn with_attribute(mut self, name: QName, value: impl Into<Vec<u8>>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }
}

/// One structural piece of an XML part
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Start(StartTag),
    End(QName),
    /// Character data, still escaped
    Text(Vec<u8>),
    /// Declaration, comment, processing instruction, CDATA or DOCTYPE
    Other(Event<'static>),
}

impl Token {
    /// Build a text token from unescaped content
    pub fn text(content: &str) -> Self {
        Token::Text(partial_escape(content).into_owned().into_bytes())
    }

    /// Unescaped content of a text token, `None` for every other token
    pub fn unescaped_text(&self) -> Option<FillResult<Cow<'_, str>>> {
        let Token::Text(raw) = self else {
            return None;
        };
        Some(decode_text(raw))
    }
}

fn decode_text(raw: &[u8]) -> FillResult<Cow<'_, str>> {
    let text = std::str::from_utf8(raw).map_err(|e| FillError::Decode {
        position: 0,
        message: format!("text is not valid UTF-8: {}", e),
    })?;
    unescape(text).map_err(|e| FillError::Decode {
        position: 0,
        message: format!("invalid escape in text: {}", e),
    })
}

/// Rewrite every element and attribute name of `token` into the
/// single `prefix:local` form expected by the encoder
pub fn normalize(token: Token) -> Token {
    match token {
        Token::Start(mut tag) => {
            tag.name = tag.name.normalized();
            for attr in &mut tag.attributes {
                attr.name = attr.name.normalized();
            }
            Token::Start(tag)
        }
        Token::End(name) => Token::End(name.normalized()),
        other => other,
    }
}
