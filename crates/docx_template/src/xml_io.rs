//! Token-level XML reading and writing on top of quick-xml

use crate::error::{FillError, FillResult};
use crate::token::{QName, StartTag, Token};
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName as XmlName;
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::io::{BufRead, Write};

/// Something that yields tokens until exhausted
pub trait TokenSource {
    /// Next token, or `None` once the stream has ended
    fn next_token(&mut self) -> FillResult<Option<Token>>;
}

/// Something that accepts resolved tokens
pub trait TokenSink {
    fn emit(&mut self, token: Token) -> FillResult<()>;

    /// Push out anything still held in internal write buffers
    fn finish(&mut self) -> FillResult<()> {
        Ok(())
    }
}

impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> FillResult<Option<Token>> {
        Ok(self.next())
    }
}

impl TokenSink for Vec<Token> {
    fn emit(&mut self, token: Token) -> FillResult<()> {
        self.push(token);
        Ok(())
    }
}

/// Reads an XML stream as owned [`Token`]s
pub struct XmlDecoder<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> XmlDecoder<R> {
    pub fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        // Whitespace inside w:t is significant
        reader.config_mut().trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> FillError {
        FillError::Decode {
            position: self.reader.buffer_position() as u64,
            message: message.into(),
        }
    }
}

impl<R: BufRead> TokenSource for XmlDecoder<R> {
    fn next_token(&mut self) -> FillResult<Option<Token>> {
        self.buf.clear();
        let result = self
            .reader
            .read_event_into(&mut self.buf)
            .map(|event| event.into_owned());
        let event = match result {
            Ok(event) => event,
            Err(e) => return Err(self.error(e.to_string())),
        };

        let token = match event {
            Event::Start(e) => Token::Start(self.start_tag(&e, false)?),
            Event::Empty(e) => Token::Start(self.start_tag(&e, true)?),
            Event::End(e) => Token::End(self.name(e.name())?),
            Event::Text(e) => Token::Text(e.into_inner().into_owned()),
            Event::Eof => return Ok(None),
            other => Token::Other(other),
        };
        Ok(Some(token))
    }
}

impl<R: BufRead> XmlDecoder<R> {
    fn name(&self, name: XmlName<'_>) -> FillResult<QName> {
        let raw = std::str::from_utf8(name.as_ref())
            .map_err(|e| self.error(format!("name is not valid UTF-8: {}", e)))?;
        Ok(QName::parse(raw))
    }

    fn start_tag(&self, e: &BytesStart<'_>, self_closing: bool) -> FillResult<StartTag> {
        let mut tag = StartTag::new(self.name(e.name())?);
        tag.self_closing = self_closing;
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.error(format!("attribute error: {}", err)))?;
            tag = tag.with_attribute(self.name(attr.key)?, attr.value.into_owned());
        }
        Ok(tag)
    }
}

/// Writes [`Token`]s as XML.
///
/// Names must already be normalized (see [`crate::normalize`]); this
/// encoder only knows the `prefix:local` spelling.
pub struct XmlEncoder<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlEncoder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
        }
    }

    fn write(&mut self, event: Event<'_>) -> FillResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| FillError::Encode(e.to_string()))
    }
}

fn plain_name(name: &QName) -> FillResult<&str> {
    if !name.is_normalized() {
        return Err(FillError::Encode(format!(
            "name {} was not normalized before encoding",
            name
        )));
    }
    Ok(&name.local)
}

/// Re-quote a raw value that came from a single-quoted attribute
fn double_quoted(value: &[u8]) -> Cow<'_, [u8]> {
    if !value.contains(&b'"') {
        return Cow::Borrowed(value);
    }
    let mut quoted = Vec::with_capacity(value.len() + 8);
    for &byte in value {
        if byte == b'"' {
            quoted.extend_from_slice(b"&quot;");
        } else {
            quoted.push(byte);
        }
    }
    Cow::Owned(quoted)
}

impl<W: Write> TokenSink for XmlEncoder<W> {
    fn emit(&mut self, token: Token) -> FillResult<()> {
        match token {
            Token::Start(tag) => {
                let mut start = BytesStart::new(plain_name(&tag.name)?.to_string());
                for attr in &tag.attributes {
                    start.push_attribute(XmlAttribute {
                        key: XmlName(plain_name(&attr.name)?.as_bytes()),
                        value: double_quoted(&attr.value),
                    });
                }
                if tag.self_closing {
                    self.write(Event::Empty(start))
                } else {
                    self.write(Event::Start(start))
                }
            }
            Token::End(name) => {
                let end = BytesEnd::new(plain_name(&name)?.to_string());
                self.write(Event::End(end))
            }
            Token::Text(raw) => {
                let text = String::from_utf8(raw)
                    .map_err(|e| FillError::Encode(format!("text is not valid UTF-8: {}", e)))?;
                self.write(Event::Text(BytesText::from_escaped(text)))
            }
            Token::Other(event) => self.write(event),
        }
    }

    fn finish(&mut self) -> FillResult<()> {
        self.writer
            .get_mut()
            .flush()
            .map_err(|e| FillError::Encode(e.to_string()))
    }
}
