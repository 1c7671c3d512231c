//! DOCX Template - fill bracketed variables in Word documents
//!
//! A DOCX file is a ZIP archive of XML parts. Filling a template copies the
//! archive entry by entry: every part except `word/document.xml` is passed
//! through byte-for-byte, while the document body is streamed token by token
//! and each `[variable]` found in its run text is replaced by a value from a
//! [`Dictionary`].
//!
//! Word routinely splits one visible word over several runs (formatting,
//! spell-check markers, revision ids), so variables are matched over the
//! concatenated text of adjacent runs rather than over single text nodes.
//! See [`VariableBuffer`] for the matching rules.
//!
//! ```ignore
//! use docx_template::{DocxTemplate, Dictionary, FillConfig};
//! use std::io::Cursor;
//!
//! let dict: Dictionary = [("[name]", "Ada Lovelace")].into_iter().collect();
//! let config = FillConfig::new(dict);
//!
//! let mut template = DocxTemplate::new(std::fs::File::open("letter.docx")?)?;
//! let mut out = Cursor::new(Vec::new());
//! let report = template.transcode(&config, &mut out)?;
//! ```

mod api;
mod archive;
mod buffer;
mod config;
mod error;
mod token;
mod transcoder;
mod xml_io;

pub use api::{fill_docx, fill_docx_bytes};
pub use archive::{DocxTemplate, FillReport};
pub use buffer::{TranscodeStats, VariableBuffer};
pub use config::{
    Delimiters, Dictionary, FillConfig, DEFAULT_BUFFER_CAPACITY, DOCUMENT_PART, TEXT_RUN_ELEMENT,
};
pub use error::{FillError, FillResult};
pub use token::{normalize, Attribute, QName, StartTag, Token};
pub use transcoder::{transcode_part, Normalizing, Transcoder};
pub use xml_io::{TokenSink, TokenSource, XmlDecoder, XmlEncoder};
